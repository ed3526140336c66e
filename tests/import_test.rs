//! インポート/エクスポートテスト
//!
//! バックアップファイルの読み書きとマージ結果を検証

use content_ideas::export::backup;
use content_ideas::session::{Session, SessionState};
use content_ideas_common::{HistoryEntry, MergeKey, PromptTemplate, ARCHIVE_VERSION};
use std::path::Path;
use tempfile::tempdir;

fn entry(id: &str, topic: &str, ts: i64) -> HistoryEntry {
    HistoryEntry {
        id: id.to_string(),
        timestamp: ts,
        topic: topic.to_string(),
        ..Default::default()
    }
}

fn session() -> Session {
    Session::new(SessionState {
        history: vec![entry("a1", "A", 100)],
        templates: vec![PromptTemplate::new("X", "foo")],
        ..Default::default()
    })
}

fn write(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("backup.json");
    std::fs::write(&path, content).unwrap();
    path
}

fn topics_and_timestamps(session: &Session) -> Vec<(String, i64)> {
    session
        .history()
        .iter()
        .map(|h| (h.topic.clone(), h.timestamp))
        .collect()
}

/// `{}` は不正な形式として拒否され、状態は変わらない
#[test]
fn test_empty_object_rejected_without_mutation() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write(dir.path(), "{}");
    let session = session();
    let before = session.state().clone();

    assert!(backup::read_import(&path).is_err());
    assert_eq!(session.state(), &before);
}

/// 現行形式: 新しい方を採用し、テンプレートは手元を優先
#[test]
fn test_import_current_format() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write(
        dir.path(),
        r#"{
            "version": 1,
            "history": [
                {"id": "a2", "timestamp": 200, "topic": "A", "customColumns": [], "ideas": []},
                {"id": "b1", "timestamp": 50, "topic": "B", "customColumns": [], "ideas": []}
            ],
            "templates": [{"name": "X", "template": "bar"}, {"name": "Y", "template": "baz"}]
        }"#,
    );

    let mut session = session();
    session.import(backup::read_import(&path).unwrap(), MergeKey::Topic);

    assert_eq!(
        topics_and_timestamps(&session),
        vec![("A".to_string(), 200), ("B".to_string(), 50)]
    );
    assert_eq!(
        session.templates(),
        &[PromptTemplate::new("X", "foo"), PromptTemplate::new("Y", "baz")]
    );
    // 選択中だった a1 は置き換えられたので最新を選択
    assert_eq!(session.active_entry().unwrap().id, "a2");
}

/// 旧形式（履歴の配列のみ）
#[test]
fn test_import_legacy_array() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write(
        dir.path(),
        r#"[{"id": "c1", "timestamp": 300, "topic": "C", "customColumns": ["Hewan"], "ideas": [
            {"id": "i1", "Idea": "Gurita", "Hewan": "Gurita", "narrationLoading": false, "narrationPrompt": "p"}
        ]}]"#,
    );

    let mut session = session();
    session.import(backup::read_import(&path).unwrap(), MergeKey::Topic);

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].ideas[0].field_text("Hewan").as_deref(), Some("Gurita"));
    assert_eq!(session.templates(), &[PromptTemplate::new("X", "foo")]);
    assert_eq!(session.active_entry().unwrap().id, "a1");
}

/// IDキーでのマージでは同じトピックの別セッションを残す
#[test]
fn test_import_merge_by_id() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write(
        dir.path(),
        r#"{"history": [{"id": "a9", "timestamp": 200, "topic": "A", "customColumns": [], "ideas": []}]}"#,
    );

    let mut session = session();
    session.import(backup::read_import(&path).unwrap(), MergeKey::Id);

    let ids: Vec<&str> = session.history().iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a9", "a1"]);
}

/// 書き出したファイルはそのまま読み込める
#[test]
fn test_export_then_import() {
    let dir = tempdir().expect("Failed to create temp dir");
    let source = session();

    let path = backup::write_backup(&source, dir.path()).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.ends_with("-content-generator-backup.json"));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["version"], ARCHIVE_VERSION);

    let mut target = Session::new(SessionState::default());
    target.import(backup::read_import(&path).unwrap(), MergeKey::Topic);
    assert_eq!(target.history(), source.history());
    assert_eq!(target.templates(), source.templates());
}

/// 出力先にファイル名を指定した場合
#[test]
fn test_export_to_named_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = dir.path().join("nested").join("mine.json");

    let path = backup::write_backup(&session(), &output).unwrap();
    assert_eq!(path, output);
    assert!(output.exists());
}
