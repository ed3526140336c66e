//! バックアップ（エクスポート/インポート）ファイル

use crate::error::{ContentIdeasError, Result};
use crate::session::Session;
use chrono::{DateTime, Local};
use content_ideas_common::{parse_import, ImportBundle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 既定のバックアップファイル名（`<YYYY-MM-DD-HH-MM-SS>-content-generator-backup.json`）
pub fn backup_file_name(now: DateTime<Local>) -> String {
    format!("{}-content-generator-backup.json", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// 履歴とテンプレートをすべて書き出す
///
/// `output` がディレクトリ（または拡張子なし）なら既定のファイル名を使う
pub fn write_backup(session: &Session, output: &Path) -> Result<PathBuf> {
    let path = if output.is_dir() || output.extension().is_none() {
        output.join(backup_file_name(Local::now()))
    } else {
        output.to_path_buf()
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = session.export_document().to_json_pretty()?;
    fs::write(&path, json)?;
    debug!(path = %path.display(), "backup written");
    Ok(path)
}

/// インポートファイルを読み込み・検証する（状態は変更しない）
pub fn read_import(path: &Path) -> Result<ImportBundle> {
    if !path.exists() {
        return Err(ContentIdeasError::FileNotFound(path.display().to_string()));
    }
    let json = fs::read_to_string(path)?;
    Ok(parse_import(&json)?)
}
