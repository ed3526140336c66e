//! 生成ワークフロー
//!
//! 外部AIへの呼び出しとセッション更新をつなぐ。
//! 失敗は呼び出し単位で回収し、警告ログとセッションの通知に残す。
//! 一括処理は全リクエストを同時に投げ、完了した順に結果を反映する。

use crate::error::{ContentIdeasError, Result};
use crate::gemini::ContentGenerator;
use crate::images;
use crate::session::Session;
use content_ideas_common::{
    is_reserved_field, prompts, render, table, HistoryEntry, Idea, IdeaRow, ImagePrompt, IDEA_COLUMN,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 一括処理の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// ユーザー定義列を正規化（空白除去・空/重複/"Idea" を除外）
///
/// アイデア本体のキー（id, notes など）と同名の列はエラー
pub fn normalize_columns<S: AsRef<str>>(columns: &[S]) -> Result<Vec<String>> {
    let mut result: Vec<String> = Vec::new();
    for column in columns {
        let column = column.as_ref().trim();
        if column.is_empty() || column == IDEA_COLUMN || result.iter().any(|c| c == column) {
            continue;
        }
        if is_reserved_field(column) {
            return Err(ContentIdeasError::Config(format!("列名「{}」は使用できません", column)));
        }
        result.push(column.to_string());
    }
    Ok(result)
}

/// 生成された1行をアイデアに変換
pub fn idea_from_row(row: IdeaRow) -> Idea {
    let fields: BTreeMap<_, _> = row.into_iter().collect();
    Idea::new(Uuid::new_v4().to_string(), fields, prompts::ANIMAL_TEMPLATE)
}

fn record_failure(session: &mut Session, context: &str, error: &ContentIdeasError) {
    warn!(%error, "{} failed", context);
    session.set_notice(format!("{}に失敗しました: {}", context, error));
}

// =============================================
// アイデア
// =============================================

/// トピックからアイデアを生成し、新しい履歴として追加
///
/// 生成に失敗しても履歴は作成する（アイデア0件 + 通知）。
/// 戻り値は作成した履歴のID。
pub async fn generate_ideas<G>(
    session: &mut Session,
    generator: &G,
    topic: &str,
    custom_columns: &[String],
    count: usize,
) -> Result<String>
where
    G: ContentGenerator + ?Sized,
{
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(ContentIdeasError::Config("トピックを入力してください".into()));
    }
    let custom_columns = normalize_columns(custom_columns)?;
    let columns = table::table_columns(&custom_columns);

    info!(%topic, count, "generating ideas");
    let ideas = match generator.generate_ideas(topic, &columns, count).await {
        Ok(rows) => rows.into_iter().map(idea_from_row).collect(),
        Err(e) => {
            record_failure(session, "アイデア生成", &e);
            Vec::new()
        }
    };

    let entry = HistoryEntry {
        id: Uuid::new_v4().to_string(),
        timestamp: now_millis(),
        topic: topic.to_string(),
        custom_columns,
        ideas,
    };
    let id = entry.id.clone();
    session.add_entry(entry);
    Ok(id)
}

/// 選択中の履歴にアイデアを追加生成
///
/// 戻り値は追加した件数（失敗時は0 + 通知）
pub async fn generate_more<G>(session: &mut Session, generator: &G, count: usize) -> Result<usize>
where
    G: ContentGenerator + ?Sized,
{
    let entry = session.require_active_entry()?;
    let entry_id = entry.id.clone();
    let topic = entry.topic.clone();
    let columns = entry.table_columns();

    let rows = match generator.generate_ideas(&topic, &columns, count).await {
        Ok(rows) => rows,
        Err(e) => {
            record_failure(session, "アイデアの追加生成", &e);
            return Ok(0);
        }
    };

    let ideas: Vec<Idea> = rows.into_iter().map(idea_from_row).collect();
    let added = ideas.len();
    session.append_ideas(&entry_id, ideas)?;
    Ok(added)
}

// =============================================
// ナレーション
// =============================================

fn rendered_narration_prompt(session: &Session, entry_id: &str, idea_id: &str) -> Result<String> {
    let idea = session
        .find_idea(entry_id, idea_id)
        .ok_or_else(|| ContentIdeasError::IdeaNotFound(idea_id.to_string()))?;
    Ok(render(&idea.narration_prompt, idea))
}

fn set_narration_loading(session: &mut Session, entry_id: &str, idea_id: &str) -> Result<()> {
    session.update_idea(entry_id, idea_id, |idea| Idea {
        narration_loading: true,
        ..idea.clone()
    })
}

fn apply_narration(
    session: &mut Session,
    entry_id: &str,
    idea_id: &str,
    result: Result<content_ideas_common::NarrationResult>,
) -> Result<bool> {
    match result {
        Ok(narration) => {
            debug!(%idea_id, prompts = narration.image_prompts.len(), "narration generated");
            session.update_idea(entry_id, idea_id, |idea| Idea {
                narration: Some(narration.narration),
                image_prompts: Some(narration.image_prompts),
                narration_loading: false,
                ..idea.clone()
            })?;
            Ok(true)
        }
        Err(e) => {
            session.update_idea(entry_id, idea_id, |idea| Idea {
                narration_loading: false,
                ..idea.clone()
            })?;
            record_failure(session, "ナレーション生成", &e);
            Ok(false)
        }
    }
}

/// アイデア1件のナレーションと画像プロンプトを生成
///
/// プロンプトはアイデアの列値で展開してから送る。
/// 失敗時は `false`（既存のナレーションは残る）。
pub async fn generate_narration<G>(
    session: &mut Session,
    generator: &G,
    entry_id: &str,
    idea_id: &str,
) -> Result<bool>
where
    G: ContentGenerator + ?Sized,
{
    let prompt = rendered_narration_prompt(session, entry_id, idea_id)?;
    set_narration_loading(session, entry_id, idea_id)?;

    let result = generator.generate_narration(&prompt).await;
    apply_narration(session, entry_id, idea_id, result)
}

/// 複数アイデアのナレーションを同時に生成
///
/// 1件の失敗は他に影響しない
pub async fn generate_narrations<G>(
    session: &mut Session,
    generator: &G,
    entry_id: &str,
    idea_ids: &[String],
) -> Result<BulkSummary>
where
    G: ContentGenerator + ?Sized,
{
    let mut requests = Vec::with_capacity(idea_ids.len());
    for idea_id in idea_ids {
        let prompt = rendered_narration_prompt(session, entry_id, idea_id)?;
        requests.push((idea_id.clone(), prompt));
    }
    for (idea_id, _) in &requests {
        set_narration_loading(session, entry_id, idea_id)?;
    }

    info!(count = requests.len(), "generating narrations");
    let mut pending: FuturesUnordered<_> = requests
        .into_iter()
        .map(|(idea_id, prompt)| async move {
            let result = generator.generate_narration(&prompt).await;
            (idea_id, result)
        })
        .collect();

    let mut summary = BulkSummary::default();
    while let Some((idea_id, result)) = pending.next().await {
        if apply_narration(session, entry_id, &idea_id, result)? {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }
    Ok(summary)
}

// =============================================
// 動画プロンプト
// =============================================

/// 画像プロンプトから動画プロンプトを生成
pub async fn generate_video_prompt<G>(
    session: &mut Session,
    generator: &G,
    entry_id: &str,
    idea_id: &str,
    index: usize,
) -> Result<bool>
where
    G: ContentGenerator + ?Sized,
{
    let image_prompt = prompt_at(session, entry_id, idea_id, index)?.prompt;
    session.update_image_prompt(entry_id, idea_id, index, |p| ImagePrompt {
        video_prompt_loading: true,
        ..p.clone()
    })?;

    match generator.generate_video_prompt(&image_prompt).await {
        Ok(video_prompt) => {
            session.update_image_prompt(entry_id, idea_id, index, |p| ImagePrompt {
                video_prompt: Some(video_prompt.trim().to_string()),
                video_prompt_loading: false,
                ..p.clone()
            })?;
            Ok(true)
        }
        Err(e) => {
            session.update_image_prompt(entry_id, idea_id, index, |p| ImagePrompt {
                video_prompt_loading: false,
                ..p.clone()
            })?;
            record_failure(session, "動画プロンプト生成", &e);
            Ok(false)
        }
    }
}

// =============================================
// 画像
// =============================================

fn prompt_at(session: &Session, entry_id: &str, idea_id: &str, index: usize) -> Result<ImagePrompt> {
    session
        .find_idea(entry_id, idea_id)
        .and_then(|idea| idea.prompts().get(index))
        .cloned()
        .ok_or_else(|| ContentIdeasError::PromptNotFound(format!("{} #{}", idea_id, index + 1)))
}

fn set_image_loading(session: &mut Session, entry_id: &str, idea_id: &str, index: usize) -> Result<()> {
    session.update_image_prompt(entry_id, idea_id, index, |p| ImagePrompt {
        image_loading: true,
        image_error: false,
        ..p.clone()
    })
}

fn apply_image(
    session: &mut Session,
    entry_id: &str,
    idea_id: &str,
    index: usize,
    result: Result<Vec<u8>>,
) -> Result<bool> {
    match result {
        Ok(bytes) => {
            let url = images::to_data_url(&bytes);
            session.update_image_prompt(entry_id, idea_id, index, |p| ImagePrompt {
                image_url: Some(url),
                image_loading: false,
                image_error: false,
                ..p.clone()
            })?;
            Ok(true)
        }
        Err(e) => {
            session.update_image_prompt(entry_id, idea_id, index, |p| ImagePrompt {
                image_loading: false,
                image_error: true,
                ..p.clone()
            })?;
            record_failure(session, "画像生成", &e);
            Ok(false)
        }
    }
}

/// 画像プロンプト1件の画像を生成
pub async fn generate_image<G>(
    session: &mut Session,
    generator: &G,
    entry_id: &str,
    idea_id: &str,
    index: usize,
) -> Result<bool>
where
    G: ContentGenerator + ?Sized,
{
    let prompt = prompt_at(session, entry_id, idea_id, index)?.prompt;
    set_image_loading(session, entry_id, idea_id, index)?;

    let result = generator.generate_image(&prompt).await;
    apply_image(session, entry_id, idea_id, index, result)
}

/// 画像がまだない全プロンプトの画像を同時に生成
///
/// 完了後、各プロンプトは画像ありかエラーのどちらかになる
pub async fn generate_all_images<G>(
    session: &mut Session,
    generator: &G,
    entry_id: &str,
    idea_id: &str,
) -> Result<BulkSummary>
where
    G: ContentGenerator + ?Sized,
{
    let idea = session
        .find_idea(entry_id, idea_id)
        .ok_or_else(|| ContentIdeasError::IdeaNotFound(idea_id.to_string()))?;
    let targets: Vec<(usize, String)> = idea
        .prompts()
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.has_image())
        .map(|(i, p)| (i, p.prompt.clone()))
        .collect();

    for (index, _) in &targets {
        set_image_loading(session, entry_id, idea_id, *index)?;
    }

    info!(count = targets.len(), "generating images");
    let mut pending: FuturesUnordered<_> = targets
        .into_iter()
        .map(|(index, prompt)| async move {
            let result = generator.generate_image(&prompt).await;
            (index, result)
        })
        .collect();

    let mut summary = BulkSummary::default();
    while let Some((index, result)) = pending.next().await {
        if apply_image(session, entry_id, idea_id, index, result)? {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }
    Ok(summary)
}

// =============================================
// 手動編集
// =============================================

/// 画像プロンプトの「生成済み」マークを設定
pub fn mark_generated(session: &mut Session, entry_id: &str, idea_id: &str, index: usize, generated: bool) -> Result<()> {
    session.update_image_prompt(entry_id, idea_id, index, |p| ImagePrompt {
        generated,
        ..p.clone()
    })
}

/// メモを設定（空なら削除）
pub fn set_notes(session: &mut Session, entry_id: &str, idea_id: &str, notes: &str) -> Result<()> {
    let notes = Some(notes.trim().to_string()).filter(|n| !n.is_empty());
    session.update_idea(entry_id, idea_id, |idea| Idea {
        notes,
        ..idea.clone()
    })
}

/// ナレーションプロンプトを置き換え（テンプレート適用・手動編集）
pub fn set_narration_prompt(session: &mut Session, entry_id: &str, idea_id: &str, prompt: &str) -> Result<()> {
    session.update_idea(entry_id, idea_id, |idea| Idea {
        narration_prompt: prompt.to_string(),
        ..idea.clone()
    })
}
