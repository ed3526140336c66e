//! データモデルの型定義
//!
//! CLIと保存ファイル・エクスポートファイルで共有される型:
//! - Idea: 生成されたアイデア1行（動的な列 + ナレーション + 画像プロンプト）
//! - ImagePrompt: ナレーションの区間ごとの画像プロンプト
//! - HistoryEntry: 1回の生成セッション（トピック + 列構成 + アイデア）
//! - PromptTemplate: 名前付きのナレーションプロンプトテンプレート
//!
//! JSONのキーはcamelCase（既存のバックアップファイルと互換）

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// 常に先頭に置かれるアイデア列
pub const IDEA_COLUMN: &str = "Idea";

/// アイデア本体のキーと重なるため列名に使えない名前
pub const RESERVED_FIELD_NAMES: &[&str] = &[
    "id",
    "narration",
    "imagePrompts",
    "narrationLoading",
    "narrationPrompt",
    "notes",
];

pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELD_NAMES.contains(&name)
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// 画像プロンプト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrompt {
    /// 区間ラベル（例: "0-5s"）
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub prompt: String,

    /// 外部ツールで生成済みとしてマークされたか
    #[serde(default)]
    pub generated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub video_prompt_loading: bool,

    /// 生成画像のData URL（保存時には除去される）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub image_loading: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub image_error: bool,
}

impl ImagePrompt {
    pub fn new(timestamp: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}

/// コンテンツアイデア
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompts: Option<Vec<ImagePrompt>>,

    #[serde(default)]
    pub narration_loading: bool,

    /// 編集中のナレーションプロンプト（未展開の {{列}} を含み得る）
    #[serde(default)]
    pub narration_prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// 動的な列（"Idea" + ユーザー定義列）
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Idea {
    /// 予約名と重なる列は捨てる（保存時にキーが重複するため）
    pub fn new(id: impl Into<String>, mut fields: BTreeMap<String, Value>, narration_prompt: impl Into<String>) -> Self {
        fields.retain(|name, _| !is_reserved_field(name));
        Self {
            id: id.into(),
            narration_prompt: narration_prompt.into(),
            fields,
            ..Default::default()
        }
    }

    /// 列の値を文字列で取得
    pub fn field_text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.fields.get(column).and_then(value_as_text)
    }

    pub fn prompts(&self) -> &[ImagePrompt] {
        self.image_prompts.as_deref().unwrap_or(&[])
    }

    pub fn has_generated_images(&self) -> bool {
        self.prompts().iter().any(ImagePrompt::has_image)
    }

    /// 画像データを除いたコピー
    pub fn without_image_data(&self) -> Self {
        let mut idea = self.clone();
        if let Some(prompts) = idea.image_prompts.as_mut() {
            for prompt in prompts {
                prompt.image_url = None;
            }
        }
        idea
    }

    /// 処理中フラグを落としたコピー
    pub fn without_transient_flags(&self) -> Self {
        let mut idea = self.clone();
        idea.narration_loading = false;
        if let Some(prompts) = idea.image_prompts.as_mut() {
            for prompt in prompts {
                prompt.image_loading = false;
                prompt.video_prompt_loading = false;
            }
        }
        idea
    }
}

/// 履歴エントリ（1回の生成セッション）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,

    /// 作成日時（UNIXエポックからのミリ秒）
    pub timestamp: i64,

    pub topic: String,

    #[serde(default)]
    pub custom_columns: Vec<String>,

    #[serde(default)]
    pub ideas: Vec<Idea>,
}

impl HistoryEntry {
    /// 表示列（"Idea" + ユーザー定義列）
    pub fn table_columns(&self) -> Vec<String> {
        crate::table::table_columns(&self.custom_columns)
    }

    pub fn find_idea(&self, idea_id: &str) -> Option<&Idea> {
        self.ideas.iter().find(|idea| idea.id == idea_id)
    }

    pub fn without_image_data(&self) -> Self {
        Self {
            ideas: self.ideas.iter().map(Idea::without_image_data).collect(),
            ..self.clone()
        }
    }

    pub fn without_transient_flags(&self) -> Self {
        Self {
            ideas: self.ideas.iter().map(Idea::without_transient_flags).collect(),
            ..self.clone()
        }
    }
}

/// ナレーションプロンプトテンプレート
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub template: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// テンプレート展開時の値の取得元
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl FieldSource for Idea {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.field_text(name)
    }
}

impl FieldSource for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl FieldSource for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }
}

/// JSON値を表示用文字列に変換（null/falseは値なし扱い）
fn value_as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(true) => Some(Cow::Borrowed("true")),
        Value::Bool(false) | Value::Null => None,
        other => Some(Cow::Owned(other.to_string())),
    }
}
