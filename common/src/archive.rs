//! エクスポート/インポートファイル
//!
//! エクスポート形式: `{ "version": 1, "history": [...], "templates": [...] }`
//!
//! インポートは2形式を受け付ける:
//! 1. 履歴エントリの配列のみ（旧形式）
//! 2. `history` / `templates` 配列を任意に持つオブジェクト（現行形式）

use crate::error::{Error, Result};
use crate::types::{HistoryEntry, PromptTemplate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// エクスポートファイルのバージョン
pub const ARCHIVE_VERSION: u32 = 1;

/// エクスポートファイル
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: u32,
    pub history: Vec<HistoryEntry>,
    pub templates: Vec<PromptTemplate>,
}

impl ExportDocument {
    pub fn new(history: Vec<HistoryEntry>, templates: Vec<PromptTemplate>) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            history,
            templates,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// インポートファイルの内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBundle {
    pub history: Vec<HistoryEntry>,
    pub templates: Vec<PromptTemplate>,
}

/// インポートファイルをパース
///
/// 配列でも、`history`/`templates` のどちらかの配列を持つオブジェクトでもない場合は
/// `Error::InvalidFormat` を返す。
pub fn parse_import(json: &str) -> Result<ImportBundle> {
    let value: Value = serde_json::from_str(json)?;

    match value {
        Value::Array(_) => {
            let history: Vec<HistoryEntry> = serde_json::from_value(value)?;
            Ok(ImportBundle {
                history,
                templates: Vec::new(),
            })
        }
        Value::Object(mut object) => {
            let mut bundle = ImportBundle::default();
            let mut has_content = false;

            if let Some(history @ Value::Array(_)) = object.remove("history") {
                bundle.history = serde_json::from_value(history)?;
                has_content = true;
            }
            if let Some(templates @ Value::Array(_)) = object.remove("templates") {
                bundle.templates = serde_json::from_value(templates)?;
                has_content = true;
            }

            if !has_content {
                return Err(Error::InvalidFormat(
                    "history/templates 配列が含まれていません".into(),
                ));
            }
            Ok(bundle)
        }
        _ => Err(Error::InvalidFormat(
            "配列またはオブジェクトではありません".into(),
        )),
    }
}

/// 保存用に生成画像データを除去
pub fn strip_image_data(history: &[HistoryEntry]) -> Vec<HistoryEntry> {
    history.iter().map(HistoryEntry::without_image_data).collect()
}
