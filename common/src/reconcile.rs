//! 履歴・テンプレートのマージモジュール
//!
//! インポート時に、手元の履歴/テンプレートと外部ファイルの内容を統合する。
//! - 履歴: キー（既定はトピック文字列）が同じなら新しい方を採用、新しい順に並べる
//! - テンプレート: 名前が同じなら手元を優先

use crate::types::{HistoryEntry, PromptTemplate};
use std::collections::HashMap;

/// 履歴の重複判定キー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeKey {
    /// トピック文字列（同じトピックの別セッションは1件にまとまる）
    #[default]
    Topic,
    /// 履歴ID
    Id,
}

impl MergeKey {
    fn of<'a>(&self, entry: &'a HistoryEntry) -> &'a str {
        match self {
            MergeKey::Topic => &entry.topic,
            MergeKey::Id => &entry.id,
        }
    }
}

impl std::str::FromStr for MergeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topic" => Ok(MergeKey::Topic),
            "id" => Ok(MergeKey::Id),
            _ => Err(format!("Unknown merge key: {}. Use topic or id", s)),
        }
    }
}

/// 履歴をトピックでマージ
pub fn merge_history(current: &[HistoryEntry], imported: &[HistoryEntry]) -> Vec<HistoryEntry> {
    merge_history_by(current, imported, MergeKey::Topic)
}

/// 履歴を指定キーでマージ
///
/// - 同じキーのエントリはタイムスタンプが大きい方を採用（同値なら先に現れた方）
/// - 結果はタイムスタンプ降順（同値は出現順を保持）
pub fn merge_history_by(
    current: &[HistoryEntry],
    imported: &[HistoryEntry],
    key: MergeKey,
) -> Vec<HistoryEntry> {
    let mut merged: Vec<HistoryEntry> = Vec::with_capacity(current.len() + imported.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entry in current.iter().chain(imported) {
        let k = key.of(entry);
        match index.get(k) {
            Some(&i) => {
                if entry.timestamp > merged[i].timestamp {
                    merged[i] = entry.clone();
                }
            }
            None => {
                index.insert(k, merged.len());
                merged.push(entry.clone());
            }
        }
    }

    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged
}

/// テンプレートを名前でマージ（手元を優先）
pub fn merge_templates(current: &[PromptTemplate], imported: &[PromptTemplate]) -> Vec<PromptTemplate> {
    let mut merged = current.to_vec();
    for template in imported {
        if !merged.iter().any(|t| t.name == template.name) {
            merged.push(template.clone());
        }
    }
    merged
}
