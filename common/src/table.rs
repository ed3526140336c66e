//! 一覧表示ユーティリティ
//!
//! コンパクト表示（表形式）のための列・セル変換と、
//! ナレーションの文字数/単語数カウント

use crate::types::{HistoryEntry, IDEA_COLUMN};

/// 表示列（"Idea" + ユーザー定義列）
pub fn table_columns(custom_columns: &[String]) -> Vec<String> {
    std::iter::once(IDEA_COLUMN.to_string())
        .chain(custom_columns.iter().cloned())
        .collect()
}

/// 表計算ソフト形式の列記号（0 → A, 25 → Z, 26 → AA）
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index as i64;
    while n >= 0 {
        letters.push((b'A' + (n % 26) as u8) as char);
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// 列数分の列記号
pub fn column_letters(count: usize) -> Vec<String> {
    (0..count).map(column_letter).collect()
}

/// セル値を1行に整形（改行を空白に置換）
pub fn cell_text(value: Option<&str>) -> String {
    value
        .map(|v| v.replace("\r\n", " ").replace(['\r', '\n'], " "))
        .unwrap_or_default()
}

/// 履歴エントリをTSVに変換
///
/// 1行目はヘッダ、各セルはダブルクォートで囲み、内部の `"` は `""` にエスケープする。
/// 表計算ソフトへの貼り付けを想定。
pub fn to_tsv(entry: &HistoryEntry) -> String {
    let columns = entry.table_columns();
    let mut lines = Vec::with_capacity(entry.ideas.len() + 1);
    lines.push(columns.join("\t"));

    for idea in &entry.ideas {
        let row = columns
            .iter()
            .map(|column| {
                let cell = cell_text(idea.field_text(column).as_deref());
                format!("\"{}\"", cell.replace('"', "\"\""))
            })
            .collect::<Vec<_>>()
            .join("\t");
        lines.push(row);
    }

    lines.join("\n")
}

/// 単語数（空白区切り）
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 文字数
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}
