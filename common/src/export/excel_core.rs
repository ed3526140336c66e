//! Excel生成（共通ライブラリ）
//!
//! コンパクト表示と同じ表（列記号 + 列名ヘッダ + アイデア行）をExcelに出力

use crate::table::{cell_text, column_letter};
use crate::types::HistoryEntry;
use rust_xlsxwriter::*;

/// 列幅（文字数）の上限
const MAX_COLUMN_WIDTH: f64 = 60.0;

/// 履歴エントリのアイデア一覧をExcelバッファに生成
///
/// # Arguments
/// * `entry` - 出力する履歴エントリ
///
/// # Returns
/// xlsxファイルのバイト列
pub fn generate_ideas_workbook(entry: &HistoryEntry) -> Result<Vec<u8>, String> {
    let columns = entry.table_columns();
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::RGB(0x333333))
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));

    let value_format = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::Top)
        .set_text_wrap()
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xCCCCCC));

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Ideas")
        .map_err(|e| format!("シート名設定エラー: {}", e))?;

    for (col_idx, column) in columns.iter().enumerate() {
        let col = col_idx as u16;
        let header = format!("{} {}", column_letter(col_idx), column);
        worksheet
            .write_string_with_format(0, col, &header, &header_format)
            .map_err(|e| format!("ヘッダ書き込みエラー: {}", e))?;

        let mut width = header.chars().count() as f64;
        for (row_idx, idea) in entry.ideas.iter().enumerate() {
            let cell = cell_text(idea.field_text(column).as_deref());
            width = width.max(cell.chars().count() as f64);
            worksheet
                .write_string_with_format((row_idx + 1) as u32, col, &cell, &value_format)
                .map_err(|e| format!("セル書き込みエラー: {}", e))?;
        }

        worksheet
            .set_column_width(col, (width + 2.0).min(MAX_COLUMN_WIDTH))
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("ウィンドウ枠固定エラー: {}", e))?;

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Idea;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_generate_ideas_workbook() {
        let mut fields = BTreeMap::new();
        fields.insert("Idea".to_string(), json!("Gurita"));
        fields.insert("Hewan".to_string(), json!("Cephalopoda"));
        let entry = HistoryEntry {
            id: "h1".into(),
            timestamp: 1,
            topic: "laut".into(),
            custom_columns: vec!["Hewan".into()],
            ideas: vec![Idea::new("i1", fields, "")],
        };

        let buffer = generate_ideas_workbook(&entry).unwrap();
        // xlsxはZIP形式
        assert!(buffer.starts_with(b"PK"));
    }
}
