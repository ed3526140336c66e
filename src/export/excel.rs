//! Excel生成（CLI版）
//!
//! ワークブックの内容は共通ライブラリで作り、ここではファイルに書く

use crate::error::{ContentIdeasError, Result};
use content_ideas_common::export::excel_core::generate_ideas_workbook;
use content_ideas_common::HistoryEntry;
use std::fs;
use std::path::Path;

pub fn generate_excel(entry: &HistoryEntry, output_path: &Path) -> Result<()> {
    let bytes = generate_ideas_workbook(entry).map_err(ContentIdeasError::ExcelGeneration)?;
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, bytes)?;
    Ok(())
}
