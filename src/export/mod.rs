pub mod backup;
pub mod excel;

use crate::cli::TableFormat;
use crate::error::Result;
use content_ideas_common::{table, HistoryEntry};
use std::fs;
use std::path::{Path, PathBuf};

fn output_path_for_format(output: &Path, title: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", title, extension))
    } else {
        output.to_path_buf()
    }
}

/// 出力ファイル名に使えるようにトピックを短くする
fn title_for(entry: &HistoryEntry) -> String {
    let title: String = entry
        .topic
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .take(40)
        .collect();
    let title = title.trim_matches('-');
    if title.is_empty() {
        "ideas".to_string()
    } else {
        title.to_string()
    }
}

/// アイデア一覧を表形式で書き出す
pub fn export_table(entry: &HistoryEntry, format: TableFormat, output: &Path) -> Result<PathBuf> {
    let title = title_for(entry);
    match format {
        TableFormat::Tsv => {
            let output_path = output_path_for_format(output, &title, "tsv");
            fs::write(&output_path, table::to_tsv(entry))?;
            println!("✔ TSV出力: {}", output_path.display());
            Ok(output_path)
        }
        TableFormat::Xlsx => {
            let output_path = output_path_for_format(output, &title, "xlsx");
            println!("- Excelを生成中...");
            excel::generate_excel(entry, &output_path)?;
            println!("✔ Excel出力: {}", output_path.display());
            Ok(output_path)
        }
    }
}
