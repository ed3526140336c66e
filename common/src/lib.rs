//! Content Ideas Common Library
//!
//! CLIと保存ファイルで共有される型、テンプレート展開、履歴マージ

pub mod types;
pub mod error;
pub mod template;
pub mod reconcile;
pub mod archive;
pub mod parser;
pub mod prompts;
pub mod table;
pub mod export;

pub use types::{
    is_reserved_field, FieldSource, HistoryEntry, Idea, ImagePrompt, PromptTemplate, IDEA_COLUMN,
    RESERVED_FIELD_NAMES,
};
pub use error::{Error, Result};
pub use template::{insert_variable, placeholders, render, to_template};
pub use reconcile::{merge_history, merge_history_by, merge_templates, MergeKey};
pub use archive::{parse_import, strip_image_data, ExportDocument, ImportBundle, ARCHIVE_VERSION};
pub use parser::{extract_json, parse_ideas_response, parse_narration_response, IdeaRow, NarrationResult};
