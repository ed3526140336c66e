//! 表形式エクスポートの共通部分

#[cfg(feature = "excel")]
pub mod excel_core;
