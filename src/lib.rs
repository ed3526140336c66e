//! content-ideas
//!
//! トピックから動画コンテンツのアイデア一覧を生成し、ナレーション・画像プロンプト・
//! 画像へと展開するCLIツールのライブラリ部分

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod images;
pub mod models;
pub mod session;
pub mod store;
pub mod workflow;
