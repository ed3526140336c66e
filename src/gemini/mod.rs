//! 生成AI連携モジュール
//!
//! - ContentGenerator: アイデア/ナレーション/動画プロンプト/画像を生成する外部AIの抽象
//! - GeminiClient: Gemini REST APIによる実装

mod client;
mod types;

pub use client::{GeminiClient, GEMINI_API_BASE};

use crate::error::Result;
use async_trait::async_trait;
use content_ideas_common::{IdeaRow, NarrationResult};

/// 外部AIの生成機能
///
/// いずれも失敗し得る非同期呼び出しで、呼び出し側は再試行しない
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// トピックから指定列を持つアイデアを `count` 件生成
    async fn generate_ideas(&self, topic: &str, columns: &[String], count: usize) -> Result<Vec<IdeaRow>>;

    /// 展開済みプロンプトからナレーションと画像プロンプトを生成
    async fn generate_narration(&self, rendered_prompt: &str) -> Result<NarrationResult>;

    /// 画像プロンプトから動画用プロンプトを生成
    async fn generate_video_prompt(&self, image_prompt: &str) -> Result<String>;

    /// 画像プロンプトからJPEG画像を生成
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;

    /// APIキーの有効性を確認
    async fn validate_api_key(&self) -> Result<()>;
}
