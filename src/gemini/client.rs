//! Gemini API クライアント

use super::types::{GenerateContentRequest, GenerateContentResponse, PredictRequest, PredictResponse};
use super::ContentGenerator;
use crate::config::Config;
use crate::error::{ContentIdeasError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use content_ideas_common::{parse_ideas_response, parse_narration_response, prompts, IdeaRow, NarrationResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API クライアント
pub struct GeminiClient {
    http: Client,
    api_key: String,
    text_model: String,
    image_model: String,
    base_url: String,
}

impl GeminiClient {
    /// 設定から生成（APIキー未設定ならエラー）
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        Self::with_api_key(config, api_key)
    }

    /// 指定のAPIキーで生成（保存前のキー検証用）
    pub fn with_api_key(config: &Config, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ContentIdeasError::ApiCall(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// APIのベースURLを差し替え
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}?key={}", self.base_url, model, method, self.api_key)
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ContentIdeasError::ApiCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ContentIdeasError::ApiCall(format!("{}: {}", status, text)));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ContentIdeasError::ApiParse(e.to_string()))
    }

    /// テキスト生成（generateContent）
    async fn generate_text(&self, request: &GenerateContentRequest) -> Result<String> {
        let url = self.model_url(&self.text_model, "generateContent");
        debug!(model = %self.text_model, "generateContent");

        let response: GenerateContentResponse = self.post_json(&url, request).await?;
        response
            .text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ContentIdeasError::ApiParse("レスポンスにテキストがありません".into()))
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_ideas(&self, topic: &str, columns: &[String], count: usize) -> Result<Vec<IdeaRow>> {
        let prompt = prompts::build_ideas_prompt(topic, columns, count);
        let request = GenerateContentRequest::json(&prompt, prompts::ideas_response_schema(columns));

        let text = self.generate_text(&request).await?;
        debug!(chars = text.len(), "ideas response");
        parse_ideas_response(&text).map_err(|e| ContentIdeasError::ApiParse(e.to_string()))
    }

    async fn generate_narration(&self, rendered_prompt: &str) -> Result<NarrationResult> {
        let prompt = prompts::build_narration_prompt(rendered_prompt);
        let request = GenerateContentRequest::json(&prompt, prompts::narration_response_schema());

        let text = self.generate_text(&request).await?;
        debug!(chars = text.len(), "narration response");
        parse_narration_response(&text).map_err(|e| ContentIdeasError::ApiParse(e.to_string()))
    }

    async fn generate_video_prompt(&self, image_prompt: &str) -> Result<String> {
        let request = GenerateContentRequest::text(&prompts::build_video_prompt(image_prompt));
        self.generate_text(&request).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let url = self.model_url(&self.image_model, "predict");
        debug!(model = %self.image_model, "predict");

        let response: PredictResponse = self.post_json(&url, &PredictRequest::portrait_jpeg(prompt)).await?;
        let encoded = response
            .predictions
            .into_iter()
            .find_map(|p| p.bytes_base64_encoded)
            .ok_or_else(|| {
                warn!("image model returned no predictions");
                ContentIdeasError::ApiParse("画像が生成されませんでした".into())
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ContentIdeasError::ApiParse(format!("画像データのデコードに失敗: {}", e)))
    }

    async fn validate_api_key(&self) -> Result<()> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ContentIdeasError::ApiCall(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ContentIdeasError::InvalidApiKey(format!("{}: {}", status, text)))
        }
    }
}
