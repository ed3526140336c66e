//! Gemini REST APIのリクエスト/レスポンス型

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// generateContent リクエスト
#[derive(Serialize)]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Serialize)]
pub(crate) struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    pub response_mime_type: String,
    #[serde(rename = "responseSchema")]
    pub response_schema: Value,
}

impl GenerateContentRequest {
    pub fn text(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
            generation_config: None,
        }
    }

    /// JSONスキーマ指定付きリクエスト
    pub fn json(prompt: &str, schema: Value) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".into(),
                response_schema: schema,
            }),
            ..Self::text(prompt)
        }
    }
}

/// generateContent レスポンス
#[derive(Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
}

#[derive(Deserialize)]
pub(crate) struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
pub(crate) struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// 最初の候補のテキストを連結
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Imagen predict リクエスト
#[derive(Serialize)]
pub(crate) struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

#[derive(Serialize)]
pub(crate) struct PredictInstance {
    pub prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PredictParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
    pub output_options: OutputOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OutputOptions {
    pub mime_type: String,
}

impl PredictRequest {
    /// 縦長（9:16）JPEGを1枚
    pub fn portrait_jpeg(prompt: &str) -> Self {
        Self {
            instances: vec![PredictInstance { prompt: prompt.to_string() }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "9:16".into(),
                output_options: OutputOptions {
                    mime_type: "image/jpeg".into(),
                },
            },
        }
    }
}

/// Imagen predict レスポンス
#[derive(Deserialize)]
pub(crate) struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
}
