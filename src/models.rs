//! 利用可能なモデル一覧

use crate::error::{ContentIdeasError, Result};

/// モデル定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub disabled: bool,
}

/// テキスト生成モデル（先頭が既定）
pub const TEXT_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "gemini-2.5-flash", name: "Gemini 2.5 Flash (Recommended)", disabled: false },
    ModelInfo { id: "gemini-2.5-pro", name: "Gemini 2.5 Pro", disabled: false },
    ModelInfo { id: "gemini-1.5-pro-latest", name: "Gemini 1.5 Pro", disabled: false },
];

/// 画像生成モデル（先頭が既定）
pub const IMAGE_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "imagen-3.0-generate-002", name: "Imagen 3.0", disabled: false },
    ModelInfo { id: "imagen-4.0-generate-001", name: "Imagen 4.0", disabled: false },
];

pub fn default_text_model() -> &'static str {
    TEXT_MODELS[0].id
}

pub fn default_image_model() -> &'static str {
    IMAGE_MODELS[0].id
}

/// テキストモデルIDを検証
pub fn validate_text_model(id: &str) -> Result<&'static str> {
    find_enabled(TEXT_MODELS, id)
}

/// 画像モデルIDを検証（無効化されたモデルは不可）
pub fn validate_image_model(id: &str) -> Result<&'static str> {
    find_enabled(IMAGE_MODELS, id)
}

/// 表示名（一覧にないIDはそのまま）
pub fn display_name(id: &str) -> &str {
    TEXT_MODELS
        .iter()
        .chain(IMAGE_MODELS)
        .find(|m| m.id == id)
        .map(|m| m.name)
        .unwrap_or(id)
}

fn find_enabled(models: &[ModelInfo], id: &str) -> Result<&'static str> {
    models
        .iter()
        .find(|m| m.id == id && !m.disabled)
        .map(|m| m.id)
        .ok_or_else(|| ContentIdeasError::InvalidModel(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(default_text_model(), "gemini-2.5-flash");
        assert_eq!(default_image_model(), "imagen-3.0-generate-002");
    }

    #[test]
    fn test_validate_models() {
        assert_eq!(validate_text_model("gemini-2.5-pro").unwrap(), "gemini-2.5-pro");
        assert!(validate_text_model("imagen-4.0-generate-001").is_err());
        assert_eq!(
            validate_image_model("imagen-4.0-generate-001").unwrap(),
            "imagen-4.0-generate-001"
        );
        assert!(matches!(
            validate_image_model("dall-e").unwrap_err(),
            ContentIdeasError::InvalidModel(_)
        ));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("gemini-2.5-flash"), "Gemini 2.5 Flash (Recommended)");
        assert_eq!(display_name("custom-model"), "custom-model");
    }
}
