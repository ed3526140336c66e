use crate::error::{ContentIdeasError, Result};
use crate::models;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// APIキーの環境変数（保存済みキーより優先）
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// アイデア一覧の表示形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Normal,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::Normal => write!(f, "normal"),
            ViewMode::Compact => write!(f, "compact"),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub text_model: String,
    pub image_model: String,
    pub view_mode: ViewMode,
    pub theme: Theme,
    pub initial_idea_count: usize,
    pub more_idea_count: usize,
    pub timeout_seconds: u64,
    /// 履歴・テンプレートの保存先（省略時はOSのデータディレクトリ）
    pub data_dir: Option<PathBuf>,
    /// 保存データの上限サイズ
    pub max_store_bytes: usize,

    #[serde(skip)]
    path: Option<PathBuf>,

    /// コマンドラインで指定された保存先（設定ファイルには書かない）
    #[serde(skip)]
    data_dir_override: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            text_model: models::default_text_model().into(),
            image_model: models::default_image_model().into(),
            view_mode: ViewMode::Normal,
            theme: Theme::Light,
            initial_idea_count: 10,
            more_idea_count: 10,
            timeout_seconds: 120,
            data_dir: None,
            max_store_bytes: 5 * 1024 * 1024,
            path: None,
            data_dir_override: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_json::from_str::<Config>(&content)?
        } else {
            debug!(path = %config_path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.path = Some(config_path.to_path_buf());

        // 一覧にない保存済みモデルは既定に戻す
        if models::validate_text_model(&config.text_model).is_err() {
            warn!(model = %config.text_model, "unknown text model in config, using default");
            config.text_model = models::default_text_model().into();
        }
        if models::validate_image_model(&config.image_model).is_err() {
            warn!(model = %config.image_model, "unknown image model in config, using default");
            config.image_model = models::default_image_model().into();
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = match &self.path {
            Some(path) => path.clone(),
            None => Self::config_path()?,
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ContentIdeasError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("content-ideas").join("config.json"))
    }

    /// 今回の実行に限り保存先を差し替える
    pub fn override_data_dir(&mut self, dir: impl Into<PathBuf>) {
        self.data_dir_override = Some(dir.into());
    }

    /// 履歴・テンプレートの保存ディレクトリ
    ///
    /// コマンドライン指定 → 設定ファイル → OSのデータディレクトリ の順
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.data_dir_override.as_ref().or(self.data_dir.as_ref()) {
            return Ok(dir.clone());
        }
        let base = dirs::data_local_dir()
            .ok_or_else(|| ContentIdeasError::Config("データディレクトリが見つかりません".into()))?;
        Ok(base.join("content-ideas"))
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or(ContentIdeasError::MissingApiKey)
    }

    /// APIキーを保存（空文字ならクリア）
    pub fn set_api_key(&mut self, key: &str) -> Result<()> {
        let trimmed = key.trim();
        self.api_key = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self.save()
    }

    pub fn clear_api_key(&mut self) -> Result<()> {
        self.api_key = None;
        self.save()
    }

    pub fn set_text_model(&mut self, id: &str) -> Result<()> {
        self.text_model = models::validate_text_model(id)?.into();
        self.save()
    }

    pub fn set_image_model(&mut self, id: &str) -> Result<()> {
        self.image_model = models::validate_image_model(id)?.into();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.text_model, "gemini-2.5-flash");
        assert_eq!(config.view_mode, ViewMode::Normal);
        assert_eq!(config.initial_idea_count, 10);
    }

    #[test]
    fn test_set_api_key_trims_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::load_from(&path).unwrap();

        config.set_api_key("  AIza-test  ").unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api_key.as_deref(), Some("AIza-test"));

        config.set_api_key("   ").unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert!(reloaded.api_key.is_none());
    }

    #[test]
    fn test_invalid_stored_model_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"text_model":"gpt-4","image_model":"imagen-4.0-generate-001"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.text_model, "gemini-2.5-flash");
        assert_eq!(config.image_model, "imagen-4.0-generate-001");
    }

    #[test]
    fn test_set_model_rejects_unknown() {
        let dir = tempdir().unwrap();
        let mut config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert!(config.set_text_model("gemini-2.5-pro").is_ok());
        assert!(matches!(
            config.set_image_model("gemini-2.5-pro").unwrap_err(),
            ContentIdeasError::InvalidModel(_)
        ));
        assert_eq!(config.image_model, "imagen-3.0-generate-002");
    }

    #[test]
    fn test_data_dir_override() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/content-ideas-test")),
            ..Default::default()
        };
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/content-ideas-test"));
    }

    #[test]
    fn test_cli_data_dir_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::load_from(&path).unwrap();

        config.override_data_dir("/tmp/one-off");
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/one-off"));

        config.view_mode = ViewMode::Compact;
        config.save().unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.view_mode, ViewMode::Compact);
        assert!(reloaded.data_dir.is_none());
        assert_ne!(reloaded.data_dir().unwrap(), PathBuf::from("/tmp/one-off"));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("one-off"));
    }

    #[test]
    fn test_cli_data_dir_wins_over_config() {
        let mut config = Config {
            data_dir: Some(PathBuf::from("/tmp/from-config")),
            ..Default::default()
        };
        config.override_data_dir("/tmp/from-cli");
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/from-cli"));
    }
}
