use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentIdeasError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`content-ideas config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("APIキーが無効です: {0}")]
    InvalidApiKey(String),

    #[error("不明なモデル: {0}")]
    InvalidModel(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("履歴が見つかりません: {0}")]
    HistoryNotFound(String),

    #[error("アイデアが見つかりません: {0}")]
    IdeaNotFound(String),

    #[error("テンプレートが見つかりません: {0}")]
    TemplateNotFound(String),

    #[error("画像プロンプトが見つかりません: {0}")]
    PromptNotFound(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("保存容量を超えました（{size} bytes > {limit} bytes）。データをエクスポートしてください")]
    StorageQuota { size: usize, limit: usize },

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error(transparent)]
    Common(#[from] content_ideas_common::Error),
}

pub type Result<T> = std::result::Result<T, ContentIdeasError>;
