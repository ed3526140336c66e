use crate::config::{Theme, ViewMode};
use clap::{Parser, Subcommand};
use content_ideas_common::MergeKey;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "content-ideas")]
#[command(about = "動画コンテンツのアイデア・ナレーション・画像プロンプト生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 履歴・テンプレートの保存先（設定より優先）
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 確認をすべて「はい」で進める
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// トピックからアイデア一覧を生成（新しい履歴を作成）
    Generate {
        /// トピック（省略時は既定のトピック）
        topic: Option<String>,

        /// 追加列（カンマ区切り、省略時は既定の列）
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// 生成件数（省略時は設定値）
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// 選択中の履歴にアイデアを追加生成
    More {
        /// 生成件数（省略時は設定値）
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// 履歴の管理
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// アイデアの詳細（ナレーション・画像プロンプト）を表示
    Show {
        /// アイデア（行番号またはID）
        idea: String,
    },

    /// ナレーションと画像プロンプトを生成
    Narrate {
        /// アイデア（行番号またはID、複数指定で同時生成）
        ideas: Vec<String>,

        /// 選択中の履歴の全アイデア
        #[arg(long, conflicts_with = "ideas")]
        all: bool,
    },

    /// ナレーションプロンプトを表示/編集
    Prompt {
        /// アイデア（行番号またはID）
        idea: String,

        /// プロンプトを置き換え
        #[arg(long)]
        set: Option<String>,

        /// 列の変数 `{{列名}}` を挿入
        #[arg(long)]
        insert: Option<String>,

        /// 挿入位置（文字数、省略時は末尾）
        #[arg(long, requires = "insert")]
        at: Option<usize>,
    },

    /// 画像プロンプトから動画プロンプトを生成
    VideoPrompt {
        /// アイデア（行番号またはID）
        idea: String,

        /// 画像プロンプト番号（1始まり）
        prompt: usize,
    },

    /// 画像を生成して保存
    Images {
        /// アイデア（行番号またはID）
        idea: String,

        /// 画像プロンプト番号（省略時は画像のない全プロンプト）
        #[arg(short, long)]
        prompt: Option<usize>,

        /// 保存先ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// 画像プロンプトを生成済みとしてマーク
    Mark {
        /// アイデア（行番号またはID）
        idea: String,

        /// 画像プロンプト番号（1始まり）
        prompt: usize,

        /// マークを外す
        #[arg(long)]
        off: bool,
    },

    /// アイデアのメモを表示/編集
    Notes {
        /// アイデア（行番号またはID）
        idea: String,

        /// メモ本文（省略時は表示のみ）
        text: Option<String>,

        /// メモを削除
        #[arg(long, conflicts_with = "text")]
        clear: bool,
    },

    /// プロンプトテンプレートの管理
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// アイデア一覧を表形式で出力
    Table {
        /// 出力形式 (tsv/xlsx)
        #[arg(short, long, default_value = "tsv")]
        format: TableFormat,

        /// 出力ファイル/ディレクトリ（TSVは省略時に標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 履歴とテンプレートをバックアップファイルに書き出す
    Export {
        /// 出力ファイル/ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// バックアップファイルを読み込んでマージ
    Import {
        /// バックアップファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 履歴の重複判定キー (topic/id)
        #[arg(long, default_value = "topic")]
        merge_by: MergeKey,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// APIキーを対話入力で設定
        #[arg(long, conflicts_with = "set_api_key")]
        prompt_api_key: bool,

        /// 保存済みAPIキーを削除
        #[arg(long)]
        clear_api_key: bool,

        /// APIキー設定時の検証をスキップ
        #[arg(long)]
        no_validate: bool,

        /// テキストモデル
        #[arg(long)]
        text_model: Option<String>,

        /// 画像モデル
        #[arg(long)]
        image_model: Option<String>,

        /// 一覧の表示形式
        #[arg(long, value_enum)]
        view_mode: Option<ViewMode>,

        /// テーマ
        #[arg(long, value_enum)]
        theme: Option<Theme>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// 利用可能なモデル一覧
    Models,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 履歴一覧
    List,

    /// 履歴のアイデア一覧を表示（省略時は選択中）
    Show {
        /// 履歴（番号またはID）
        history: Option<String>,
    },

    /// 履歴を選択
    Use {
        /// 履歴（番号またはID）
        history: String,
    },

    /// 履歴を削除
    Delete {
        /// 履歴（番号またはID）
        history: String,
    },

    /// 選択中の履歴の表示をリセット（再選択で復元）
    Reset,
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// テンプレート一覧
    List,

    /// テンプレート本文を表示
    Show {
        /// テンプレート（名前または番号）
        template: String,
    },

    /// テンプレートを追加
    Add {
        /// 名前
        name: String,

        /// 本文
        #[arg(long, required_unless_present = "file")]
        body: Option<String>,

        /// 本文をファイルから読み込む
        #[arg(long, conflicts_with = "body")]
        file: Option<PathBuf>,
    },

    /// アイデアのナレーションプロンプトをテンプレートとして保存
    Save {
        /// アイデア（行番号またはID）
        idea: String,

        /// テンプレート名
        name: String,
    },

    /// テンプレートを編集
    Edit {
        /// テンプレート（名前または番号）
        template: String,

        /// 新しい名前
        #[arg(long)]
        name: Option<String>,

        /// 新しい本文
        #[arg(long)]
        body: Option<String>,
    },

    /// テンプレートを削除
    Delete {
        /// テンプレート（名前または番号）
        template: String,
    },

    /// 直前に削除したテンプレートを復元
    Undo,

    /// テンプレートをアイデアのナレーションプロンプトに適用
    Apply {
        /// テンプレート（名前または番号）
        template: String,

        /// アイデア（行番号またはID）
        ideas: Vec<String>,

        /// 選択中の履歴の全アイデア
        #[arg(long, conflicts_with = "ideas")]
        all: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TableFormat {
    #[default]
    Tsv,
    Xlsx,
}

impl std::str::FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(TableFormat::Tsv),
            "xlsx" | "excel" => Ok(TableFormat::Xlsx),
            _ => Err(format!("Unknown format: {}. Use tsv or xlsx", s)),
        }
    }
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableFormat::Tsv => write!(f, "tsv"),
            TableFormat::Xlsx => write!(f, "xlsx"),
        }
    }
}
