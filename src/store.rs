//! 保存ファイルモジュール
//!
//! 履歴・テンプレート・選択状態をデータディレクトリのJSONに保存する。
//! 画像データは保存しない。処理中フラグは読み込み時に落とす。
//! 読めないファイルは `<名前>.corrupt-<日時>` に退避してから空の状態で始める。

use crate::config::Config;
use crate::error::{ContentIdeasError, Result};
use crate::session::{DeletedTemplate, Session, SessionObserver, SessionState};
use content_ideas_common::{strip_image_data, HistoryEntry, PromptTemplate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const HISTORY_FILE_NAME: &str = "history.json";
pub const TEMPLATES_FILE_NAME: &str = "templates.json";
pub const UI_FILE_NAME: &str = "ui.json";

/// 選択状態
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiFile {
    #[serde(default)]
    active_history_id: Option<String>,
    #[serde(default)]
    cleared_history_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_template: Option<DeletedTemplate>,
}

#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
    max_bytes: usize,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.data_dir()?, config.max_store_bytes))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 保存済みの状態を読み込み、自動保存を登録したセッションを開く
    ///
    /// 退避したファイルがあればセッションの通知に残す
    pub fn open_session(&self) -> Session {
        let (state, warnings) = self.load_with_warnings();
        let mut session = Session::new(state);
        session.subscribe(Box::new(self.autosave()));
        if !warnings.is_empty() {
            session.set_notice(warnings.join("\n"));
        }
        session
    }

    /// 保存済みの状態を読み込み
    pub fn load(&self) -> SessionState {
        self.load_with_warnings().0
    }

    /// 保存済みの状態と読み込み時の警告
    ///
    /// ファイルがない場合は空の状態から始める。
    /// 壊れている場合は退避してから空の状態で始め、警告を返す。
    pub fn load_with_warnings(&self) -> (SessionState, Vec<String>) {
        let mut warnings = Vec::new();
        let history: Vec<HistoryEntry> = self.read_json(HISTORY_FILE_NAME, &mut warnings).unwrap_or_default();
        let templates: Vec<PromptTemplate> = self.read_json(TEMPLATES_FILE_NAME, &mut warnings).unwrap_or_default();
        let ui: UiFile = self.read_json(UI_FILE_NAME, &mut warnings).unwrap_or_default();

        let history: Vec<HistoryEntry> = history.iter().map(HistoryEntry::without_transient_flags).collect();
        let active_history_id = ui
            .active_history_id
            .filter(|id| history.iter().any(|h| &h.id == id));

        debug!(
            dir = %self.dir.display(),
            history = history.len(),
            templates = templates.len(),
            "loaded store"
        );

        let state = SessionState {
            history,
            templates,
            active_history_id,
            cleared_history_ids: ui.cleared_history_ids.into_iter().collect(),
            deleted_template: ui.deleted_template,
        }
        .with_default_templates();
        (state, warnings)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str, warnings: &mut Vec<String>) -> Option<T> {
        let path = self.dir.join(name);
        let result = File::open(&path)
            .map_err(|e| e.to_string())
            .and_then(|file| serde_json::from_reader(BufReader::new(file)).map_err(|e| e.to_string()));

        match result {
            Ok(value) => Some(value),
            Err(_) if !path.exists() => None,
            Err(error) => {
                warn!(path = %path.display(), %error, "unreadable store file");
                let message = match quarantine(&path) {
                    Ok(moved) => format!(
                        "{} を読み込めませんでした。元のファイルは {} に退避しました",
                        name,
                        moved.display()
                    ),
                    Err(e) => format!("{} を読み込めず、退避にも失敗しました: {}", name, e),
                };
                warnings.push(message);
                None
            }
        }
    }

    /// 状態を保存
    ///
    /// 履歴が上限サイズを超える場合は履歴ファイルを更新せずにエラーを返す
    pub fn save(&self, state: &SessionState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        write_json(&self.dir.join(TEMPLATES_FILE_NAME), &serde_json::to_string_pretty(&state.templates)?)?;

        let ui = UiFile {
            active_history_id: state.active_history_id.clone(),
            cleared_history_ids: state.cleared_history_ids.iter().cloned().collect(),
            deleted_template: state.deleted_template.clone(),
        };
        write_json(&self.dir.join(UI_FILE_NAME), &serde_json::to_string_pretty(&ui)?)?;

        let history = serde_json::to_string(&strip_image_data(&state.history))?;
        if history.len() > self.max_bytes {
            return Err(ContentIdeasError::StorageQuota {
                size: history.len(),
                limit: self.max_bytes,
            });
        }
        write_json(&self.dir.join(HISTORY_FILE_NAME), &history)
    }

    /// 状態変更のたびに保存するオブザーバ
    pub fn autosave(&self) -> AutoSave {
        AutoSave { store: self.clone() }
    }
}

pub struct AutoSave {
    store: Store,
}

impl SessionObserver for AutoSave {
    fn on_change(&mut self, state: &SessionState) -> std::result::Result<(), String> {
        self.store.save(state).map_err(|e| e.to_string())
    }
}

/// 読めないファイルを `<名前>.corrupt-<日時>` に移す
///
/// 同名があれば連番を付ける。移動できなければコピーを残す。
fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = path.with_file_name(format!("{}.corrupt-{}", file_name, stamp));

    let mut target = base.clone();
    let mut n = 2;
    while target.exists() {
        target = PathBuf::from(format!("{}-{}", base.display(), n));
        n += 1;
    }

    if fs::rename(path, &target).is_err() {
        fs::copy(path, &target)?;
    }
    Ok(target)
}

/// 一時ファイルに書いてから置き換える
fn write_json(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
