//! セッション状態
//!
//! 履歴・テンプレート・選択中の履歴を1つの値として保持し、
//! 更新は常に新しい値への置き換えで行う（部分的な書き換えはしない）。
//! 置き換えのたびに登録されたオブザーバへ通知する（自動保存など）。

use crate::error::{ContentIdeasError, Result};
use content_ideas_common::{
    merge_history_by, merge_templates, prompts, to_template, Error as CommonError, ExportDocument,
    HistoryEntry, Idea, ImagePrompt, ImportBundle, MergeKey, PromptTemplate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// セッションの状態（不変値として扱う）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// 新しい順
    pub history: Vec<HistoryEntry>,
    pub templates: Vec<PromptTemplate>,
    pub active_history_id: Option<String>,
    /// リセット（非表示）された履歴
    pub cleared_history_ids: BTreeSet<String>,
    /// 直前に削除したテンプレート（取り消し用）
    pub deleted_template: Option<DeletedTemplate>,
}

impl SessionState {
    /// 保存済みテンプレートがなければ組み込みテンプレートを使う
    pub fn with_default_templates(mut self) -> Self {
        if self.templates.is_empty() {
            self.templates = prompts::default_templates();
        }
        self
    }

    fn entry_index(&self, entry_id: &str) -> Option<usize> {
        self.history.iter().position(|h| h.id == entry_id)
    }
}

/// 削除直後のテンプレート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedTemplate {
    pub template: PromptTemplate,
    pub index: usize,
}

/// 状態変更の通知先
pub trait SessionObserver {
    /// 失敗時のメッセージはセッションの通知として残る
    fn on_change(&mut self, state: &SessionState) -> std::result::Result<(), String>;
}

pub struct Session {
    state: SessionState,
    notice: Option<String>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl Session {
    pub fn new(state: SessionState) -> Self {
        let mut state = state;
        if state.active_history_id.is_none() {
            state.active_history_id = state.history.first().map(|h| h.id.clone());
        }
        Self {
            state,
            notice: None,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// ユーザーに表示すべき直近のエラー/警告
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    /// 状態を新しい値に置き換えて通知
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&SessionState) -> SessionState,
    {
        let next = f(&self.state);
        if next == self.state {
            return;
        }
        self.state = next;

        for observer in self.observers.iter_mut() {
            if let Err(message) = observer.on_change(&self.state) {
                warn!(%message, "session observer failed");
                self.notice = Some(message);
            }
        }
    }

    // =============================================
    // 参照
    // =============================================

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    pub fn templates(&self) -> &[PromptTemplate] {
        &self.state.templates
    }

    pub fn active_entry(&self) -> Option<&HistoryEntry> {
        let id = self.state.active_history_id.as_deref()?;
        self.state.history.iter().find(|h| h.id == id)
    }

    pub fn require_active_entry(&self) -> Result<&HistoryEntry> {
        self.active_entry()
            .ok_or_else(|| ContentIdeasError::HistoryNotFound("選択中の履歴がありません".into()))
    }

    pub fn is_cleared(&self, entry_id: &str) -> bool {
        self.state.cleared_history_ids.contains(entry_id)
    }

    /// 選択中の履歴のアイデア（リセット済みなら空）
    pub fn current_ideas(&self) -> &[Idea] {
        match self.active_entry() {
            Some(entry) if !self.is_cleared(&entry.id) => &entry.ideas,
            _ => &[],
        }
    }

    pub fn find_entry(&self, entry_id: &str) -> Option<&HistoryEntry> {
        self.state.history.iter().find(|h| h.id == entry_id)
    }

    pub fn find_idea(&self, entry_id: &str, idea_id: &str) -> Option<&Idea> {
        self.find_entry(entry_id)?.find_idea(idea_id)
    }

    /// 履歴を指定（ID、一覧の番号(1始まり)、一意なID接頭辞）
    pub fn resolve_entry(&self, selector: &str) -> Result<&HistoryEntry> {
        let history = &self.state.history;
        resolve(history, selector, |h| h.id.as_str())
            .ok_or_else(|| ContentIdeasError::HistoryNotFound(selector.to_string()))
    }

    /// 選択中の履歴のアイデアを指定（ID、行番号(1始まり)、一意なID接頭辞）
    pub fn resolve_idea(&self, selector: &str) -> Result<&Idea> {
        resolve(self.current_ideas(), selector, |i| i.id.as_str())
            .ok_or_else(|| ContentIdeasError::IdeaNotFound(selector.to_string()))
    }

    /// テンプレートを指定（名前、番号(1始まり)）
    pub fn resolve_template(&self, selector: &str) -> Result<(usize, &PromptTemplate)> {
        let templates = &self.state.templates;
        if let Some(index) = templates.iter().position(|t| t.name == selector) {
            return Ok((index, &templates[index]));
        }
        selector
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1 && *n <= templates.len())
            .map(|n| (n - 1, &templates[n - 1]))
            .ok_or_else(|| ContentIdeasError::TemplateNotFound(selector.to_string()))
    }

    pub fn recently_deleted_template(&self) -> Option<&DeletedTemplate> {
        self.state.deleted_template.as_ref()
    }

    // =============================================
    // 履歴の更新
    // =============================================

    /// 新しい履歴を先頭に追加して選択
    pub fn add_entry(&mut self, entry: HistoryEntry) {
        self.update(|s| {
            let mut next = s.clone();
            next.active_history_id = Some(entry.id.clone());
            next.history.insert(0, entry);
            next
        });
    }

    /// 履歴にアイデアを追加
    pub fn append_ideas(&mut self, entry_id: &str, ideas: Vec<Idea>) -> Result<()> {
        let index = self
            .state
            .entry_index(entry_id)
            .ok_or_else(|| ContentIdeasError::HistoryNotFound(entry_id.to_string()))?;
        self.update(|s| {
            let mut next = s.clone();
            next.history[index].ideas.extend(ideas);
            next
        });
        Ok(())
    }

    /// アイデアを新しい値に置き換え
    pub fn update_idea<F>(&mut self, entry_id: &str, idea_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&Idea) -> Idea,
    {
        let entry_index = self
            .state
            .entry_index(entry_id)
            .ok_or_else(|| ContentIdeasError::HistoryNotFound(entry_id.to_string()))?;
        let idea_index = self.state.history[entry_index]
            .ideas
            .iter()
            .position(|i| i.id == idea_id)
            .ok_or_else(|| ContentIdeasError::IdeaNotFound(idea_id.to_string()))?;

        self.update(|s| {
            let mut next = s.clone();
            let idea = f(&s.history[entry_index].ideas[idea_index]);
            next.history[entry_index].ideas[idea_index] = idea;
            next
        });
        Ok(())
    }

    /// 画像プロンプトを新しい値に置き換え
    pub fn update_image_prompt<F>(&mut self, entry_id: &str, idea_id: &str, index: usize, f: F) -> Result<()>
    where
        F: FnOnce(&ImagePrompt) -> ImagePrompt,
    {
        let exists = self
            .find_idea(entry_id, idea_id)
            .map(|idea| index < idea.prompts().len())
            .unwrap_or(false);
        if !exists {
            return Err(ContentIdeasError::PromptNotFound(format!("{} #{}", idea_id, index + 1)));
        }

        self.update_idea(entry_id, idea_id, |idea| {
            let mut next = idea.clone();
            if let Some(prompts) = next.image_prompts.as_mut() {
                prompts[index] = f(&prompts[index]);
            }
            next
        })
    }

    /// 履歴を選択（リセット状態も解除）
    pub fn set_active(&mut self, entry_id: &str) -> Result<()> {
        if self.find_entry(entry_id).is_none() {
            return Err(ContentIdeasError::HistoryNotFound(entry_id.to_string()));
        }
        self.update(|s| {
            let mut next = s.clone();
            next.active_history_id = Some(entry_id.to_string());
            next.cleared_history_ids.remove(entry_id);
            next
        });
        Ok(())
    }

    /// 履歴を削除（選択中なら先頭を選択）
    pub fn delete_entry(&mut self, entry_id: &str) -> Result<()> {
        if self.find_entry(entry_id).is_none() {
            return Err(ContentIdeasError::HistoryNotFound(entry_id.to_string()));
        }
        self.update(|s| {
            let mut next = s.clone();
            next.history.retain(|h| h.id != entry_id);
            next.cleared_history_ids.remove(entry_id);
            if next.active_history_id.as_deref() == Some(entry_id) {
                next.active_history_id = next.history.first().map(|h| h.id.clone());
            }
            next
        });
        Ok(())
    }

    /// 選択中の履歴の表示をリセット（データは残す）
    pub fn reset_active(&mut self) {
        self.update(|s| {
            let mut next = s.clone();
            if let Some(id) = &s.active_history_id {
                next.cleared_history_ids.insert(id.clone());
            }
            next
        });
    }

    // =============================================
    // テンプレートの更新
    // =============================================

    /// テンプレートを追加
    ///
    /// 同名があればエラー、同じ本文が既にあれば追加せず `false` を返す
    pub fn add_template(&mut self, name: &str, body: &str) -> Result<bool> {
        let name = name.trim();
        let body = body.trim();
        if name.is_empty() || body.is_empty() {
            return Err(ContentIdeasError::Config("テンプレート名と本文は必須です".into()));
        }
        if self.state.templates.iter().any(|t| t.name == name) {
            return Err(CommonError::DuplicateTemplate(name.to_string()).into());
        }
        if self.state.templates.iter().any(|t| t.template == body) {
            debug!(%name, "identical template body already saved");
            return Ok(false);
        }

        let template = PromptTemplate::new(name, body);
        self.update(|s| {
            let mut next = s.clone();
            next.templates.push(template);
            next
        });
        Ok(true)
    }

    /// アイデアのナレーションプロンプトをテンプレートとして保存
    ///
    /// プロンプト中の列の値は `{{列名}}` に戻される
    pub fn save_template_from_idea(&mut self, entry_id: &str, idea_id: &str, name: &str) -> Result<bool> {
        let entry = self
            .find_entry(entry_id)
            .ok_or_else(|| ContentIdeasError::HistoryNotFound(entry_id.to_string()))?;
        let idea = entry
            .find_idea(idea_id)
            .ok_or_else(|| ContentIdeasError::IdeaNotFound(idea_id.to_string()))?;

        let body = to_template(&idea.narration_prompt, idea, &entry.table_columns());
        self.add_template(name, &body)
    }

    /// テンプレートを編集
    pub fn edit_template(&mut self, index: usize, name: &str, body: &str) -> Result<()> {
        let name = name.trim();
        let body = body.trim();
        if index >= self.state.templates.len() {
            return Err(ContentIdeasError::TemplateNotFound(format!("#{}", index + 1)));
        }
        if name.is_empty() || body.is_empty() {
            return Err(ContentIdeasError::Config("テンプレート名と本文は必須です".into()));
        }
        let duplicate = self
            .state
            .templates
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.name == name);
        if duplicate {
            return Err(CommonError::DuplicateTemplate(name.to_string()).into());
        }

        let template = PromptTemplate::new(name, body);
        self.update(|s| {
            let mut next = s.clone();
            next.templates[index] = template;
            next
        });
        Ok(())
    }

    /// テンプレートを削除（直前の1件は取り消し可能）
    pub fn delete_template(&mut self, index: usize) -> Result<PromptTemplate> {
        let template = self
            .state
            .templates
            .get(index)
            .cloned()
            .ok_or_else(|| ContentIdeasError::TemplateNotFound(format!("#{}", index + 1)))?;

        let deleted = DeletedTemplate {
            template: template.clone(),
            index,
        };
        self.update(|s| {
            let mut next = s.clone();
            next.templates.remove(index);
            next.deleted_template = Some(deleted);
            next
        });
        Ok(template)
    }

    /// 直前の削除を取り消し（元の位置に戻す）
    ///
    /// 同名のテンプレートが既にあれば復元しない
    pub fn undo_delete_template(&mut self) -> Option<PromptTemplate> {
        let deleted = self.state.deleted_template.clone()?;
        let restorable = !self.state.templates.iter().any(|t| t.name == deleted.template.name);
        self.update(|s| {
            let mut next = s.clone();
            next.deleted_template = None;
            if restorable {
                let index = deleted.index.min(next.templates.len());
                next.templates.insert(index, deleted.template.clone());
            }
            next
        });
        restorable.then_some(deleted.template)
    }

    // =============================================
    // インポート/エクスポート
    // =============================================

    /// インポート内容をマージ
    ///
    /// 選択中の履歴が残っていれば維持し、なければ最新を選択する
    pub fn import(&mut self, bundle: ImportBundle, key: MergeKey) {
        self.update(|s| {
            let mut next = s.clone();
            next.history = merge_history_by(&s.history, &bundle.history, key);
            if !bundle.templates.is_empty() {
                next.templates = merge_templates(&s.templates, &bundle.templates);
            }

            let active_exists = s
                .active_history_id
                .as_deref()
                .map(|id| next.history.iter().any(|h| h.id == id))
                .unwrap_or(false);
            if !active_exists {
                next.active_history_id = next.history.first().map(|h| h.id.clone());
            }
            next
        });
    }

    pub fn export_document(&self) -> ExportDocument {
        ExportDocument::new(self.state.history.clone(), self.state.templates.clone())
    }
}

/// ID完全一致 → 番号(1始まり) → 一意な接頭辞 の順で解決
fn resolve<'a, T, F>(items: &'a [T], selector: &str, id_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    if let Some(item) = items.iter().find(|item| id_of(item) == selector) {
        return Some(item);
    }
    if let Ok(n) = selector.parse::<usize>() {
        if n >= 1 && n <= items.len() {
            return Some(&items[n - 1]);
        }
    }
    let mut matches = items.iter().filter(|item| id_of(item).starts_with(selector));
    match (matches.next(), matches.next()) {
        (Some(item), None) if !selector.is_empty() => Some(item),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn idea(id: &str, hewan: &str) -> Idea {
        let mut fields = BTreeMap::new();
        fields.insert("Idea".to_string(), json!(format!("Fakta {}", hewan)));
        fields.insert("Hewan".to_string(), json!(hewan));
        Idea::new(id, fields, "Topic : membahas {{Hewan}}")
    }

    fn entry(id: &str, topic: &str, ts: i64) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            timestamp: ts,
            topic: topic.to_string(),
            custom_columns: vec!["Hewan".to_string()],
            ideas: vec![idea(&format!("{}-a", id), "Gurita"), idea(&format!("{}-b", id), "Hiu")],
        }
    }

    fn session() -> Session {
        Session::new(SessionState {
            history: vec![entry("h2", "B", 200), entry("h1", "A", 100)],
            templates: vec![PromptTemplate::new("X", "foo {{Hewan}}")],
            ..Default::default()
        })
    }

    struct Counter(Rc<RefCell<usize>>);

    impl SessionObserver for Counter {
        fn on_change(&mut self, _state: &SessionState) -> std::result::Result<(), String> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
    }

    struct Failing;

    impl SessionObserver for Failing {
        fn on_change(&mut self, _state: &SessionState) -> std::result::Result<(), String> {
            Err("penyimpanan penuh".into())
        }
    }

    #[test]
    fn test_new_selects_first_entry() {
        let s = session();
        assert_eq!(s.active_entry().unwrap().id, "h2");
        assert_eq!(s.current_ideas().len(), 2);
    }

    #[test]
    fn test_observer_notified_on_change_only() {
        let count = Rc::new(RefCell::new(0));
        let mut s = session();
        s.subscribe(Box::new(Counter(count.clone())));

        s.set_active("h1").unwrap();
        assert_eq!(*count.borrow(), 1);

        // 変化なし
        s.set_active("h1").unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_observer_failure_becomes_notice() {
        let mut s = session();
        s.subscribe(Box::new(Failing));
        s.reset_active();

        assert_eq!(s.notice(), Some("penyimpanan penuh"));
        assert_eq!(s.take_notice().as_deref(), Some("penyimpanan penuh"));
        assert!(s.notice().is_none());
    }

    #[test]
    fn test_add_entry_goes_first_and_active() {
        let mut s = session();
        s.add_entry(entry("h3", "C", 300));

        assert_eq!(s.history()[0].id, "h3");
        assert_eq!(s.active_entry().unwrap().id, "h3");
    }

    #[test]
    fn test_update_idea_replaces_value() {
        let mut s = session();
        let before = s.state().clone();

        s.update_idea("h1", "h1-a", |i| Idea {
            notes: Some("catatan".into()),
            ..i.clone()
        })
        .unwrap();

        assert_eq!(s.find_idea("h1", "h1-a").unwrap().notes.as_deref(), Some("catatan"));
        // 以前の値は変わらない
        assert!(before.history[1].ideas[0].notes.is_none());
    }

    #[test]
    fn test_update_idea_unknown() {
        let mut s = session();
        assert!(matches!(
            s.update_idea("h1", "nope", |i| i.clone()).unwrap_err(),
            ContentIdeasError::IdeaNotFound(_)
        ));
        assert!(matches!(
            s.update_idea("nope", "h1-a", |i| i.clone()).unwrap_err(),
            ContentIdeasError::HistoryNotFound(_)
        ));
    }

    #[test]
    fn test_update_image_prompt_out_of_range() {
        let mut s = session();
        let err = s
            .update_image_prompt("h2", "h2-a", 0, |p| p.clone())
            .unwrap_err();
        assert!(matches!(err, ContentIdeasError::PromptNotFound(_)));
    }

    #[test]
    fn test_reset_hides_ideas_until_reselected() {
        let mut s = session();
        s.reset_active();
        assert!(s.current_ideas().is_empty());
        assert_eq!(s.active_entry().unwrap().ideas.len(), 2);

        s.set_active("h1").unwrap();
        s.set_active("h2").unwrap();
        assert_eq!(s.current_ideas().len(), 2);
    }

    #[test]
    fn test_delete_active_entry_selects_first() {
        let mut s = session();
        s.delete_entry("h2").unwrap();
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.active_entry().unwrap().id, "h1");

        s.delete_entry("h1").unwrap();
        assert!(s.active_entry().is_none());
        assert!(s.current_ideas().is_empty());
    }

    #[test]
    fn test_resolve_entry_and_idea() {
        let s = session();
        assert_eq!(s.resolve_entry("h1").unwrap().id, "h1");
        assert_eq!(s.resolve_entry("1").unwrap().id, "h2");
        assert!(s.resolve_entry("h").is_err());
        assert!(s.resolve_entry("9").is_err());

        assert_eq!(s.resolve_idea("2").unwrap().id, "h2-b");
        assert_eq!(s.resolve_idea("h2-a").unwrap().id, "h2-a");
        assert!(s.resolve_idea("").is_err());
    }

    #[test]
    fn test_add_template_rules() {
        let mut s = session();

        assert!(s.add_template("Y", "  bar  ").unwrap());
        assert_eq!(s.templates()[1], PromptTemplate::new("Y", "bar"));

        // 同じ本文は追加しない
        assert!(!s.add_template("Z", "bar").unwrap());
        assert_eq!(s.templates().len(), 2);

        // 同名は不可
        let err = s.add_template("X", "baz").unwrap_err();
        assert!(matches!(err, ContentIdeasError::Common(CommonError::DuplicateTemplate(_))));

        assert!(s.add_template(" ", "baz").is_err());
    }

    #[test]
    fn test_save_template_from_idea() {
        let mut s = session();
        s.update_idea("h2", "h2-a", |i| Idea {
            narration_prompt: "Narasi tentang Gurita: Fakta Gurita".into(),
            ..i.clone()
        })
        .unwrap();

        assert!(s.save_template_from_idea("h2", "h2-a", "Baru").unwrap());
        let (_, template) = s.resolve_template("Baru").unwrap();
        assert_eq!(template.template, "Narasi tentang {{Hewan}}: {{Idea}}");
    }

    #[test]
    fn test_edit_template() {
        let mut s = session();
        s.add_template("Y", "bar").unwrap();

        s.edit_template(1, "Y2", "bar2").unwrap();
        assert_eq!(s.templates()[1], PromptTemplate::new("Y2", "bar2"));

        assert!(s.edit_template(1, "X", "bar3").is_err());
        assert!(s.edit_template(5, "Q", "q").is_err());
    }

    #[test]
    fn test_delete_and_undo_template() {
        let mut s = session();
        s.add_template("Y", "bar").unwrap();

        let deleted = s.delete_template(0).unwrap();
        assert_eq!(deleted.name, "X");
        assert_eq!(s.templates().len(), 1);

        let restored = s.undo_delete_template().unwrap();
        assert_eq!(restored.name, "X");
        assert_eq!(s.templates()[0].name, "X");
        assert!(s.undo_delete_template().is_none());
    }

    #[test]
    fn test_resolve_template_by_number() {
        let s = session();
        let (index, template) = s.resolve_template("1").unwrap();
        assert_eq!(index, 0);
        assert_eq!(template.name, "X");
        assert!(s.resolve_template("2").is_err());
    }

    #[test]
    fn test_import_merges_and_keeps_active() {
        let mut s = session();
        s.set_active("h1").unwrap();

        s.import(
            ImportBundle {
                history: vec![entry("h9", "A", 150), entry("h8", "C", 50)],
                templates: vec![PromptTemplate::new("X", "other"), PromptTemplate::new("W", "w")],
            },
            MergeKey::Topic,
        );

        let ids: Vec<&str> = s.history().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["h2", "h9", "h8"]);
        // h1 は h9 に置き換えられたので先頭を選択
        assert_eq!(s.active_entry().unwrap().id, "h2");
        assert_eq!(s.templates()[0].template, "foo {{Hewan}}");
        assert_eq!(s.templates()[1].name, "W");
    }

    #[test]
    fn test_import_without_templates_keeps_templates() {
        let mut s = session();
        s.import(ImportBundle::default(), MergeKey::Topic);
        assert_eq!(s.templates().len(), 1);
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn test_with_default_templates() {
        let state = SessionState::default().with_default_templates();
        assert_eq!(state.templates.len(), 2);
    }
}
