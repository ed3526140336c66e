use clap::Parser;
use content_ideas::{cli, config, error, export, gemini, images, models, session, store, workflow};
use cli::{Cli, Commands, HistoryAction, TableFormat, TemplateAction};
use config::{Config, ViewMode};
use content_ideas_common::{insert_variable, placeholders, prompts, render, table, HistoryEntry, Idea};
use dialoguer::{Confirm, Password};
use error::{ContentIdeasError, Result};
use gemini::{ContentGenerator, GeminiClient};
use indicatif::{ProgressBar, ProgressStyle};
use session::Session;
use std::path::{Path, PathBuf};
use std::time::Duration;
use store::Store;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.override_data_dir(dir);
    }
    let yes = cli.yes;

    match cli.command {
        Commands::Generate { topic, columns, count } => {
            let generator = GeminiClient::from_config(&config)?;
            let mut session = open_session(&config)?;

            let topic = topic.unwrap_or_else(|| prompts::DEFAULT_TOPIC.to_string());
            let columns = if columns.is_empty() {
                prompts::DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
            } else {
                columns
            };
            let count = count.unwrap_or(config.initial_idea_count);

            let pb = spinner(format!("アイデアを{}件生成中...", count));
            let entry_id = workflow::generate_ideas(&mut session, &generator, &topic, &columns, count).await?;
            pb.finish_and_clear();

            print_notice(&mut session);
            if let Some(entry) = session.find_entry(&entry_id) {
                println!("✔ {}件のアイデアを生成\n", entry.ideas.len());
                print_ideas(entry, &entry.ideas, config.view_mode);
            }
        }

        Commands::More { count } => {
            let generator = GeminiClient::from_config(&config)?;
            let mut session = open_session(&config)?;
            let count = count.unwrap_or(config.more_idea_count);

            let pb = spinner(format!("アイデアを{}件追加生成中...", count));
            let added = workflow::generate_more(&mut session, &generator, count).await?;
            pb.finish_and_clear();

            print_notice(&mut session);
            println!("✔ {}件のアイデアを追加\n", added);
            if let Some(entry) = session.active_entry() {
                print_ideas(entry, session.current_ideas(), config.view_mode);
            }
        }

        Commands::History { action } => {
            let mut session = open_session(&config)?;
            run_history(&mut session, action, config.view_mode, yes)?;
            print_notice(&mut session);
        }

        Commands::Show { idea } => {
            let mut session = open_session(&config)?;
            let entry = session.require_active_entry()?;
            let idea = session.resolve_idea(&idea)?;
            print_idea_detail(entry, idea);
            print_notice(&mut session);
        }

        Commands::Narrate { ideas, all } => {
            let generator = GeminiClient::from_config(&config)?;
            let mut session = open_session(&config)?;
            let entry_id = session.require_active_entry()?.id.clone();

            let idea_ids = if all {
                session.current_ideas().iter().map(|i| i.id.clone()).collect()
            } else {
                resolve_idea_ids(&session, &ideas)?
            };
            if idea_ids.is_empty() {
                return Err(ContentIdeasError::IdeaNotFound("対象のアイデアを指定してください".into()));
            }

            let pb = spinner(format!("ナレーションを{}件生成中...", idea_ids.len()));
            let summary = if let [idea_id] = idea_ids.as_slice() {
                let ok = workflow::generate_narration(&mut session, &generator, &entry_id, idea_id).await?;
                workflow::BulkSummary {
                    succeeded: ok as usize,
                    failed: (!ok) as usize,
                }
            } else {
                workflow::generate_narrations(&mut session, &generator, &entry_id, &idea_ids).await?
            };
            pb.finish_and_clear();

            print_notice(&mut session);
            println!("✔ ナレーション生成: 成功 {} / 失敗 {}", summary.succeeded, summary.failed);

            if let [idea_id] = idea_ids.as_slice() {
                if let (Some(entry), Some(idea)) = (session.find_entry(&entry_id), session.find_idea(&entry_id, idea_id)) {
                    println!();
                    print_idea_detail(entry, idea);
                }
            }
        }

        Commands::Prompt { idea, set, insert, at } => {
            let mut session = open_session(&config)?;
            let entry = session.require_active_entry()?;
            let entry_id = entry.id.clone();
            let columns = entry.table_columns();
            let idea = session.resolve_idea(&idea)?.clone();

            let updated = match (set, insert) {
                (Some(text), _) => Some(text),
                (None, Some(column)) => {
                    if !columns.contains(&column) {
                        println!("⚠ 列「{}」はこの履歴にありません", column);
                    }
                    let at = at.unwrap_or_else(|| idea.narration_prompt.chars().count());
                    Some(insert_variable(&idea.narration_prompt, at, &column))
                }
                (None, None) => None,
            };

            let prompt = match updated {
                Some(prompt) => {
                    workflow::set_narration_prompt(&mut session, &entry_id, &idea.id, &prompt)?;
                    println!("✔ ナレーションプロンプトを更新\n");
                    prompt
                }
                None => idea.narration_prompt.clone(),
            };

            println!("{}\n", prompt);
            let names = placeholders(&prompt);
            if !names.is_empty() {
                println!("変数: {}", names.join(", "));
            }
            println!("利用可能な列: {}", columns.join(", "));
            print_notice(&mut session);
        }

        Commands::VideoPrompt { idea, prompt } => {
            let generator = GeminiClient::from_config(&config)?;
            let mut session = open_session(&config)?;
            let entry_id = session.require_active_entry()?.id.clone();
            let idea_id = session.resolve_idea(&idea)?.id.clone();
            let index = prompt_index(prompt)?;

            let pb = spinner("動画プロンプトを生成中...");
            let ok = workflow::generate_video_prompt(&mut session, &generator, &entry_id, &idea_id, index).await?;
            pb.finish_and_clear();

            print_notice(&mut session);
            if ok {
                let video_prompt = session
                    .find_idea(&entry_id, &idea_id)
                    .and_then(|i| i.prompts().get(index))
                    .and_then(|p| p.video_prompt.clone())
                    .unwrap_or_default();
                println!("🎥 {}", video_prompt);
            }
        }

        Commands::Images { idea, prompt, output } => {
            let generator = GeminiClient::from_config(&config)?;
            let mut session = open_session(&config)?;
            let entry_id = session.require_active_entry()?.id.clone();
            let idea_id = session.resolve_idea(&idea)?.id.clone();

            let pb = spinner("画像を生成中...");
            let summary = match prompt {
                Some(n) => {
                    let ok = workflow::generate_image(&mut session, &generator, &entry_id, &idea_id, prompt_index(n)?).await?;
                    workflow::BulkSummary {
                        succeeded: ok as usize,
                        failed: (!ok) as usize,
                    }
                }
                None => workflow::generate_all_images(&mut session, &generator, &entry_id, &idea_id).await?,
            };
            pb.finish_and_clear();

            print_notice(&mut session);
            println!("✔ 画像生成: 成功 {} / 失敗 {}", summary.succeeded, summary.failed);

            if let Some(idea) = session.find_idea(&entry_id, &idea_id) {
                save_images(idea, &output)?;
            }
        }

        Commands::Mark { idea, prompt, off } => {
            let mut session = open_session(&config)?;
            let entry_id = session.require_active_entry()?.id.clone();
            let idea_id = session.resolve_idea(&idea)?.id.clone();

            workflow::mark_generated(&mut session, &entry_id, &idea_id, prompt_index(prompt)?, !off)?;
            print_notice(&mut session);
            println!("✔ 画像プロンプト #{} を{}", prompt, if off { "未生成に戻しました" } else { "生成済みにしました" });
        }

        Commands::Notes { idea, text, clear } => {
            let mut session = open_session(&config)?;
            let entry_id = session.require_active_entry()?.id.clone();
            let idea = session.resolve_idea(&idea)?.clone();

            match (text, clear) {
                (Some(text), _) => {
                    workflow::set_notes(&mut session, &entry_id, &idea.id, &text)?;
                    println!("✔ メモを保存");
                }
                (None, true) => {
                    workflow::set_notes(&mut session, &entry_id, &idea.id, "")?;
                    println!("✔ メモを削除");
                }
                (None, false) => match &idea.notes {
                    Some(notes) => println!("{}", notes),
                    None => println!("(メモなし)"),
                },
            }
            print_notice(&mut session);
        }

        Commands::Template { action } => {
            let mut session = open_session(&config)?;
            run_template(&mut session, action, yes)?;
            print_notice(&mut session);
        }

        Commands::Table { format, output } => {
            let session = open_session(&config)?;
            let entry = session.require_active_entry()?;

            match (format, output) {
                (TableFormat::Tsv, None) => print!("{}", table::to_tsv(entry)),
                (format, output) => {
                    let output = output.unwrap_or_else(|| PathBuf::from("."));
                    export::export_table(entry, format, &output)?;
                }
            }
        }

        Commands::Export { output } => {
            let session = open_session(&config)?;
            let path = export::backup::write_backup(&session, &output)?;
            println!(
                "✔ {}件の履歴と{}件のテンプレートを書き出し: {}",
                session.history().len(),
                session.templates().len(),
                path.display()
            );
        }

        Commands::Import { input, merge_by } => {
            // 検証に失敗した場合は状態を変更しない
            let bundle = export::backup::read_import(&input)?;
            let mut session = open_session(&config)?;

            let prompt = format!(
                "{}件の履歴と{}件のテンプレートをマージしますか？",
                bundle.history.len(),
                bundle.templates.len()
            );
            if !confirm(&prompt, yes)? {
                println!("中止しました");
                return Ok(());
            }

            let before = session.history().len();
            session.import(bundle, merge_by);
            print_notice(&mut session);
            println!(
                "✔ インポート完了: 履歴 {} → {}件、テンプレート {}件",
                before,
                session.history().len(),
                session.templates().len()
            );
        }

        Commands::Config {
            set_api_key,
            prompt_api_key,
            clear_api_key,
            no_validate,
            text_model,
            image_model,
            view_mode,
            theme,
            show,
        } => {
            let mut changed = false;

            let new_key = if prompt_api_key {
                let key = Password::new()
                    .with_prompt("Gemini APIキー")
                    .interact()
                    .map_err(|e| ContentIdeasError::Config(e.to_string()))?;
                Some(key)
            } else {
                set_api_key
            };

            if let Some(model) = text_model {
                config.set_text_model(&model)?;
                println!("✔ テキストモデル: {}", models::display_name(&config.text_model));
                changed = true;
            }
            if let Some(model) = image_model {
                config.set_image_model(&model)?;
                println!("✔ 画像モデル: {}", models::display_name(&config.image_model));
                changed = true;
            }
            if let Some(key) = new_key {
                let key = key.trim().to_string();
                if key.is_empty() {
                    return Err(ContentIdeasError::Config("APIキーが空です".into()));
                }
                if !no_validate {
                    let pb = spinner("APIキーを確認中...");
                    let result = GeminiClient::with_api_key(&config, key.clone())?.validate_api_key().await;
                    pb.finish_and_clear();
                    result?;
                }
                config.set_api_key(&key)?;
                println!("✔ APIキーを保存しました");
                changed = true;
            }
            if clear_api_key {
                config.clear_api_key()?;
                println!("✔ APIキーを削除しました");
                changed = true;
            }
            if let Some(mode) = view_mode {
                config.view_mode = mode;
                config.save()?;
                println!("✔ 表示形式: {}", mode);
                changed = true;
            }
            if let Some(theme) = theme {
                config.theme = theme;
                config.save()?;
                println!("✔ テーマ: {}", theme);
                changed = true;
            }

            if show || !changed {
                print_config(&config)?;
            }
        }

        Commands::Models => {
            println!("テキストモデル:");
            for model in models::TEXT_MODELS {
                print_model(model, &config.text_model, models::default_text_model());
            }
            println!("\n画像モデル:");
            for model in models::IMAGE_MODELS {
                print_model(model, &config.image_model, models::default_image_model());
            }
        }
    }

    Ok(())
}

fn run_history(session: &mut Session, action: HistoryAction, view_mode: ViewMode, yes: bool) -> Result<()> {
    match action {
        HistoryAction::List => {
            if session.history().is_empty() {
                println!("履歴はありません");
                return Ok(());
            }
            let active = session.active_entry().map(|h| h.id.clone());
            for (i, entry) in session.history().iter().enumerate() {
                let marker = if active.as_deref() == Some(entry.id.as_str()) { "*" } else { " " };
                println!(
                    "{} {:>2}. {}  {}（{}件）",
                    marker,
                    i + 1,
                    format_timestamp(entry.timestamp),
                    entry.topic,
                    entry.ideas.len()
                );
            }
        }
        HistoryAction::Show { history } => {
            let entry = match history {
                Some(selector) => session.resolve_entry(&selector)?,
                None => session.require_active_entry()?,
            };
            if session.is_cleared(&entry.id) {
                println!("(リセット済み。`history use` で再表示できます)\n");
            }
            print_ideas(entry, &entry.ideas, view_mode);
        }
        HistoryAction::Use { history } => {
            let id = session.resolve_entry(&history)?.id.clone();
            session.set_active(&id)?;
            if let Some(entry) = session.active_entry() {
                println!("✔ 選択: {}\n", entry.topic);
                print_ideas(entry, session.current_ideas(), view_mode);
            }
        }
        HistoryAction::Delete { history } => {
            let entry = session.resolve_entry(&history)?;
            let (id, topic) = (entry.id.clone(), entry.topic.clone());
            if !confirm(&format!("「{}」を削除しますか？", topic), yes)? {
                println!("中止しました");
                return Ok(());
            }
            session.delete_entry(&id)?;
            println!("✔ 削除しました");
        }
        HistoryAction::Reset => {
            session.require_active_entry()?;
            if !confirm("選択中の履歴の表示をリセットしますか？", yes)? {
                println!("中止しました");
                return Ok(());
            }
            session.reset_active();
            println!("✔ リセットしました");
        }
    }
    Ok(())
}

fn run_template(session: &mut Session, action: TemplateAction, yes: bool) -> Result<()> {
    match action {
        TemplateAction::List => {
            for (i, template) in session.templates().iter().enumerate() {
                let names = placeholders(&template.template);
                if names.is_empty() {
                    println!("{:>2}. {}", i + 1, template.name);
                } else {
                    println!("{:>2}. {}  [{}]", i + 1, template.name, names.join(", "));
                }
            }
        }
        TemplateAction::Show { template } => {
            let (_, template) = session.resolve_template(&template)?;
            println!("# {}\n\n{}", template.name, template.template);
        }
        TemplateAction::Add { name, body, file } => {
            let body = match (body, file) {
                (Some(body), _) => body,
                (None, Some(path)) => {
                    if !path.exists() {
                        return Err(ContentIdeasError::FileNotFound(path.display().to_string()));
                    }
                    std::fs::read_to_string(&path)?
                }
                (None, None) => return Err(ContentIdeasError::Config("本文を指定してください".into())),
            };
            if session.add_template(&name, &body)? {
                println!("✔ テンプレート「{}」を追加", name.trim());
            } else {
                println!("同じ内容のテンプレートが既にあります");
            }
        }
        TemplateAction::Save { idea, name } => {
            let entry_id = session.require_active_entry()?.id.clone();
            let idea_id = session.resolve_idea(&idea)?.id.clone();
            if session.save_template_from_idea(&entry_id, &idea_id, &name)? {
                println!("✔ テンプレート「{}」として保存", name.trim());
            } else {
                println!("同じ内容のテンプレートが既にあります");
            }
        }
        TemplateAction::Edit { template, name, body } => {
            let (index, current) = session.resolve_template(&template)?;
            let name = name.unwrap_or_else(|| current.name.clone());
            let body = body.unwrap_or_else(|| current.template.clone());
            session.edit_template(index, &name, &body)?;
            println!("✔ テンプレート「{}」を更新", name.trim());
        }
        TemplateAction::Delete { template } => {
            let (index, current) = session.resolve_template(&template)?;
            if !confirm(&format!("テンプレート「{}」を削除しますか？", current.name), yes)? {
                println!("中止しました");
                return Ok(());
            }
            let deleted = session.delete_template(index)?;
            println!("✔ 「{}」を削除しました（`template undo` で元に戻せます）", deleted.name);
        }
        TemplateAction::Undo => match session.undo_delete_template() {
            Some(template) => println!("✔ 「{}」を復元しました", template.name),
            None => println!("復元できるテンプレートはありません"),
        },
        TemplateAction::Apply { template, ideas, all } => {
            let body = session.resolve_template(&template)?.1.template.clone();
            let entry_id = session.require_active_entry()?.id.clone();
            let idea_ids = if all {
                session.current_ideas().iter().map(|i| i.id.clone()).collect()
            } else {
                resolve_idea_ids(session, &ideas)?
            };
            for idea_id in &idea_ids {
                workflow::set_narration_prompt(session, &entry_id, idea_id, &body)?;
            }
            println!("✔ {}件のアイデアに適用", idea_ids.len());
        }
    }
    Ok(())
}

/// 保存ファイルを読み込み、変更のたびに保存するセッションを作る
fn open_session(config: &Config) -> Result<Session> {
    Ok(Store::from_config(config)?.open_session())
}

fn resolve_idea_ids(session: &Session, selectors: &[String]) -> Result<Vec<String>> {
    let mut ids: Vec<String> = Vec::new();
    for selector in selectors {
        let id = session.resolve_idea(selector)?.id.clone();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// 1始まりの番号を添字に変換
fn prompt_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| ContentIdeasError::PromptNotFound("番号は1から指定してください".into()))
}

fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| ContentIdeasError::Config(e.to_string()))
}

fn spinner(message: impl Into<std::borrow::Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_notice(session: &mut Session) {
    if let Some(notice) = session.take_notice() {
        println!("⚠ {}", notice);
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}

fn print_ideas(entry: &HistoryEntry, ideas: &[Idea], view_mode: ViewMode) {
    println!("📋 {}\n", entry.topic);
    if ideas.is_empty() {
        println!("(アイデアはありません)");
        return;
    }

    let columns = entry.table_columns();
    if view_mode == ViewMode::Compact {
        let header: Vec<String> = table::column_letters(columns.len())
            .into_iter()
            .zip(&columns)
            .map(|(letter, column)| format!("{} {}", letter, column))
            .collect();
        println!("        {}", header.join(" | "));
    }

    for (row, idea) in ideas.iter().enumerate() {
        let badge = if idea.narration.is_some() { "🎙" } else { "  " };
        let text = table::cell_text(idea.field_text(content_ideas_common::IDEA_COLUMN).as_deref());
        match view_mode {
            ViewMode::Compact => {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|column| truncate(&table::cell_text(idea.field_text(column).as_deref()), 30))
                    .collect();
                println!("{:>3}. {} {}", row + 1, badge, cells.join(" | "));
            }
            ViewMode::Normal => {
                println!("{:>3}. {} {}", row + 1, badge, text);
                for column in columns.iter().skip(1) {
                    let value = table::cell_text(idea.field_text(column).as_deref());
                    println!("       {}: {}", column, value);
                }
                if let Some(notes) = &idea.notes {
                    println!("       📝 {}", table::cell_text(Some(notes.as_str())));
                }
            }
        }
    }
}

fn print_idea_detail(entry: &HistoryEntry, idea: &Idea) {
    println!("ID: {}", idea.id);
    for column in entry.table_columns() {
        println!("{}: {}", column, table::cell_text(idea.field_text(&column).as_deref()));
    }
    if let Some(notes) = &idea.notes {
        println!("メモ: {}", notes);
    }

    println!("\n--- ナレーションプロンプト（展開後） ---");
    println!("{}", truncate(&render(&idea.narration_prompt, idea), 400));

    match &idea.narration {
        Some(narration) => {
            println!(
                "\n--- ナレーション（{}語 / {}文字） ---",
                table::word_count(narration),
                table::char_count(narration)
            );
            println!("{}", narration);
        }
        None => println!("\n(ナレーション未生成)"),
    }

    if !idea.prompts().is_empty() {
        println!("\n--- 画像プロンプト ---");
        for (i, prompt) in idea.prompts().iter().enumerate() {
            let mark = if prompt.generated { "✔" } else { " " };
            println!("[{}] #{} {}  {}", mark, i + 1, prompt.timestamp, prompt.prompt);
            if let Some(video) = &prompt.video_prompt {
                println!("      🎥 {}", video);
            }
            if prompt.image_error {
                println!("      ⚠ 画像生成に失敗");
            }
        }
    }
}

fn save_images(idea: &Idea, output: &Path) -> Result<()> {
    for (i, prompt) in idea.prompts().iter().enumerate() {
        if let Some(url) = &prompt.image_url {
            let path = images::save_data_url(output, i + 1, &prompt.timestamp, url)?;
            println!("  🖼 {}", path.display());
        }
    }
    Ok(())
}

fn print_config(config: &Config) -> Result<()> {
    println!("設定ファイル: {}", Config::config_path()?.display());
    let key_status = match config.get_api_key() {
        Ok(key) if std::env::var(config::API_KEY_ENV).is_ok() => format!("{}（環境変数 {}）", mask(&key), config::API_KEY_ENV),
        Ok(key) => mask(&key),
        Err(_) => "未設定".to_string(),
    };
    println!("APIキー: {}", key_status);
    println!("テキストモデル: {}", models::display_name(&config.text_model));
    println!("画像モデル: {}", models::display_name(&config.image_model));
    println!("表示形式: {}", config.view_mode);
    println!("テーマ: {}", config.theme);
    println!("生成件数: 初回 {} / 追加 {}", config.initial_idea_count, config.more_idea_count);
    println!("データディレクトリ: {}", config.data_dir()?.display());
    Ok(())
}

fn mask(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", tail)
}

fn print_model(model: &models::ModelInfo, current: &str, default: &str) {
    let mut notes = Vec::new();
    if model.id == current {
        notes.push("使用中");
    }
    if model.id == default {
        notes.push("既定");
    }
    if model.disabled {
        notes.push("利用不可");
    }
    if notes.is_empty() {
        println!("  {}  {}", model.id, model.name);
    } else {
        println!("  {}  {}（{}）", model.id, model.name, notes.join("・"));
    }
}
