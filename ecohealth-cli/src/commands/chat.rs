use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use ecohealth_core::{
    validate_chat_message, ChatMessage, ChatQuery, FileRecorder, Recorder,
};
use serde_json::Value;
use std::path::PathBuf;

use super::{print_title, signed_in_portal};

#[derive(Subcommand)]
pub enum ChatCommand {
    #[command(about = "Ask the assistant a question")]
    Send {
        #[arg(help = "Your message")]
        message: String,

        #[arg(short, long, help = "Language you write in (defaults to config)")]
        source: Option<String>,

        #[arg(short, long, help = "Language to answer in (defaults to config)")]
        target: Option<String>,
    },

    #[command(about = "Send a recorded voice message")]
    Voice {
        #[arg(help = "Audio file to send")]
        path: PathBuf,

        #[arg(short, long, help = "Language to answer in (defaults to config)")]
        target: Option<String>,
    },

    #[command(about = "Show past conversations, by day or for one day")]
    History {
        #[arg(short, long, help = "Day to show (YYYY-MM-DD)")]
        date: Option<String>,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Show one conversation entry")]
    Show {
        #[arg(help = "Chat entry ID")]
        id: String,
    },

    #[command(about = "Delete one day of history, or all of it")]
    Delete {
        #[arg(short, long, help = "Day to delete (YYYY-MM-DD)")]
        date: Option<String>,

        #[arg(long, help = "Delete the entire history")]
        all: bool,
    },

    #[command(about = "Delete one conversation entry")]
    DeleteMessage {
        #[arg(help = "Chat entry ID")]
        id: String,
    },

    #[command(about = "Upload an audio file to check the voice pipeline")]
    TestAudio {
        #[arg(help = "Audio file to upload")]
        path: PathBuf,
    },
}

pub async fn handle_chat_command(action: Option<ChatCommand>) -> Result<()> {
    match action {
        Some(ChatCommand::Send {
            message,
            source,
            target,
        }) => cmd_chat_send(&message, source, target).await,
        Some(ChatCommand::Voice { path, target }) => cmd_chat_voice(path, target).await,
        Some(ChatCommand::History { date, format }) => match date {
            Some(date) => cmd_chat_day(&date, &format).await,
            None => cmd_chat_history(&format).await,
        },
        Some(ChatCommand::Show { id }) => cmd_chat_show(&id).await,
        Some(ChatCommand::Delete { date, all }) => cmd_chat_delete(date, all).await,
        Some(ChatCommand::DeleteMessage { id }) => cmd_chat_delete_message(&id).await,
        Some(ChatCommand::TestAudio { path }) => cmd_chat_test_audio(path).await,
        None => cmd_chat_history("text").await,
    }
}

async fn cmd_chat_send(message: &str, source: Option<String>, target: Option<String>) -> Result<()> {
    let text = validate_chat_message(message)?;
    let (config, portal, _user) = signed_in_portal().await?;
    let (default_source, default_target) = config.chat_languages();

    let query = ChatQuery::new(text).with_languages(
        source.unwrap_or_else(|| default_source.to_string()),
        target.unwrap_or_else(|| default_target.to_string()),
    );

    let answer = portal.chat().send_message(query).await?;

    println!("{} {}", "Assistant:".cyan().bold(), answer.answer);
    Ok(())
}

async fn cmd_chat_voice(path: PathBuf, target: Option<String>) -> Result<()> {
    let (config, portal, _user) = signed_in_portal().await?;
    let target = target.unwrap_or_else(|| config.chat_languages().1.to_string());

    let mut recorder = FileRecorder::new(path);
    recorder.start().await?;
    portal.chat().set_recording(true).await;
    let clip = recorder.stop().await;
    portal.chat().set_recording(false).await;
    let clip = clip?;

    println!(
        "  {} Sending {} ({} bytes)...",
        "→".blue(),
        clip.file_name,
        clip.len()
    );

    portal.chat().set_pending_audio(Some(clip)).await;
    let answer = portal.chat().send_pending_audio(&target).await?;

    println!("{} {}", "You said:".bold(), answer.original_text);
    if let Some(language) = &answer.detected_language {
        println!("  {} {}", "Detected language:".dimmed(), language);
    }
    if let Some(translated) = &answer.translated_text {
        println!("  {} {}", "Translation:".dimmed(), translated);
    }
    println!("{} {}", "Assistant:".cyan().bold(), answer.answer);

    Ok(())
}

/// History groups arrive keyed by day; anything that is not a list counts as
/// a single entry.
fn entry_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map
            .get("messages")
            .and_then(Value::as_array)
            .map_or(1, Vec::len),
        Value::Null => 0,
        _ => 1,
    }
}

async fn cmd_chat_history(format: &str) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;
    let history = portal.chat().fetch_history().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("{}", "No conversations yet.".yellow());
        return Ok(());
    }

    print_title("Chat History", 40);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(comfy_table::Color::Cyan),
            Cell::new("Messages").fg(comfy_table::Color::Cyan),
        ]);

    // Newest day first.
    for (date, entries) in history.iter().rev() {
        table.add_row(vec![Cell::new(date), Cell::new(entry_count(entries))]);
    }

    println!("{}", table);
    println!();
    println!(
        "Run {} to read a day.",
        "ecohealth chat history --date <YYYY-MM-DD>".cyan()
    );

    Ok(())
}

fn print_messages(messages: &[ChatMessage]) {
    for message in messages {
        println!(
            "{} {} {}",
            message.timestamp.format("%H:%M").to_string().dimmed(),
            format!("[{}]", message.kind).dimmed(),
            message.id.dimmed()
        );
        println!("  {} {}", "You:".bold(), message.text);
        println!("  {} {}", "Assistant:".cyan().bold(), message.response);
        println!();
    }
}

async fn cmd_chat_day(date: &str, format: &str) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;
    let messages = portal.chat().fetch_by_date(date).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!("No conversations on {}.", date.yellow());
        return Ok(());
    }

    print_title(&format!("Chat on {}", date), 60);
    print_messages(&messages);
    println!("  Total: {} messages", messages.len());

    Ok(())
}

async fn cmd_chat_show(id: &str) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;
    let message = portal.chat().fetch_by_id(id).await?;

    print_title("Chat Entry", 60);
    print_messages(std::slice::from_ref(&message));
    if let Some(language) = &message.detected_language {
        println!("  {} {}", "Detected language:".dimmed(), language);
    }

    Ok(())
}

async fn cmd_chat_delete(date: Option<String>, all: bool) -> Result<()> {
    if date.is_none() && !all {
        bail!("Pass --date <YYYY-MM-DD> to delete one day, or --all to delete everything");
    }

    let (_config, portal, _user) = signed_in_portal().await?;
    portal.chat().delete_history(date.as_deref()).await?;

    let what = match &date {
        Some(date) => format!("Deleted chat history for {}", date),
        None => "Deleted all chat history".to_string(),
    };
    println!("{} {}", "✓".green().bold(), what.green());

    Ok(())
}

async fn cmd_chat_delete_message(id: &str) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;
    portal.chat().delete_by_id(id).await?;

    println!(
        "{} {}",
        "✓".green().bold(),
        format!("Deleted chat entry {}", id).green()
    );
    Ok(())
}

async fn cmd_chat_test_audio(path: PathBuf) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;

    let mut recorder = FileRecorder::new(path);
    recorder.start().await?;
    let clip = recorder.stop().await?;

    let result = portal.chat().test_audio_upload(clip).await?;
    println!("{} {}", "✓".green().bold(), "Audio upload accepted".green());
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
