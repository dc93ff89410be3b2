use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use ecohealth_core::forms::MAX_STAR_RATING;
use ecohealth_core::{
    DateBucket, FeedbackDraft, FeedbackFilter, FeedbackKind, FeedbackRecord,
    FeedbackSort, FileRecorder, Recorder, EMOJI_PALETTE,
};
use std::path::PathBuf;

use super::{print_title, signed_in_portal};

#[derive(Subcommand)]
pub enum FeedbackCommand {
    #[command(about = "Send feedback (any mix of text, rating, emoji and voice)")]
    Submit {
        #[arg(short, long)]
        text: Option<String>,

        #[arg(short, long, help = "Star rating from 1 to 5")]
        rating: Option<u8>,

        #[arg(short, long, help = "One of the emojis from 'ecohealth feedback emojis'")]
        emoji: Option<String>,

        #[arg(long, help = "Audio file to attach as a voice message")]
        voice: Option<PathBuf>,
    },

    #[command(about = "Browse feedback you sent")]
    List {
        #[arg(short, long, help = "Search text and voice transcripts")]
        search: Option<String>,

        #[arg(short, long, help = "Exact star rating")]
        rating: Option<u8>,

        #[arg(
            short,
            long,
            help = "Type (text-voice, text, voice, emoji-rating, emoji, rating, other)"
        )]
        kind: Option<String>,

        #[arg(short, long, help = "Age (recent, week, month, older)")]
        date: Option<String>,

        #[arg(long, default_value = "newest", help = "Order (newest, oldest, highest, lowest)")]
        sort: String,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Send an earlier feedback entry again")]
    Resend {
        #[arg(help = "Feedback ID")]
        id: String,
    },

    #[command(about = "Show the emojis feedback accepts")]
    Emojis,
}

pub async fn handle_feedback_command(action: Option<FeedbackCommand>) -> Result<()> {
    match action {
        Some(FeedbackCommand::Submit {
            text,
            rating,
            emoji,
            voice,
        }) => cmd_feedback_submit(text, rating, emoji, voice).await,
        Some(FeedbackCommand::List {
            search,
            rating,
            kind,
            date,
            sort,
            format,
        }) => {
            let filter = FeedbackFilter {
                search,
                rating,
                kind: kind.map(|k| k.parse::<FeedbackKind>()).transpose()?,
                date_range: date.map(|d| d.parse::<DateBucket>()).transpose()?,
                sort: sort.parse::<FeedbackSort>()?,
            };
            cmd_feedback_list(filter, &format).await
        }
        Some(FeedbackCommand::Resend { id }) => cmd_feedback_resend(&id).await,
        Some(FeedbackCommand::Emojis) => cmd_feedback_emojis(),
        None => cmd_feedback_list(FeedbackFilter::default(), "text").await,
    }
}

async fn cmd_feedback_submit(
    text: Option<String>,
    rating: Option<u8>,
    emoji: Option<String>,
    voice: Option<PathBuf>,
) -> Result<()> {
    let mut draft = FeedbackDraft::new();
    if let Some(text) = text {
        draft = draft.text(text);
    }
    if let Some(rating) = rating {
        draft = draft.rating(rating);
    }
    if let Some(emoji) = emoji {
        draft = draft.emoji(emoji);
    }
    if let Some(path) = voice {
        let mut recorder = FileRecorder::new(path);
        recorder.start().await?;
        let clip = recorder.stop().await?;
        println!(
            "  {} Attached {} ({} bytes)",
            "→".blue(),
            clip.file_name,
            clip.len()
        );
        draft = draft.voice(clip);
    }

    // Checked before touching the network or the session.
    draft.validate()?;

    let (_config, portal, _user) = signed_in_portal().await?;
    let record = portal.feedback().submit(draft).await?;

    println!(
        "{} {}",
        "✓".green().bold(),
        "Thank you for your feedback!".green()
    );
    if !record.id.is_empty() {
        println!("  {} {}", "ID:".dimmed(), record.id);
    }

    Ok(())
}

fn stars(rating: u8) -> String {
    let filled = rating.min(MAX_STAR_RATING) as usize;
    format!(
        "{}{}",
        "★".repeat(filled),
        "☆".repeat(MAX_STAR_RATING as usize - filled)
    )
}

fn preview(record: &FeedbackRecord) -> String {
    let text = record
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .or(record.voice_text.as_deref())
        .unwrap_or("");
    if text.chars().count() > 48 {
        format!("{}…", text.chars().take(47).collect::<String>())
    } else {
        text.to_string()
    }
}

async fn cmd_feedback_list(filter: FeedbackFilter, format: &str) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;
    let records = portal.feedback().fetch_mine().await?;
    let now = Utc::now();
    let visible = filter.apply(&records, now);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "You have not sent any feedback yet.".yellow());
        println!();
        println!(
            "Run {} to share your experience.",
            "ecohealth feedback submit".cyan().bold()
        );
        return Ok(());
    }

    print_title("My Feedback", 80);

    if visible.is_empty() {
        println!("No feedback matches the current filters.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(comfy_table::Color::Cyan),
            Cell::new("Type").fg(comfy_table::Color::Cyan),
            Cell::new("Rating").fg(comfy_table::Color::Cyan),
            Cell::new("Emoji").fg(comfy_table::Color::Cyan),
            Cell::new("Message").fg(comfy_table::Color::Cyan),
            Cell::new("Sent").fg(comfy_table::Color::Cyan),
        ]);

    for record in &visible {
        let sent = match record.created_at {
            Some(at) => format!(
                "{} ({})",
                at.format("%Y-%m-%d"),
                DateBucket::of(at, now)
            ),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&record.id),
            Cell::new(FeedbackKind::classify(record)),
            Cell::new(stars(record.rating())).fg(comfy_table::Color::Yellow),
            Cell::new(record.emoji.as_deref().unwrap_or("")),
            Cell::new(preview(record)),
            Cell::new(sent),
        ]);
    }

    println!("{}", table);
    println!();
    if filter.is_active() {
        println!("  Showing {} of {} entries", visible.len(), records.len());
    } else {
        println!("  Total: {} entries", records.len());
    }

    Ok(())
}

async fn cmd_feedback_resend(id: &str) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;
    let record = portal.feedback().resend(id).await?;

    println!(
        "{} {}",
        "✓".green().bold(),
        format!("Feedback {} sent again", id).green()
    );
    println!("  {} {}", "New ID:".dimmed(), record.id);

    Ok(())
}

fn cmd_feedback_emojis() -> Result<()> {
    println!("{}", "Feedback Emojis".cyan().bold());
    println!("{}", "═".repeat(30).dimmed());
    println!("  {}", EMOJI_PALETTE.join("  "));
    println!();
    println!(
        "Use {} to attach one.",
        "ecohealth feedback submit --emoji <EMOJI>".cyan()
    );
    Ok(())
}
