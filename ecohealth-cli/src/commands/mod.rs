pub mod auth;
pub mod chat;
pub mod doctors;
pub mod feedback;
pub mod profile;

pub use auth::{cmd_login, cmd_logout, cmd_status};
pub use chat::{handle_chat_command, ChatCommand};
pub use doctors::{handle_doctors_command, DoctorsCommand};
pub use feedback::{handle_feedback_command, FeedbackCommand};
pub use profile::{handle_profile_command, ProfileCommand};

use anyhow::Result;
use colored::Colorize;
use ecohealth_core::{Patient, Portal, PortalError};
use tracing::debug;

use crate::config::CliConfig;

/// Loads the config, restores the session and fails unless someone is
/// signed in.
pub(crate) async fn signed_in_portal() -> Result<(CliConfig, Portal, Patient)> {
    let config = CliConfig::load()?;
    let portal = config.open_portal().await?;
    let user = portal
        .auth()
        .user()
        .await
        .ok_or(PortalError::NotAuthenticated)?;
    debug!(patient_id = %user.id, "Using stored session");
    Ok((config, portal, user))
}

pub(crate) fn print_title(title: &str, width: usize) {
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(width).dimmed());
    println!();
}

pub(crate) fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}
