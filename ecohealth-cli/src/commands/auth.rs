use anyhow::Result;
use colored::Colorize;
use ecohealth_core::forms::validate_login;

use crate::config::CliConfig;

pub async fn cmd_login(email: &str, password: &str) -> Result<()> {
    let credentials = validate_login(email, password)?;

    let config = CliConfig::load()?;
    let portal = config.open_portal().await?;

    println!("  {} Signing in as {}...", "→".blue(), credentials.email.yellow());

    let response = portal.auth().login(&credentials).await?;

    println!();
    println!(
        "{} {}",
        "✓".green().bold(),
        format!("Welcome, {}!", response.patient.full_name()).green()
    );
    println!(
        "  {} {}",
        "Session stored in".dimmed(),
        config.portal.token_path()?.display()
    );

    Ok(())
}

pub async fn cmd_logout() -> Result<()> {
    let config = CliConfig::load()?;
    let portal = config.open_portal().await?;

    let was_signed_in = portal.auth().is_authenticated().await || portal.tokens().has_token();
    portal.logout().await;

    if was_signed_in {
        println!("{} {}", "✓".green().bold(), "Logged out".green());
    } else {
        println!("{}", "No active session.".yellow());
    }

    Ok(())
}

pub async fn cmd_status(format: &str) -> Result<()> {
    let config = CliConfig::load()?;
    let portal = config.open_portal().await?;
    let state = portal.auth().snapshot().await;
    let backends = &config.portal.backends;

    if format == "json" {
        let output = serde_json::json!({
            "authenticated": state.is_authenticated(),
            "user": state.user,
            "backends": {
                "auth": backends.auth_url,
                "chat": backends.chat_url,
                "feedback": backends.feedback_url,
            },
            "join_strategy": config.join_strategy().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    super::print_title("EcoHealth Session", 40);

    match &state.user {
        Some(user) => {
            println!("  {} {}", "Session:".bold(), "Signed in".green());
            println!("    Name:          {}", user.full_name());
            println!("    Email:         {}", user.email);
            println!("    Patient ID:    {}", user.id);
            println!("    Doctors:       {}", user.doctors.len());
        }
        None => {
            println!("  {} {}", "Session:".bold(), "Not signed in".yellow());
            println!();
            println!("  Run {} to start a session.", "ecohealth login".cyan().bold());
        }
    }

    println!();
    println!("  {}", "Backends".yellow().bold());
    println!("    Auth:          {}", backends.auth_url);
    println!("    Chat:          {}", backends.chat_url);
    println!("    Feedback:      {}", backends.feedback_url);

    Ok(())
}
