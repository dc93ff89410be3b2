use clap::{Parser, Subcommand};
use colored::Colorize;
use ecohealth_core::{logging, CliErrorDisplay, PortalError};
use std::process::ExitCode;

mod commands;
mod config;

use commands::{
    cmd_login, cmd_logout, cmd_status, handle_chat_command, handle_doctors_command,
    handle_feedback_command, handle_profile_command, ChatCommand, DoctorsCommand,
    FeedbackCommand, ProfileCommand,
};
use config::CliConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "ecohealth")]
#[command(version = VERSION)]
#[command(about = "EcoHealth - patient portal in your terminal")]
#[command(long_about = r#"
EcoHealth gives patients access to their care team from the terminal:
sign in, browse assigned doctors, edit the profile, leave feedback and
talk to the multilingual assistant.

Use 'ecohealth login' to start a session, then 'ecohealth doctors' to list
your care team and 'ecohealth chat send' to ask the assistant.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Sign in and persist the session token")]
    Login {
        #[arg(short, long, env = "ECOHEALTH_EMAIL")]
        email: String,

        #[arg(short, long, env = "ECOHEALTH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    #[command(about = "End the session and forget the stored token")]
    Logout,

    #[command(about = "Show the current session and backend endpoints")]
    Status {
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    #[command(about = "Browse your assigned doctors")]
    Doctors {
        #[command(subcommand)]
        action: Option<DoctorsCommand>,
    },

    #[command(about = "View or edit your profile")]
    Profile {
        #[command(subcommand)]
        action: Option<ProfileCommand>,
    },

    #[command(about = "Send feedback and browse what you sent")]
    Feedback {
        #[command(subcommand)]
        action: Option<FeedbackCommand>,
    },

    #[command(about = "Talk to the assistant and manage chat history")]
    Chat {
        #[command(subcommand)]
        action: Option<ChatCommand>,
    },

    #[command(about = "Show version information")]
    Version {
        #[arg(short, long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<PortalError>() {
                Some(portal_error) => {
                    eprint!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(portal_error))
                }
                None => eprintln!("{}: {}", "Error".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}

/// A broken config file must not keep `--help` or `version` from working, so
/// logging falls back to defaults here and the command reports the error.
fn init_logging(verbose: bool) {
    let logging_config = CliConfig::load()
        .map(|c| c.portal.logging)
        .unwrap_or_default();
    logging::init_from_config(&logging_config, verbose);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Login { email, password } => cmd_login(&email, &password).await,
        Commands::Logout => cmd_logout().await,
        Commands::Status { format } => cmd_status(&format).await,
        Commands::Doctors { action } => handle_doctors_command(action).await,
        Commands::Profile { action } => handle_profile_command(action).await,
        Commands::Feedback { action } => handle_feedback_command(action).await,
        Commands::Chat { action } => handle_chat_command(action).await,
        Commands::Version { detailed } => cmd_version(detailed),
    }
}

fn cmd_version(detailed: bool) -> anyhow::Result<()> {
    if detailed {
        println!("{}", "EcoHealth Version Information".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!("  {:<15} {}", "Version:".bold(), VERSION);
        println!("  {:<15} {}", "Name:".bold(), NAME);
        println!("  {:<15} Apache-2.0", "License:".bold());
        println!();
        println!("  {}", "Backends:".bold());
        println!("    ◎ Auth (sessions, profile, doctors)");
        println!("    ◈ Chat (text and voice assistant)");
        println!("    ◇ Feedback");
        println!();
        println!("  {}", "Build Information:".bold());
        println!("    Rust Edition: 2021");
        #[cfg(debug_assertions)]
        println!("    Build:        Debug");
        #[cfg(not(debug_assertions))]
        println!("    Build:        Release");
    } else {
        println!("ecohealth {}", VERSION);
    }

    Ok(())
}
