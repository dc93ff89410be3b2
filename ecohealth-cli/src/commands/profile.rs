use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use ecohealth_core::{validate_profile, Patient, ProfileForm};

use super::{or_dash, print_title, signed_in_portal};

#[derive(Subcommand)]
pub enum ProfileCommand {
    #[command(about = "Show your profile")]
    Show {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Update profile fields; omitted fields stay unchanged")]
    Update {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long, help = "Nine-character phone number")]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long, help = "Notification channel (email, sms, ...)")]
        notifications: Option<String>,

        #[arg(long, help = "Preferred language code")]
        language: Option<String>,

        #[arg(long, env = "ECOHEALTH_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long, env = "ECOHEALTH_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: Option<String>,
    },
}

pub async fn handle_profile_command(action: Option<ProfileCommand>) -> Result<()> {
    match action {
        Some(ProfileCommand::Show { format }) => cmd_profile_show(&format).await,
        Some(ProfileCommand::Update {
            first_name,
            last_name,
            email,
            phone,
            address,
            notifications,
            language,
            password,
            confirm_password,
        }) => {
            let form = ProfileForm {
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
                email: email.unwrap_or_default(),
                phone_number: phone.unwrap_or_default(),
                address: address.unwrap_or_default(),
                notification_preferences: notifications.unwrap_or_default(),
                language_preferences: language.unwrap_or_default(),
                new_password: password.unwrap_or_default(),
                confirm_password: confirm_password.unwrap_or_default(),
            };
            cmd_profile_update(form).await
        }
        None => cmd_profile_show("text").await,
    }
}

async fn cmd_profile_show(format: &str) -> Result<()> {
    let (_config, portal, _user) = signed_in_portal().await?;
    let profile = portal.patient().fetch_profile().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    print_title("My Profile", 50);
    print_profile(&profile);

    Ok(())
}

fn print_profile(profile: &Patient) {
    println!("  {:<16} {}", "Name:".bold(), profile.full_name());
    println!("  {:<16} {}", "Email:".bold(), profile.email);
    println!(
        "  {:<16} {}",
        "Phone:".bold(),
        or_dash(profile.phone_number.as_deref())
    );
    println!(
        "  {:<16} {}",
        "Address:".bold(),
        or_dash(profile.address.as_deref())
    );
    println!(
        "  {:<16} {}",
        "Notifications:".bold(),
        profile.notification_preference()
    );
    println!(
        "  {:<16} {}",
        "Language:".bold(),
        profile.language_preference()
    );

    if !profile.doctors.is_empty() {
        println!();
        println!("  {}", "Care Team".yellow().bold());
        for assignment in &profile.doctors {
            println!(
                "    {} {} ({})",
                "•".blue(),
                assignment.department,
                assignment.specialty.as_deref().unwrap_or("general")
            );
        }
    }
}

async fn cmd_profile_update(form: ProfileForm) -> Result<()> {
    let update = validate_profile(&form)?;
    let (_config, portal, _user) = signed_in_portal().await?;

    println!(
        "  {} Updating {}...",
        "→".blue(),
        update.field_names().join(", ")
    );

    let profile = portal.patient().update_profile(&update).await?;

    println!(
        "{} {}",
        "✓".green().bold(),
        "Profile updated successfully".green()
    );
    println!();
    print_profile(&profile);

    Ok(())
}
