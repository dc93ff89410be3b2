use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use ecohealth_core::{departments, filter_rows, DoctorRow, JoinStrategy};

use super::{or_dash, print_title, signed_in_portal};

#[derive(Subcommand)]
pub enum DoctorsCommand {
    #[command(about = "List the doctors assigned to you")]
    List {
        #[arg(short, long, help = "Filter by name, department, specialty, email or phone")]
        search: Option<String>,

        #[arg(short, long, help = "Only show one department")]
        department: Option<String>,

        #[arg(long, help = "Profile/roster join (strict, first-entry)")]
        join: Option<String>,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "List the departments your doctors belong to")]
    Departments {
        #[arg(long, help = "Profile/roster join (strict, first-entry)")]
        join: Option<String>,
    },
}

pub async fn handle_doctors_command(action: Option<DoctorsCommand>) -> Result<()> {
    match action {
        Some(DoctorsCommand::List {
            search,
            department,
            join,
            format,
        }) => cmd_doctors_list(search, department, join, &format).await,
        Some(DoctorsCommand::Departments { join }) => cmd_departments(join).await,
        None => cmd_doctors_list(None, None, None, "text").await,
    }
}

async fn load_rows(strategy: Option<String>) -> Result<Vec<DoctorRow>> {
    let (config, portal, _user) = signed_in_portal().await?;
    let strategy = match strategy {
        Some(s) => s.parse::<JoinStrategy>()?,
        None => config.join_strategy(),
    };
    Ok(portal.patient().load_directory(strategy).await?)
}

async fn cmd_doctors_list(
    search: Option<String>,
    department: Option<String>,
    strategy: Option<String>,
    format: &str,
) -> Result<()> {
    let rows = load_rows(strategy).await?;
    let visible = filter_rows(&rows, search.as_deref().unwrap_or(""), department.as_deref());

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{}", "No doctors assigned yet.".yellow());
        return Ok(());
    }

    print_title("My Doctors", 80);

    if visible.is_empty() {
        println!("No doctors match the current filters.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(comfy_table::Color::Cyan),
            Cell::new("Department").fg(comfy_table::Color::Cyan),
            Cell::new("Specialty").fg(comfy_table::Color::Cyan),
            Cell::new("Phone").fg(comfy_table::Color::Cyan),
            Cell::new("Email").fg(comfy_table::Color::Cyan),
        ]);

    for row in &visible {
        let name = if row.is_placeholder() {
            Cell::new(&row.full_name).fg(comfy_table::Color::DarkGrey)
        } else {
            Cell::new(&row.full_name)
        };
        table.add_row(vec![
            name,
            Cell::new(or_dash(Some(row.department.as_str()))),
            Cell::new(or_dash(row.specialty.as_deref())),
            Cell::new(or_dash(row.phone.as_deref())),
            Cell::new(or_dash(row.email.as_deref())),
        ]);
    }

    println!("{}", table);
    println!();
    println!("  Showing {} of {} doctors", visible.len(), rows.len());

    Ok(())
}

async fn cmd_departments(strategy: Option<String>) -> Result<()> {
    let rows = load_rows(strategy).await?;
    let names = departments(&rows);

    if names.is_empty() {
        println!("{}", "No departments found.".yellow());
        return Ok(());
    }

    print_title("Departments", 40);
    for name in names {
        let count = rows.iter().filter(|r| r.department == name).count();
        println!("  {} {} ({})", "•".blue(), name, count);
    }

    Ok(())
}
