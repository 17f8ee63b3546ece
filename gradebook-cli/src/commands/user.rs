//! User commands - register and inspect users

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use gradebook_core::{Country, NewUser, User};

use super::get_context;
use crate::output::{self, create_table, format_score, print_json};

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Add {
        /// Email address (must be unique)
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Country code (US, CO or TN)
        #[arg(long)]
        country: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one user and their corrections
    Show {
        /// User id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Add { email, name, country, json } => add(email, name, country, json),
        UserCommands::List { json } => list(json),
        UserCommands::Show { id, json } => show(id, json),
    }
}

fn add(email: String, name: Option<String>, country: Option<String>, json: bool) -> Result<()> {
    let mut new_user = NewUser::new(email);
    if let Some(name) = name {
        new_user = new_user.with_name(name);
    }
    if let Some(code) = country {
        new_user = new_user.with_country(code.parse::<Country>()?);
    }

    let ctx = get_context()?;
    let user = ctx.user_service.create_user(new_user)?;

    if json {
        return print_json(&user);
    }
    output::success(&format!("Created user {} ({})", user.id, user.email));
    Ok(())
}

fn list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let users = ctx.user_service.list_users()?;

    if json {
        return print_json(&users);
    }
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Email", "Name", "Country", "Average"]);
    for user in &users {
        table.add_row(user_row(user));
    }
    println!("{}", table);
    Ok(())
}

fn show(id: i64, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user = ctx.user_service.get_user(id)?;
    let lines = ctx.course_service.list_corrections(id)?;

    if json {
        return print_json(&serde_json::json!({
            "user": user,
            "corrections": lines,
        }));
    }

    println!("{}", user.email.bold());
    println!("  ID: {}", user.id);
    println!("  Name: {}", user.name.as_deref().unwrap_or("-"));
    println!(
        "  Country: {}",
        user.country.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("  Average score: {}", format_score(user.average_score));
    println!();

    if lines.is_empty() {
        println!("No corrections recorded.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Project", "Name", "Score", "Weight"]);
    for line in &lines {
        table.add_row(vec![
            line.project_id.to_string(),
            line.project_name.clone(),
            line.score.to_string(),
            line.weight.to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn user_row(user: &User) -> Vec<String> {
    vec![
        user.id.to_string(),
        user.email.clone(),
        user.name.clone().unwrap_or_default(),
        user.country.map(|c| c.to_string()).unwrap_or_default(),
        format_score(user.average_score),
    ]
}
