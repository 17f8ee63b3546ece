//! Gradebook CLI - weighted project scores in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use commands::{correction, import, logs, project, query, recompute, score, status, top, user};
use gradebook_core::LogEvent;

/// Gradebook - weighted project scores in your terminal
#[derive(Parser)]
#[command(name = "gb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gradebook status and summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: project::ProjectCommands,
    },

    /// Record and list corrections
    Correction {
        #[command(subcommand)]
        command: correction::CorrectionCommands,
    },

    /// Recompute weighted average scores
    Recompute {
        /// Only recompute this user (all users otherwise)
        #[arg(long)]
        user: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect scores without writing them
    Score {
        #[command(subcommand)]
        command: score::ScoreCommands,
    },

    /// Show the best users by average score
    Top {
        /// Number of users to show (defaults to defaultTopLimit from settings)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a read-only SQL query against the database
    Query {
        /// SQL query to execute
        sql: Option<String>,
        /// Read SQL from file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Output format (table, csv, json)
        #[arg(long, default_value = "table")]
        format: String,
        /// Output as JSON (shorthand for --format json)
        #[arg(long)]
        json: bool,
    },

    /// Import corrections from a CSV file (user_id,project_id,score)
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Validate rows without writing them
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::User { .. } => "user",
            Commands::Project { .. } => "project",
            Commands::Correction { .. } => "correction",
            Commands::Recompute { .. } => "recompute",
            Commands::Score { .. } => "score",
            Commands::Top { .. } => "top",
            Commands::Query { .. } => "query",
            Commands::Import { .. } => "import",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GB_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let command = cli.command.name();
    let result = run(cli);

    // Opened after the command so the event log file is never held twice
    let logger = commands::get_logger();
    match result {
        Ok(()) => {
            commands::log_event(&logger, LogEvent::new("command_executed").with_command(command));
            ExitCode::SUCCESS
        }
        Err(e) => {
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(command)
                    .with_error(e.to_string())
                    .with_error_details(format!("{:?}", e)),
            );
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::User { command } => user::run(command),
        Commands::Project { command } => project::run(command),
        Commands::Correction { command } => correction::run(command),
        Commands::Recompute { user, json } => recompute::run(user, json),
        Commands::Score { command } => score::run(command),
        Commands::Top { limit, json } => top::run(limit, json),
        Commands::Query { sql, file, format, json } => {
            let fmt = if json { "json".to_string() } else { format };
            query::run(sql.as_deref(), file.as_deref(), &fmt)
        }
        Commands::Import { file, dry_run, json } => import::run(&file, dry_run, json),
        Commands::Logs { command } => logs::run(command),
    }
}
