//! Logs command - view and manage the event log

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;

use super::get_data_dir;
use crate::output::{self, create_table, print_json};
use gradebook_core::services::KeyCount;
use gradebook_core::{EntryPoint, LoggingService};

/// Upper bound for `--older-than-days` (about a century)
const MAX_RETENTION_DAYS: u64 = 36_500;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(
            long,
            default_value_t = 30,
            value_parser = clap::value_parser!(u64).range(0..=MAX_RETENTION_DAYS)
        )]
        older_than_days: u64,
        /// Actually delete (otherwise only report what would be deleted)
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show totals per event and per command
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Outcome of `logs clear`
#[derive(Debug, Serialize)]
struct ClearReport {
    older_than_days: u64,
    /// Entries older than the cutoff
    matched: u64,
    deleted: u64,
    dry_run: bool,
}

fn get_logging_service() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create gradebook directory: {:?}", data_dir))?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

/// Unix ms of `now - days`, or an error when that instant is not representable
fn cutoff_ms(now: DateTime<Utc>, days: u64) -> Result<i64> {
    let delta = i64::try_from(days)
        .ok()
        .and_then(TimeDelta::try_days)
        .with_context(|| format!("{} days is out of range", days))?;
    let cutoff = now
        .checked_sub_signed(delta)
        .with_context(|| format!("{} days before now is out of range", days))?;
    Ok(cutoff.timestamp_millis())
}

/// Count (dry run) or delete entries older than `older_than_days`
fn clear(service: &LoggingService, older_than_days: u64, force: bool) -> Result<ClearReport> {
    let cutoff = cutoff_ms(Utc::now(), older_than_days)?;
    let report = if force {
        let deleted = service.delete_before(cutoff)?;
        ClearReport { older_than_days, matched: deleted, deleted, dry_run: false }
    } else {
        let matched = service.count_before(cutoff)?;
        ClearReport { older_than_days, matched, deleted: 0, dry_run: true }
    };
    Ok(report)
}

fn print_counts(title: &str, counts: &[KeyCount]) {
    if counts.is_empty() {
        return;
    }
    println!();
    println!("{}", title.bold());
    let mut table = create_table();
    table.set_header(vec!["Name", "Entries"]);
    for c in counts {
        table.add_row(vec![c.key.clone(), c.count.to_string()]);
    }
    println!("{}", table);
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Context", "Error"]);

            for entry in entries {
                let mut context = Vec::new();
                if let Some(cmd) = &entry.command {
                    context.push(cmd.clone());
                }
                if let Some(user_id) = entry.user_id {
                    context.push(format!("user {}", user_id));
                }

                let error_indicator = if entry.error_message.is_some() {
                    "!".red().to_string()
                } else {
                    String::new()
                };

                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.entry_point,
                    entry.event,
                    context.join(", "),
                    error_indicator,
                ]);
            }
            println!("{}", table);

            if !errors {
                let recent_errors = service.get_errors(3)?;
                if !recent_errors.is_empty() {
                    println!();
                    println!("{}", "Recent Errors:".red().bold());
                    for err in &recent_errors {
                        println!(
                            "  {} [{}]: {}",
                            format_timestamp(err.timestamp).dimmed(),
                            err.event,
                            err.error_message.as_deref().unwrap_or("Unknown error")
                        );
                    }
                }
            }
        }
        LogsCommands::Clear { older_than_days, force, json } => {
            let report = clear(&service, older_than_days, force)?;
            if json {
                return print_json(&report);
            }
            if report.dry_run {
                output::warning(&format!(
                    "Would delete {} entries older than {} days. Re-run with --force.",
                    report.matched, older_than_days
                ));
                return Ok(());
            }
            println!("Deleted {} log entries", report.deleted);
            println!("Log database: {}", service.db_path().display());
        }
        LogsCommands::Stats { json } => {
            let stats = service.stats()?;
            if json {
                return print_json(&stats);
            }

            println!("{}", "Event Log".bold());
            println!("  Entries: {}", stats.total);
            println!("  Failures: {}", stats.failures);
            println!("  Database: {}", service.db_path().display());
            print_counts("By event", &stats.by_event);
            print_counts("By command", &stats.by_command);
        }
    }

    Ok(())
}
