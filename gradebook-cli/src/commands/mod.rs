//! CLI command implementations

pub mod correction;
pub mod import;
pub mod logs;
pub mod project;
pub mod query;
pub mod recompute;
pub mod score;
pub mod status;
pub mod top;
pub mod user;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use gradebook_core::config::Config;
use gradebook_core::{EntryPoint, GradebookContext, LogEvent, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None when the event log is disabled or fails to open (it never blocks a command)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;

    let enabled = Config::load(&data_dir).map(|c| c.event_log).unwrap_or(true);
    if !enabled {
        return None;
    }

    match LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")) {
        Ok(service) => Some(service),
        Err(e) => {
            tracing::debug!("event log unavailable: {:#}", e);
            None
        }
    }
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!("failed to write event log: {:#}", e);
        }
    }
}

/// Get the gradebook directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("GRADEBOOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".gradebook"))
        .ok_or_else(|| anyhow!("Could not find home directory; set GRADEBOOK_DIR"))
}

/// Open the gradebook, creating the data directory if needed
pub fn get_context() -> Result<GradebookContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create gradebook directory: {:?}", data_dir))?;

    GradebookContext::new(&data_dir).context("Failed to open gradebook")
}
