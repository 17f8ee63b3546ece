//! Event log - structured events persisted to logs.duckdb
//!
//! Records what happened (command run, recompute finished or failed) with
//! the app version and platform. Events carry no scores; a user id is the
//! only structured reference to gradebook data.
//!
//! Diagnostics go through `tracing`; this log is the durable audit trail.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

pub const LOG_DB_FILENAME: &str = "logs.duckdb";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique id: millisecond timestamp in the high bits, a wrapping counter in the low 16
fn generate_id() -> u64 {
    let timestamp = now_ms().max(0) as u64;
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Who produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            user_id: None,
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub user_id: Option<i64>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform, \
                             event, user_id, command, error_message, error_details";

/// Number of entries sharing one value of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

/// Summary of the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub total: u64,
    /// Entries carrying an error message
    pub failures: u64,
    pub by_event: Vec<KeyCount>,
    pub by_command: Vec<KeyCount>,
}

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in `data_dir` and bring its schema up to date
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join(LOG_DB_FILENAME);
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Record an event, stamped with entry point, version and platform
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, user_id, command, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.user_id,
                &event.command,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    /// Most recent entries first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query_entries("", limit)
    }

    /// Most recent entries that carry an error message
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query_entries("WHERE error_message IS NOT NULL", limit)
    }

    fn query_entries(&self, filter: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            ENTRY_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    entry_point: row.get(2)?,
                    app_version: row.get(3)?,
                    platform: row.get(4)?,
                    event: row.get(5)?,
                    user_id: row.get(6)?,
                    command: row.get(7)?,
                    error_message: row.get(8)?,
                    error_details: row.get(9)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Delete entries older than `timestamp_ms` (unix ms), returning how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Number of entries `delete_before(timestamp_ms)` would remove
    pub fn count_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_logs WHERE timestamp < ?",
            [timestamp_ms],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Totals over the whole log: entries, failures, and counts per event and per command
    pub fn stats(&self) -> Result<LogStats> {
        let conn = self.lock()?;
        let (total, failures): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(error_message) FROM sys_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let by_event = Self::grouped_counts(&conn, "event")?;
        let by_command = Self::grouped_counts(&conn, "command")?;

        Ok(LogStats {
            total: total.max(0) as u64,
            failures: failures.max(0) as u64,
            by_event,
            by_command,
        })
    }

    fn grouped_counts(conn: &Connection, column: &str) -> Result<Vec<KeyCount>> {
        let sql = format!(
            "SELECT {col}, COUNT(*) AS n FROM sys_logs
             WHERE {col} IS NOT NULL
             GROUP BY {col}
             ORDER BY n DESC, {col}",
            col = column
        );
        let mut stmt = conn.prepare(&sql)?;
        let counts = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok(KeyCount {
                    key: row.get(0)?,
                    count: count.max(0) as u64,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(counts)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logging_service_creation() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
        assert!(service.db_path().exists());
    }

    #[test]
    fn test_log_event() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log(LogEvent::new("recompute_all_completed")).unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "recompute_all_completed");
        assert_eq!(entries[0].entry_point, "cli");
        assert_eq!(entries[0].app_version, "1.0.0");
    }

    #[test]
    fn test_log_with_user_and_command() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "2.0.0").unwrap();

        service
            .log(
                LogEvent::new("recompute_completed")
                    .with_user(7)
                    .with_command("recompute"),
            )
            .unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries[0].user_id, Some(7));
        assert_eq!(entries[0].command.as_deref(), Some("recompute"));
        assert_eq!(entries[0].app_version, "2.0.0");
    }

    #[test]
    fn test_log_error() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log(LogEvent::new("command_executed")).unwrap();
        service
            .log(LogEvent::new("recompute_failed").with_error("No data: user 3 has no corrections"))
            .unwrap();

        let errors = service.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "recompute_failed");
        assert_eq!(errors[0].error_details, None);
    }

    #[test]
    fn test_count_and_delete() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        for event in ["a", "b", "c"] {
            service.log(LogEvent::new(event)).unwrap();
        }
        assert_eq!(service.count().unwrap(), 3);

        assert_eq!(service.delete_before(now_ms() + 1000).unwrap(), 3);
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn test_count_before_matches_delete_before() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log(LogEvent::new("a")).unwrap();
        service.log(LogEvent::new("b")).unwrap();
        let cutoff = now_ms() + 1000;

        assert_eq!(service.count_before(now_ms() - 60_000).unwrap(), 0);
        assert_eq!(service.count_before(cutoff).unwrap(), 2);
        // Counting removes nothing
        assert_eq!(service.count().unwrap(), 2);
        assert_eq!(service.delete_before(cutoff).unwrap(), 2);
    }

    #[test]
    fn test_stats_groups_events_and_commands() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        for command in ["status", "recompute", "status"] {
            service
                .log(LogEvent::new("command_executed").with_command(command))
                .unwrap();
        }
        service
            .log(
                LogEvent::new("command_failed")
                    .with_command("recompute")
                    .with_error("No data: user 3 has no corrections"),
            )
            .unwrap();
        service.log(LogEvent::new("recompute_completed").with_user(1)).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.failures, 1);
        assert_eq!(
            stats.by_event,
            vec![
                KeyCount { key: "command_executed".into(), count: 3 },
                KeyCount { key: "command_failed".into(), count: 1 },
                KeyCount { key: "recompute_completed".into(), count: 1 },
            ]
        );
        assert_eq!(
            stats.by_command,
            vec![
                KeyCount { key: "recompute".into(), count: 2 },
                KeyCount { key: "status".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_stats_on_empty_log() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.failures, 0);
        assert!(stats.by_event.is_empty());
        assert!(stats.by_command.is_empty());
    }

    #[test]
    fn test_reopen_keeps_entries() {
        let dir = tempdir().unwrap();
        {
            let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
            service
                .log(LogEvent::new("command_executed").with_command("status"))
                .unwrap();
        }
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
        assert_eq!(service.count().unwrap(), 1);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: std::collections::HashSet<u64> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
