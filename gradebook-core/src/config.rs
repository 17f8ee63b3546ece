//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "databaseFile": "gradebook.duckdb", "eventLog": true, "defaultTopLimit": 10 }
//! }
//! ```
//! Keys this crate does not manage are kept untouched when saving.
//! `GRADEBOOK_DB_FILE` and `GRADEBOOK_EVENT_LOG` override the file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::result::{Error, Result};

pub const SETTINGS_FILENAME: &str = "settings.json";
pub const DEFAULT_DB_FILENAME: &str = "gradebook.duckdb";
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_log: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_top_limit: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Gradebook configuration (resolved view of settings + environment)
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file name, relative to the data directory
    pub database_file: String,
    /// Whether commands are recorded in logs.duckdb
    pub event_log: bool,
    pub default_top_limit: usize,
    // Keep the raw settings for preservation when saving
    raw: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(SettingsFile::default(), |_| None)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "TRUE" | "YES" => Some(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    ///
    /// A malformed settings file is ignored with a warning, not fatal.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILENAME);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %settings_path.display(), error = %e, "ignoring malformed settings");
                SettingsFile::default()
            })
        } else {
            SettingsFile::default()
        };

        Ok(Self::resolve(raw, |key| std::env::var(key).ok()))
    }

    fn resolve(raw: SettingsFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let database_file = env("GRADEBOOK_DB_FILE")
            .filter(|f| !f.trim().is_empty())
            .or_else(|| raw.app.database_file.clone())
            .unwrap_or_else(|| DEFAULT_DB_FILENAME.to_string());

        let event_log = env("GRADEBOOK_EVENT_LOG")
            .as_deref()
            .and_then(parse_flag)
            .or(raw.app.event_log)
            .unwrap_or(true);

        let default_top_limit = raw.app.default_top_limit.unwrap_or(DEFAULT_TOP_LIMIT);

        Self {
            database_file,
            event_log,
            default_top_limit,
            raw,
        }
    }

    /// Save config, preserving settings this crate does not manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILENAME);

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self.raw.clone())
        } else {
            self.raw.clone()
        };

        settings.app.database_file = Some(self.database_file.clone());
        settings.app.event_log = Some(self.event_log);
        settings.app.default_top_limit = Some(self.default_top_limit);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Reject values that cannot work before anything is opened
    pub fn validate(&self) -> Result<()> {
        let file = Path::new(&self.database_file);
        if self.database_file.trim().is_empty() || file.is_absolute() || file.components().count() != 1 {
            return Err(Error::Config(format!(
                "databaseFile must be a plain file name, got '{}'",
                self.database_file
            )));
        }
        Ok(())
    }
}
