//! Migration service - manages database schema migrations
//!
//! Migrations are SQL files embedded at compile time. Each applied migration
//! is recorded in sys_migrations, so running the service twice is a no-op.
//! The same runner serves the gradebook database and the event log database.

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// Name of the migration that creates sys_migrations itself
const BOOTSTRAP: &str = "000_migrations.sql";

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Service for managing database migrations
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'static [(&'static str, &'static str)],
}

impl<'a> MigrationService<'a> {
    /// Migration runner for the gradebook schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    /// Migration runner for another embedded migration set
    ///
    /// The set must start with a `000_migrations.sql` that creates sys_migrations.
    pub fn with_migrations(
        conn: &'a Connection,
        migrations: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration not yet recorded, in listed order
    ///
    /// A migration's statements and its sys_migrations record commit together,
    /// so a failing migration leaves no trace and is retried on the next run.
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.migrations_table_exists()? {
            let (name, sql) = self
                .migrations
                .iter()
                .find(|(n, _)| *n == BOOTSTRAP)
                .context("Migration set has no bootstrap migration")?;
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        let pending = self.get_pending()?;
        let already_applied = self.migrations.len() - pending.len() - applied.len();

        for (name, sql) in self
            .migrations
            .iter()
            .filter(|(n, _)| pending.iter().any(|p| p.as_str() == *n))
        {
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Names of migrations already recorded, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Names of migrations not yet recorded, in apply order
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = if self.migrations_table_exists()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        // Migration names are compile-time constants, quoting is for form only
        let batch = format!(
            "BEGIN TRANSACTION;\n{}\nINSERT INTO sys_migrations (migration_name) VALUES ('{}');\nCOMMIT;",
            sql,
            name.replace('\'', "''")
        );
        if let Err(e) = self.conn.execute_batch(&batch) {
            // Leave the connection usable if the batch stopped mid-transaction
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(e).with_context(|| format!("Failed to apply migration {}", name));
        }
        Ok(())
    }
}
