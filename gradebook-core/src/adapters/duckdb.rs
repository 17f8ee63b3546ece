//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::{params, Connection, OptionalExt};
use sqlparser::ast::Statement;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use tracing::{debug, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Correction, NewUser, Project, RecomputeSummary, ScoreLine, User};
use crate::ports::{QueryResult, Repository, StoreCounts};
use crate::services::MigrationService;

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const USER_COLUMNS: &str =
    "id, email, name, country, CAST(average_score AS DOUBLE) AS average_score";

/// Weighted mean per user. Zero-weight groups are skipped, their mean is undefined.
const RECOMPUTE_ALL_SQL: &str = "
    UPDATE users
    SET average_score = scores.average
    FROM (
        SELECT c.user_id, SUM(c.score * p.weight) / SUM(p.weight) AS average
        FROM corrections c
        JOIN projects p ON p.id = c.project_id
        GROUP BY c.user_id
        HAVING SUM(p.weight) > 0
    ) AS scores
    WHERE users.id = scores.user_id";

/// Validate SQL syntax and reject anything that is not a read statement.
fn validate_read_only_sql(sql: &str) -> Result<()> {
    let dialect = DuckDbDialect {};
    let statements = Parser::parse_sql(&dialect, sql).map_err(|e| {
        let msg = e.to_string();
        Error::validation(msg.trim_start_matches("sql parser error: "))
    })?;

    if statements.is_empty() {
        return Err(Error::validation("Query is empty"));
    }

    for statement in &statements {
        let read_only = matches!(
            statement,
            Statement::Query(_) | Statement::Explain { .. } | Statement::ExplainTable { .. }
        );
        if !read_only {
            return Err(Error::validation("Only SELECT queries are allowed"));
        }
    }
    Ok(())
}

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("could not set lock on file")
        || lower.contains("database is locked")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff while another process holds the file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    debug!(path = %db_path.display(), "opened database");
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs network access
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.lock()?;
        let migration_service = MigrationService::new(&conn);
        let result = migration_service
            .run_pending()
            .map_err(|e| Error::database(format!("Migration failed: {:#}", e)))?;
        if !result.applied.is_empty() {
            info!(applied = ?result.applied, "applied migrations");
        }
        Ok(result)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Connection lock poisoned: {}", e)))
    }

    fn row_to_user(row: &duckdb::Row) -> duckdb::Result<User> {
        let country: Option<String> = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            // The CHECK constraint keeps stored codes inside the known set
            country: country.and_then(|c| c.parse().ok()),
            average_score: row.get(4)?,
        })
    }

    fn row_to_project(row: &duckdb::Row) -> duckdb::Result<Project> {
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            weight: row.get(2)?,
        })
    }

    fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = conn
            .query_row(&sql, params![id], Self::row_to_user)
            .optional()?;
        Ok(user)
    }

    fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", table);
        let count: i64 = conn.query_row(&sql, params![id], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn insert_correction(conn: &Connection, correction: &Correction) -> Result<()> {
        if !Self::exists(conn, "users", correction.user_id)? {
            return Err(Error::not_found(format!("user {}", correction.user_id)));
        }
        if !Self::exists(conn, "projects", correction.project_id)? {
            return Err(Error::not_found(format!("project {}", correction.project_id)));
        }
        conn.execute(
            "INSERT INTO corrections (user_id, project_id, score) VALUES (?, ?, ?)",
            params![correction.user_id, correction.project_id, correction.score],
        )?;
        Ok(())
    }

    fn count(conn: &Connection, sql: &str) -> Result<i64> {
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }

    fn get_column_value(row: &duckdb::Row, idx: usize) -> serde_json::Value {
        use duckdb::types::ValueRef;

        match row.get_ref(idx) {
            Ok(ValueRef::Null) => serde_json::Value::Null,
            Ok(ValueRef::Boolean(b)) => serde_json::Value::Bool(b),
            Ok(ValueRef::TinyInt(i)) => serde_json::json!(i),
            Ok(ValueRef::SmallInt(i)) => serde_json::json!(i),
            Ok(ValueRef::Int(i)) => serde_json::json!(i),
            Ok(ValueRef::BigInt(i)) => serde_json::json!(i),
            Ok(ValueRef::HugeInt(i)) => serde_json::json!(i.to_string()),
            Ok(ValueRef::UTinyInt(i)) => serde_json::json!(i),
            Ok(ValueRef::USmallInt(i)) => serde_json::json!(i),
            Ok(ValueRef::UInt(i)) => serde_json::json!(i),
            Ok(ValueRef::UBigInt(i)) => serde_json::json!(i),
            Ok(ValueRef::Float(f)) => serde_json::json!(f),
            Ok(ValueRef::Double(f)) => serde_json::json!(f),
            Ok(ValueRef::Decimal(d)) => {
                // SUM over integer columns comes back as DECIMAL/HUGEINT
                let s = d.to_string();
                match s.parse::<f64>() {
                    Ok(f) => serde_json::json!(f),
                    Err(_) => serde_json::Value::String(s),
                }
            }
            Ok(ValueRef::Text(bytes)) => {
                serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
            }
            Ok(ValueRef::Blob(bytes)) => {
                serde_json::Value::String(format!("<blob {} bytes>", bytes.len()))
            }
            Ok(ValueRef::Date32(days)) => chrono::DateTime::from_timestamp(days as i64 * 86_400, 0)
                .map(|dt| serde_json::Value::String(dt.date_naive().to_string()))
                .unwrap_or(serde_json::Value::Null),
            Ok(ValueRef::Timestamp(_, ts)) => {
                let dt = chrono::DateTime::from_timestamp_micros(ts)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| ts.to_string());
                serde_json::Value::String(dt)
            }
            _ => serde_json::Value::Null,
        }
    }
}

impl Repository for DuckDbRepository {
    fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Users ===

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.lock()?;
        let id: i64 = conn.query_row(
            "INSERT INTO users (email, name, country) VALUES (?, ?, ?) RETURNING id",
            params![
                user.email,
                user.name,
                user.country.map(|c| c.as_str()),
            ],
            |row| row.get(0),
        )?;

        Self::fetch_user(&conn, id)?
            .ok_or_else(|| Error::database(format!("user {} vanished after insert", id)))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.lock()?;
        Self::fetch_user(&conn, id)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(users)
    }

    // === Projects and corrections ===

    fn add_project(&self, name: &str, weight: f64) -> Result<Project> {
        let conn = self.lock()?;
        let project = conn.query_row(
            "INSERT INTO projects (name, weight) VALUES (?, ?) RETURNING id, name, weight",
            params![name, weight],
            Self::row_to_project,
        )?;
        Ok(project)
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.lock()?;
        let project = conn
            .query_row(
                "SELECT id, name, weight FROM projects WHERE id = ?",
                params![id],
                Self::row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, weight FROM projects ORDER BY id")?;
        let projects = stmt
            .query_map([], Self::row_to_project)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(projects)
    }

    fn add_correction(&self, correction: &Correction) -> Result<()> {
        let conn = self.lock()?;
        Self::insert_correction(&conn, correction)
    }

    fn add_corrections(&self, corrections: &[Correction]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for correction in corrections {
            Self::insert_correction(&tx, correction)?;
        }
        tx.commit()?;
        Ok(corrections.len())
    }

    fn score_lines_for_user(&self, user_id: i64) -> Result<Vec<ScoreLine>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, c.score, p.weight
             FROM corrections c
             JOIN projects p ON p.id = c.project_id
             WHERE c.user_id = ?
             ORDER BY p.id",
        )?;
        let lines = stmt
            .query_map(params![user_id], |row| {
                Ok(ScoreLine {
                    project_id: row.get(0)?,
                    project_name: row.get(1)?,
                    score: row.get(2)?,
                    weight: row.get(3)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(lines)
    }

    // === Score aggregation ===

    fn recompute_user_average(&self, user_id: i64) -> Result<f64> {
        let mut conn = self.lock()?;
        // Dropping the transaction without commit rolls it back
        let tx = conn.transaction()?;

        if !Self::exists(&tx, "users", user_id)? {
            return Err(Error::not_found(format!("user {}", user_id)));
        }

        let (rows, weighted_sum, weight_sum): (i64, f64, f64) = tx.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(c.score * p.weight), 0),
                    COALESCE(SUM(p.weight), 0)
             FROM corrections c
             JOIN projects p ON p.id = c.project_id
             WHERE c.user_id = ?",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        if rows == 0 {
            return Err(Error::no_data(format!("user {} has no corrections", user_id)));
        }
        if weight_sum == 0.0 {
            return Err(Error::no_data(format!(
                "the corrections of user {} all have zero weight",
                user_id
            )));
        }

        tx.execute(
            "UPDATE users SET average_score = ? WHERE id = ?",
            params![weighted_sum / weight_sum, user_id],
        )?;
        let stored: f64 = tx.query_row(
            "SELECT CAST(average_score AS DOUBLE) FROM users WHERE id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        debug!(user_id, corrections = rows, average = stored, "recomputed average");
        Ok(stored)
    }

    fn recompute_all_averages(&self) -> Result<RecomputeSummary> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(RECOMPUTE_ALL_SQL, [])? as u64;
        let users = Self::count(&tx, "SELECT COUNT(*) FROM users")?.max(0) as u64;
        tx.commit()?;

        debug!(updated, users, "recomputed all averages");
        Ok(RecomputeSummary {
            updated,
            unchanged: users.saturating_sub(updated),
        })
    }

    fn top_users(&self, limit: usize) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM users
             WHERE average_score IS NOT NULL
             ORDER BY average_score DESC, id ASC
             LIMIT ?",
            USER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params![limit as i64], Self::row_to_user)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(users)
    }

    // === Queries ===

    fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        validate_read_only_sql(sql)?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut result_rows = stmt.query([])?;

        let mut rows: Vec<Vec<serde_json::Value>> = Vec::new();
        let mut column_count = 0;

        while let Some(row) = result_rows.next()? {
            if rows.is_empty() {
                column_count = row.as_ref().column_count();
            }
            let row_values = (0..column_count)
                .map(|i| Self::get_column_value(row, i))
                .collect();
            rows.push(row_values);
        }

        // Release the borrow on stmt before asking it for column names
        drop(result_rows);

        if column_count == 0 {
            column_count = stmt.column_count();
        }
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            row_count,
        })
    }

    fn counts(&self) -> Result<StoreCounts> {
        let conn = self.lock()?;
        Ok(StoreCounts {
            users: Self::count(&conn, "SELECT COUNT(*) FROM users")?,
            users_scored: Self::count(
                &conn,
                "SELECT COUNT(*) FROM users WHERE average_score IS NOT NULL",
            )?,
            projects: Self::count(&conn, "SELECT COUNT(*) FROM projects")?,
            corrections: Self::count(&conn, "SELECT COUNT(*) FROM corrections")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Country;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    // ==================== Read-only validation ====================

    #[test]
    fn test_select_is_allowed() {
        assert!(validate_read_only_sql("SELECT * FROM users").is_ok());
        assert!(validate_read_only_sql(
            "WITH s AS (SELECT user_id, AVG(score) FROM corrections GROUP BY user_id) SELECT * FROM s"
        )
        .is_ok());
        assert!(validate_read_only_sql("SELECT 1; SELECT 2;").is_ok());
    }

    #[test]
    fn test_writes_are_rejected() {
        for sql in [
            "UPDATE users SET average_score = 100",
            "DELETE FROM corrections",
            "DROP TABLE users",
            "INSERT INTO projects (name) VALUES ('x')",
            "SELECT 1; DELETE FROM users",
        ] {
            let err = validate_read_only_sql(sql).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{} -> {:?}", sql, err);
        }
    }

    #[test]
    fn test_syntax_error_message_is_cleaned() {
        let err = validate_read_only_sql("SELECT * FROM usersLIMIT 10").unwrap_err();
        let msg = err.to_string();
        assert!(!msg.contains("sql parser error:"), "{}", msg);
        assert!(msg.contains("Expected"), "{}", msg);
    }

    #[test]
    fn test_empty_query_is_rejected() {
        assert!(validate_read_only_sql("   ").is_err());
        assert!(validate_read_only_sql("-- just a comment").is_err());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file \"x.duckdb\""));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table with name users does not exist"));
    }

    // ==================== Users ====================

    #[test]
    fn test_create_user_assigns_increasing_ids() {
        let repo = repo();
        let a = repo.create_user(&NewUser::new("a@example.com")).unwrap();
        let b = repo
            .create_user(
                &NewUser::new("b@example.com")
                    .with_name("Bee")
                    .with_country(Country::Co),
            )
            .unwrap();

        assert!(b.id > a.id);
        assert_eq!(b.name.as_deref(), Some("Bee"));
        assert_eq!(b.country, Some(Country::Co));
        assert_eq!(b.average_score, None);
    }

    #[test]
    fn test_duplicate_email_is_unique_violation() {
        let repo = repo();
        repo.create_user(&NewUser::new("dup@example.com")).unwrap();
        let err = repo.create_user(&NewUser::new("dup@example.com")).unwrap_err();
        assert!(err.is_constraint_violation(), "got {:?}", err);
        assert_eq!(repo.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_country_check_constraint_in_schema() {
        let repo = repo();
        let conn = repo.lock().unwrap();
        let err: Error = conn
            .execute(
                "INSERT INTO users (email, country) VALUES ('x@example.com', 'FR')",
                [],
            )
            .unwrap_err()
            .into();
        assert!(err.is_constraint_violation(), "got {:?}", err);
    }

    // ==================== Corrections ====================

    #[test]
    fn test_correction_requires_existing_user_and_project() {
        let repo = repo();
        let user = repo.create_user(&NewUser::new("a@example.com")).unwrap();
        let project = repo.add_project("C basics", 1.0).unwrap();

        let err = repo
            .add_correction(&Correction::new(user.id + 100, project.id, 50.0).unwrap())
            .unwrap_err();
        assert!(err.is_not_found());

        let err = repo
            .add_correction(&Correction::new(user.id, project.id + 100, 50.0).unwrap())
            .unwrap_err();
        assert!(err.is_not_found());

        repo.add_correction(&Correction::new(user.id, project.id, 50.0).unwrap())
            .unwrap();
        assert_eq!(repo.counts().unwrap().corrections, 1);
    }

    #[test]
    fn test_add_corrections_is_all_or_nothing() {
        let repo = repo();
        let user = repo.create_user(&NewUser::new("a@example.com")).unwrap();
        let project = repo.add_project("Shell", 1.0).unwrap();

        let batch = vec![
            Correction::new(user.id, project.id, 10.0).unwrap(),
            Correction::new(user.id, 999, 20.0).unwrap(),
        ];
        assert!(repo.add_corrections(&batch).is_err());
        assert_eq!(repo.counts().unwrap().corrections, 0);
    }

    // ==================== Recomputation ====================

    #[test]
    fn test_recompute_user_average() {
        let repo = repo();
        let user = repo.create_user(&NewUser::new("a@example.com")).unwrap();
        let light = repo.add_project("light", 1.0).unwrap();
        let heavy = repo.add_project("heavy", 2.0).unwrap();
        repo.add_correction(&Correction::new(user.id, light.id, 80.0).unwrap())
            .unwrap();
        repo.add_correction(&Correction::new(user.id, heavy.id, 95.0).unwrap())
            .unwrap();

        let avg = repo.recompute_user_average(user.id).unwrap();
        assert!((avg - 90.0).abs() < 1e-4);

        let stored = repo.get_user(user.id).unwrap().unwrap().average_score.unwrap();
        assert!((stored - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_recompute_unknown_user_is_not_found() {
        let repo = repo();
        assert!(repo.recompute_user_average(42).unwrap_err().is_not_found());
    }

    #[test]
    fn test_recompute_without_corrections_writes_nothing() {
        let repo = repo();
        let user = repo.create_user(&NewUser::new("a@example.com")).unwrap();
        assert!(repo.recompute_user_average(user.id).unwrap_err().is_no_data());
        assert_eq!(repo.get_user(user.id).unwrap().unwrap().average_score, None);
    }

    #[test]
    fn test_recompute_all_skips_users_without_data() {
        let repo = repo();
        let a = repo.create_user(&NewUser::new("a@example.com")).unwrap();
        let b = repo.create_user(&NewUser::new("b@example.com")).unwrap();
        let zero = repo.create_user(&NewUser::new("z@example.com")).unwrap();
        let project = repo.add_project("p", 3.0).unwrap();
        let ungraded = repo.add_project("ungraded", 0.0).unwrap();
        repo.add_correction(&Correction::new(a.id, project.id, 70.0).unwrap())
            .unwrap();
        repo.add_correction(&Correction::new(zero.id, ungraded.id, 70.0).unwrap())
            .unwrap();

        let summary = repo.recompute_all_averages().unwrap();
        assert_eq!(summary, RecomputeSummary { updated: 1, unchanged: 2 });
        let a = repo.get_user(a.id).unwrap().unwrap();
        assert!((a.average_score.unwrap() - 70.0).abs() < 1e-4);
        assert_eq!(repo.get_user(b.id).unwrap().unwrap().average_score, None);
        assert_eq!(repo.get_user(zero.id).unwrap().unwrap().average_score, None);
    }

    // ==================== Queries ====================

    #[test]
    fn test_execute_query_returns_columns_and_rows() {
        let repo = repo();
        repo.create_user(&NewUser::new("a@example.com").with_country(Country::Us))
            .unwrap();

        let result = repo
            .execute_query("SELECT email, country FROM users ORDER BY id")
            .unwrap();
        assert_eq!(result.columns, vec!["email", "country"]);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0][0], serde_json::json!("a@example.com"));
        assert_eq!(result.rows[0][1], serde_json::json!("US"));
    }

    #[test]
    fn test_execute_query_rejects_writes() {
        let repo = repo();
        let err = repo.execute_query("DELETE FROM users").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
