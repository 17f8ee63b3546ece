//! Repository port - database abstraction

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{Correction, NewUser, Project, RecomputeSummary, ScoreLine, User};

/// Database repository abstraction
///
/// Implementations own the connection and are responsible for making each
/// recomputation atomic: the read of corrections/projects and the write of
/// `users.average_score` happen in one transaction.
pub trait Repository: Send + Sync {
    // === Schema ===

    /// Run any pending migrations
    fn ensure_schema(&self) -> Result<()>;

    // === Users ===

    /// Insert a user; duplicate emails and unknown countries are constraint violations
    fn create_user(&self, user: &NewUser) -> Result<User>;

    fn get_user(&self, id: i64) -> Result<Option<User>>;

    fn list_users(&self) -> Result<Vec<User>>;

    // === Projects and corrections ===

    fn add_project(&self, name: &str, weight: f64) -> Result<Project>;

    fn get_project(&self, id: i64) -> Result<Option<Project>>;

    fn list_projects(&self) -> Result<Vec<Project>>;

    /// Insert a correction; the user and the project must exist
    fn add_correction(&self, correction: &Correction) -> Result<()>;

    /// Insert many corrections in one transaction (all or nothing)
    fn add_corrections(&self, corrections: &[Correction]) -> Result<usize>;

    /// Corrections of a user joined with their project's name and weight
    fn score_lines_for_user(&self, user_id: i64) -> Result<Vec<ScoreLine>>;

    // === Score aggregation ===

    /// Recompute and store one user's weighted average, returning the stored value
    ///
    /// Fails with `NotFound` for an unknown user and `NoData` when the user has
    /// no corrections (or only zero-weight ones); nothing is written then.
    fn recompute_user_average(&self, user_id: i64) -> Result<f64>;

    /// Recompute every user that has corrections
    ///
    /// Both counts of the summary are taken in the same transaction as the update.
    fn recompute_all_averages(&self) -> Result<RecomputeSummary>;

    /// Users with a computed average, best first
    fn top_users(&self, limit: usize) -> Result<Vec<User>>;

    // === Queries ===

    /// Execute a read-only SQL query
    fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    fn counts(&self) -> Result<StoreCounts>;
}

/// Result of a SQL query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

/// Row counts used by the status summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub users: i64,
    pub users_scored: i64,
    pub projects: i64,
    pub corrections: i64,
}
