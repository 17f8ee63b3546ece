//! Status service - dataset summary

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::Result;
use crate::ports::Repository;

/// Status service for dataset summaries
pub struct StatusService {
    repository: Arc<dyn Repository>,
    db_path: Option<String>,
}

impl StatusService {
    pub fn new(repository: Arc<dyn Repository>, db_path: Option<String>) -> Self {
        Self { repository, db_path }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let counts = self.repository.counts()?;
        Ok(StatusSummary {
            total_users: counts.users,
            scored_users: counts.users_scored,
            unscored_users: counts.users - counts.users_scored,
            total_projects: counts.projects,
            total_corrections: counts.corrections,
            database: self.db_path.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_users: i64,
    /// Users with a computed average
    pub scored_users: i64,
    /// Users whose average was never computed
    pub unscored_users: i64,
    pub total_projects: i64,
    pub total_corrections: i64,
    pub database: Option<String>,
}
