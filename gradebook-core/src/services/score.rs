//! Score service - weighted average aggregation
//!
//! Recomputes the cached `users.average_score` from corrections joined with
//! project weights: `Σ(score·weight) / Σ(weight)`.

use std::sync::Arc;

use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::{RecomputeSummary, ScoreBreakdown};
use crate::ports::Repository;

/// Score aggregator
pub struct ScoreService {
    repository: Arc<dyn Repository>,
}

impl ScoreService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Recompute and store the weighted average of one user
    ///
    /// Returns the stored value. Fails with `NotFound` for an unknown user and
    /// with `NoData` when the user has nothing to average; the stored value is
    /// untouched in both cases.
    pub fn recompute_for_user(&self, user_id: i64) -> Result<f64> {
        let average = self.repository.recompute_user_average(user_id)?;
        info!(user_id, average, "average score recomputed");
        Ok(average)
    }

    /// Recompute every user that has corrections in one transaction
    pub fn recompute_for_all_users(&self) -> Result<RecomputeSummary> {
        let summary = self.repository.recompute_all_averages()?;
        info!(updated = summary.updated, unchanged = summary.unchanged, "bulk recompute done");
        Ok(summary)
    }

    /// Show what the average of a user would be, without storing it
    pub fn preview_for_user(&self, user_id: i64) -> Result<ScoreBreakdown> {
        if self.repository.get_user(user_id)?.is_none() {
            return Err(Error::not_found(format!("user {}", user_id)));
        }
        let breakdown = ScoreBreakdown::new(user_id, self.repository.score_lines_for_user(user_id)?);
        if breakdown.average.is_none() {
            return Err(Error::no_data(format!(
                "user {} has no weighted corrections",
                user_id
            )));
        }
        Ok(breakdown)
    }
}
