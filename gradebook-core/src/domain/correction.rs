//! Correction domain model

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A graded submission of a project by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub user_id: i64,
    pub project_id: i64,
    pub score: f64,
}

impl Correction {
    pub fn new(user_id: i64, project_id: i64, score: f64) -> Result<Self> {
        if !score.is_finite() {
            return Err(Error::validation(format!(
                "score must be a finite number (got {})",
                score
            )));
        }
        Ok(Self {
            user_id,
            project_id,
            score,
        })
    }
}
