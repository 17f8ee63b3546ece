//! Project domain model

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// An assignment whose corrections count towards a user's average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    /// Relative importance of the project, `1.0` unless set otherwise
    pub weight: f64,
}

impl Project {
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    /// Weights must be finite and non-negative
    pub fn validate_weight(weight: f64) -> Result<f64> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::validation(format!(
                "project weight must be a non-negative number (got {})",
                weight
            )));
        }
        Ok(weight)
    }
}
