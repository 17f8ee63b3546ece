//! Weighted average math

use serde::Serialize;

/// Weighted mean of `(score, weight)` pairs: `Σ(score·weight) / Σ(weight)`
///
/// Returns `None` when there are no pairs or the weights sum to zero, since
/// the mean is undefined in both cases.
pub fn weighted_average(pairs: &[(f64, f64)]) -> Option<f64> {
    let (weighted_sum, weight_sum) = pairs
        .iter()
        .fold((0.0_f64, 0.0_f64), |(ws, w), (score, weight)| {
            (ws + score * weight, w + weight)
        });

    if pairs.is_empty() || weight_sum == 0.0 {
        None
    } else {
        Some(weighted_sum / weight_sum)
    }
}

/// Outcome of a bulk recomputation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    /// Users whose average was rewritten
    pub updated: u64,
    /// Users left as they were (no weighted corrections)
    pub unchanged: u64,
}

/// One correction as it enters the average
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreLine {
    pub project_id: i64,
    pub project_name: String,
    pub score: f64,
    pub weight: f64,
}

/// Read-only view of how a user's average is made up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub user_id: i64,
    pub lines: Vec<ScoreLine>,
    pub average: Option<f64>,
}

impl ScoreBreakdown {
    pub fn new(user_id: i64, lines: Vec<ScoreLine>) -> Self {
        let pairs: Vec<(f64, f64)> = lines.iter().map(|l| (l.score, l.weight)).collect();
        let average = weighted_average(&pairs);
        Self {
            user_id,
            lines,
            average,
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.lines.iter().map(|l| l.weight).sum()
    }
}
