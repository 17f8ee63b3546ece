//! Ranking service - users sorted by their cached average

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::User;
use crate::ports::Repository;

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUser {
    /// Competition rank: equal averages share a rank ("1224")
    pub rank: usize,
    pub user_id: i64,
    pub email: String,
    pub name: Option<String>,
    pub average_score: f64,
}

pub struct RankingService {
    repository: Arc<dyn Repository>,
}

impl RankingService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Best `limit` users by stored average; users never recomputed are left out
    pub fn top_users(&self, limit: usize) -> Result<Vec<RankedUser>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(rank(self.repository.top_users(limit)?))
    }
}

/// Assign competition ranks to users already sorted best first
fn rank(users: Vec<User>) -> Vec<RankedUser> {
    let mut ranked: Vec<RankedUser> = Vec::with_capacity(users.len());
    for (position, user) in users.into_iter().enumerate() {
        let Some(average_score) = user.average_score else {
            continue;
        };
        let rank = match ranked.last() {
            Some(prev) if prev.average_score == average_score => prev.rank,
            _ => position + 1,
        };
        ranked.push(RankedUser {
            rank,
            user_id: user.id,
            email: user.email,
            name: user.name,
            average_score,
        });
    }
    ranked
}
