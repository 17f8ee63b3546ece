//! Query service - ad-hoc read-only SQL

use std::sync::Arc;

use crate::domain::result::Result;
use crate::ports::{QueryResult, Repository};

pub struct QueryService {
    repository: Arc<dyn Repository>,
}

impl QueryService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Execute a SQL query; write statements are rejected before reaching the engine
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.repository.execute_query(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::{Correction, NewUser};

    #[test]
    fn test_weighted_average_report() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let user = repo.create_user(&NewUser::new("a@example.com")).unwrap();
        let p1 = repo.add_project("one", 1.0).unwrap();
        let p2 = repo.add_project("two", 2.0).unwrap();
        repo.add_correction(&Correction::new(user.id, p1.id, 80.0).unwrap()).unwrap();
        repo.add_correction(&Correction::new(user.id, p2.id, 95.0).unwrap()).unwrap();

        let service = QueryService::new(repo);
        let result = service
            .execute(
                "SELECT c.user_id, SUM(c.score * p.weight) / SUM(p.weight) AS avg
                 FROM corrections c JOIN projects p ON p.id = c.project_id
                 GROUP BY c.user_id",
            )
            .unwrap();

        assert_eq!(result.columns, vec!["user_id", "avg"]);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0][1], serde_json::json!(90.0));
    }

    #[test]
    fn test_empty_result_keeps_columns() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let result = QueryService::new(repo)
            .execute("SELECT id, email FROM users")
            .unwrap();
        assert_eq!(result.row_count, 0);
        assert_eq!(result.columns, vec!["id", "email"]);
    }
}
