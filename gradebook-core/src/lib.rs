//! Gradebook Core - weighted score aggregation over an embedded database
//!
//! The crate follows a hexagonal layout:
//!
//! - **domain**: entities (User, Project, Correction), weighted-average math, errors
//! - **ports**: the Repository trait
//! - **services**: use cases (score recomputation, users, ranking, queries, import)
//! - **adapters**: the DuckDB repository

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::Repository;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Correction, Country, NewUser, Project, RecomputeSummary, ScoreBreakdown, User};
pub use ports::QueryResult;
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for gradebook operations
///
/// Holds the configuration, the repository and every service wired to it.
pub struct GradebookContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub score_service: ScoreService,
    pub user_service: UserService,
    pub course_service: CourseService,
    pub ranking_service: RankingService,
    pub query_service: QueryService,
    pub import_service: ImportService,
    pub status_service: StatusService,
}

impl GradebookContext {
    /// Open the gradebook stored in `data_dir`, creating and migrating it as needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        config.validate()?;

        let db_path = data_dir.join(&config.database_file);
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);
        repository.ensure_schema()?;

        Ok(Self::with_repository(config, data_dir.to_path_buf(), repository))
    }

    /// Wire services around an already opened repository
    pub fn with_repository(
        config: Config,
        data_dir: PathBuf,
        repository: Arc<DuckDbRepository>,
    ) -> Self {
        let port: Arc<dyn Repository> = repository.clone();
        let db_path = repository.db_path().map(|p| p.display().to_string());

        Self {
            config,
            data_dir,
            score_service: ScoreService::new(Arc::clone(&port)),
            user_service: UserService::new(Arc::clone(&port)),
            course_service: CourseService::new(Arc::clone(&port)),
            ranking_service: RankingService::new(Arc::clone(&port)),
            query_service: QueryService::new(Arc::clone(&port)),
            import_service: ImportService::new(Arc::clone(&port)),
            status_service: StatusService::new(port, db_path),
            repository,
        }
    }
}
