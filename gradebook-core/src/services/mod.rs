//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case.

mod course;
pub mod import;
pub mod logging;
pub mod migration;
mod query;
mod ranking;
mod score;
mod status;
mod user;

pub use course::CourseService;
pub use import::{ImportResult, ImportService, RowError};
pub use logging::{EntryPoint, KeyCount, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use query::QueryService;
pub use ranking::{RankedUser, RankingService};
pub use score::ScoreService;
pub use status::{StatusService, StatusSummary};
pub use user::UserService;
