//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod correction;
mod project;
pub mod result;
pub mod score;
mod user;

pub use correction::Correction;
pub use project::Project;
pub use score::{weighted_average, RecomputeSummary, ScoreBreakdown, ScoreLine};
pub use user::{Country, NewUser, User};
