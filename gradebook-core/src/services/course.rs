//! Course service - projects and their corrections

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Correction, Project, ScoreLine};
use crate::ports::Repository;

pub struct CourseService {
    repository: Arc<dyn Repository>,
}

impl CourseService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub fn add_project(&self, name: &str, weight: f64) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("project name is required"));
        }
        let weight = Project::validate_weight(weight)?;
        self.repository.add_project(name, weight)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.repository.list_projects()
    }

    /// Record a graded submission; the stored average is not touched
    pub fn add_correction(&self, user_id: i64, project_id: i64, score: f64) -> Result<Correction> {
        let correction = Correction::new(user_id, project_id, score)?;
        self.repository.add_correction(&correction)?;
        Ok(correction)
    }

    pub fn list_corrections(&self, user_id: i64) -> Result<Vec<ScoreLine>> {
        if self.repository.get_user(user_id)?.is_none() {
            return Err(Error::not_found(format!("user {}", user_id)));
        }
        self.repository.score_lines_for_user(user_id)
    }
}
