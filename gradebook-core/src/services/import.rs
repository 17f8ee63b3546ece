//! Import service - CSV correction import
//!
//! Expected header: `user_id,project_id,score`. Every row is validated before
//! anything is written; valid rows are then inserted in one transaction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::result::Result;
use crate::domain::Correction;
use crate::ports::Repository;

#[derive(Debug, Deserialize)]
struct CorrectionRow {
    user_id: i64,
    project_id: i64,
    score: f64,
}

/// A row that could not be imported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based line number in the file, header included
    pub line: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub rows_read: usize,
    pub imported: usize,
    pub errors: Vec<RowError>,
    pub dry_run: bool,
}

pub struct ImportService {
    repository: Arc<dyn Repository>,
}

impl ImportService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Import corrections from a CSV file
    ///
    /// With `dry_run` the file is validated and nothing is written.
    pub fn import_corrections(&self, file_path: &Path, dry_run: bool) -> Result<ImportResult> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(file_path)?;

        let mut known_users: HashMap<i64, bool> = HashMap::new();
        let mut known_projects: HashMap<i64, bool> = HashMap::new();
        let mut valid = Vec::new();
        let mut errors = Vec::new();
        let mut rows_read = 0;

        for record in reader.deserialize::<CorrectionRow>() {
            rows_read += 1;
            // Header is line 1
            let line = rows_read as u64 + 1;

            let row = match record {
                Ok(row) => row,
                Err(e) => {
                    errors.push(RowError {
                        line: e.position().map(|p| p.line()).unwrap_or(line),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let correction = match Correction::new(row.user_id, row.project_id, row.score) {
                Ok(c) => c,
                Err(e) => {
                    errors.push(RowError { line, message: e.to_string() });
                    continue;
                }
            };

            if !self.user_known(&mut known_users, correction.user_id)? {
                errors.push(RowError {
                    line,
                    message: format!("unknown user {}", correction.user_id),
                });
                continue;
            }
            if !self.project_known(&mut known_projects, correction.project_id)? {
                errors.push(RowError {
                    line,
                    message: format!("unknown project {}", correction.project_id),
                });
                continue;
            }

            valid.push(correction);
        }

        let imported = if dry_run || valid.is_empty() {
            0
        } else {
            self.repository.add_corrections(&valid)?
        };

        if !errors.is_empty() {
            warn!(rejected = errors.len(), "some rows were not imported");
        }
        info!(rows_read, imported, dry_run, "correction import finished");

        Ok(ImportResult {
            rows_read,
            imported,
            errors,
            dry_run,
        })
    }

    fn user_known(&self, cache: &mut HashMap<i64, bool>, id: i64) -> Result<bool> {
        if let Some(known) = cache.get(&id) {
            return Ok(*known);
        }
        let known = self.repository.get_user(id)?.is_some();
        cache.insert(id, known);
        Ok(known)
    }

    fn project_known(&self, cache: &mut HashMap<i64, bool>, id: i64) -> Result<bool> {
        if let Some(known) = cache.get(&id) {
            return Ok(*known);
        }
        let known = self.repository.get_project(id)?.is_some();
        cache.insert(id, known);
        Ok(known)
    }
}
