//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a no data error
    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::NoData(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::ConstraintViolation(_))
    }

    /// Unique violations are the only constraint errors DuckDB words as "Duplicate key"
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Error::ConstraintViolation(msg) if msg.contains("Duplicate key"))
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("Constraint Error") {
            Error::ConstraintViolation(msg)
        } else {
            Error::Database(msg)
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_pick_variant() {
        assert!(Error::not_found("user 1").is_not_found());
        assert!(Error::no_data("user 1").is_no_data());
        assert!(Error::constraint("bad country").is_constraint_violation());
        assert!(!Error::validation("x").is_constraint_violation());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = Error::no_data("user 3 has no corrections");
        assert_eq!(err.to_string(), "No data: user 3 has no corrections");
    }

    #[test]
    fn test_unique_violation_detection() {
        let dup = Error::constraint(
            "Constraint Error: Duplicate key \"email: a@b.c\" violates unique constraint",
        );
        assert!(dup.is_unique_violation());
        assert!(!Error::constraint("CHECK constraint failed").is_unique_violation());
    }

    #[test]
    fn test_duckdb_constraint_error_maps_to_constraint_violation() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER CHECK (v > 0))")
            .unwrap();
        let err: Error = conn.execute("INSERT INTO t VALUES (-1)", []).unwrap_err().into();
        assert!(err.is_constraint_violation(), "got {:?}", err);

        let err: Error = conn.execute("SELECT * FROM missing_table", []).unwrap_err().into();
        assert!(matches!(err, Error::Database(_)), "got {:?}", err);
    }
}
