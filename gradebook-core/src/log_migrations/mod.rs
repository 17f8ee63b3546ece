//! Event log migrations - embedded SQL files
//!
//! The event log lives in its own database file (logs.duckdb) so it can be
//! cleared or exported without touching gradebook data.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
