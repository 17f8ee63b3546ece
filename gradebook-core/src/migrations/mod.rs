//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content) and they are applied in
//! the order listed.

/// All migrations, embedded at compile time.
///
/// When adding a new migration, create `NNN_description.sql` next to this
/// file and append an entry here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ("002_score_indexes.sql", include_str!("002_score_indexes.sql")),
];
