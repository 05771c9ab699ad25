//! Database error types.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to begin or commit a transaction.
    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// The configured migrations directory could not be read.
    #[error("cannot load migrations from {dir} (set PROTRACK_MIGRATIONS_DIR): {source}")]
    MigrationDirNotFound {
        dir: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// Two writers created the same counter row concurrently.
    #[error("counter for location {location_id}, evidence year {evidence_year_id} was created concurrently")]
    CounterConflict {
        location_id: i32,
        evidence_year_id: i32,
    },
}
