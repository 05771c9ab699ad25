//! Counter persistence.
//!
//! `Database` owns the Postgres pool every allocation draws a connection
//! from, and knows where the registry's migrations live. Counter access
//! goes through [`CounterStore`]; [`MemoryCounterStore`] stands in when no
//! database is configured.

mod counters;
mod error;
mod memory;

pub use counters::{CounterStore, PgCounterStore, FIRST_COUNTER_VALUE};
pub use error::DbError;
pub use memory::MemoryCounterStore;

use std::path::PathBuf;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Pool and migration settings for the counter database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,

    /// Upper bound on concurrent counter transactions.
    pub max_connections: u32,
    pub min_connections: u32,

    /// How long an allocation waits for a pooled connection before failing
    /// with a retryable persistence error.
    pub acquire_timeout: Duration,

    /// Directory holding `item_counters` migrations.
    pub migrations_dir: PathBuf,
}

impl DbConfig {
    /// Migrations shipped with this crate.
    pub fn bundled_migrations_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/protrack".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            migrations_dir: Self::bundled_migrations_dir(),
        }
    }
}

/// Handle on the counter database.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    migrations_dir: PathBuf,
}

impl Database {
    /// Open the pool and check that the database answers.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "Connecting to counter database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        Ok(Self {
            pool,
            migrations_dir: config.migrations_dir.clone(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations from the configured directory.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        let dir = &self.migrations_dir;
        let migrator = Migrator::new(dir.clone())
            .await
            .map_err(|source| DbError::MigrationDirNotFound {
                dir: dir.display().to_string(),
                source,
            })?;

        info!(
            migrations_dir = %dir.display(),
            migrations = migrator.iter().count(),
            "Applying counter migrations"
        );
        migrator.run(&self.pool).await.map_err(DbError::Migration)?;

        Ok(())
    }

    pub fn counter_store(&self) -> PgCounterStore {
        PgCounterStore::new(self.pool.clone())
    }
}
