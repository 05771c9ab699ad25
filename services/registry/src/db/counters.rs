//! Allocation counter storage.
//!
//! One row per `(location_id, evidence_year_id)` holds the last value handed
//! out for that scope. Rows are created lazily by the first allocation and
//! never deleted.
//!
//! The read-increment-write sequence is not atomic on its own. Callers must
//! hold the allocation gate while calling [`CounterStore::increment_and_get`].

use async_trait::async_trait;
use protrack_id::CounterKey;
use sqlx::postgres::PgPool;
use tracing::debug;

use super::DbError;

/// Value stored for a key on its first allocation.
pub const FIRST_COUNTER_VALUE: i64 = 1;

/// Persistent per-key counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Loads the counter for `key`, creating it with [`FIRST_COUNTER_VALUE`]
    /// or incrementing it by one, and returns the value once it is durable.
    ///
    /// On error the stored value is unchanged.
    async fn increment_and_get(&self, key: CounterKey) -> Result<i64, DbError>;

    /// Returns the last allocated value for `key` without modifying it.
    async fn current(&self, key: CounterKey) -> Result<Option<i64>, DbError>;

    /// Checks that the backing store is reachable.
    async fn health_check(&self) -> Result<(), DbError>;
}

/// Postgres-backed counter store.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    /// Create a new counter store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn increment_and_get(&self, key: CounterKey) -> Result<i64, DbError> {
        let location_id = key.location_id.value();
        let evidence_year_id = key.evidence_year_id.value();

        // Dropping `tx` without commit rolls the write back.
        let mut tx = self.pool.begin().await.map_err(DbError::Transaction)?;

        let current = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT value
            FROM item_counters
            WHERE location_id = $1 AND evidence_year_id = $2
            FOR UPDATE
            "#,
        )
        .bind(location_id)
        .bind(evidence_year_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        let next = match current {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO item_counters (location_id, evidence_year_id, value)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(location_id)
                .bind(evidence_year_id)
                .bind(FIRST_COUNTER_VALUE)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e {
                        if db_err.code().as_deref() == Some("23505") {
                            return DbError::CounterConflict {
                                location_id,
                                evidence_year_id,
                            };
                        }
                    }
                    DbError::Query(e)
                })?;
                FIRST_COUNTER_VALUE
            }
            Some(value) => {
                let next = value + 1;
                sqlx::query(
                    r#"
                    UPDATE item_counters
                    SET value = $3, updated_at = now()
                    WHERE location_id = $1 AND evidence_year_id = $2
                    "#,
                )
                .bind(location_id)
                .bind(evidence_year_id)
                .bind(next)
                .execute(&mut *tx)
                .await
                .map_err(DbError::Query)?;
                next
            }
        };

        tx.commit().await.map_err(DbError::Transaction)?;

        debug!(location_id, evidence_year_id, counter = next, "Counter advanced");
        Ok(next)
    }

    async fn current(&self, key: CounterKey) -> Result<Option<i64>, DbError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT value
            FROM item_counters
            WHERE location_id = $1 AND evidence_year_id = $2
            "#,
        )
        .bind(key.location_id.value())
        .bind(key.evidence_year_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }
}
