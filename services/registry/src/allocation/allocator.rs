//! Identifier allocation.

use std::sync::Arc;

use protrack_id::{CounterKey, EvidenceYearId, ItemCode, LocationId};
use tracing::{debug, error};

use super::{AllocationError, AllocationGate};
use crate::db::CounterStore;

/// Hands out item codes for `(location, evidence year)` scopes.
///
/// For one key, successive allocations yield the contiguous values `1, 2, 3…`
/// rendered as `0001`, `0002`, `0003`…
#[derive(Clone)]
pub struct IdentifierAllocator {
    store: Arc<dyn CounterStore>,
    gate: Arc<AllocationGate>,
}

impl IdentifierAllocator {
    /// Create an allocator over a counter store and gate.
    pub fn new(store: Arc<dyn CounterStore>, gate: Arc<AllocationGate>) -> Self {
        Self { store, gate }
    }

    /// Allocates the next code for a location and evidence year.
    pub async fn allocate_identifier_for(
        &self,
        location_id: LocationId,
        evidence_year_id: EvidenceYearId,
    ) -> Result<ItemCode, AllocationError> {
        self.allocate(CounterKey {
            location_id,
            evidence_year_id,
        })
        .await
    }

    /// Allocates the next code for `key`.
    ///
    /// # Errors
    ///
    /// [`AllocationError::KeyExhausted`] once the counter passes `ZZZZ`; this
    /// is permanent for the key. Persistence and gate failures leave the
    /// counter where it was and may be retried.
    pub async fn allocate(&self, key: CounterKey) -> Result<ItemCode, AllocationError> {
        let store = Arc::clone(&self.store);
        let counter = self
            .gate
            .run_exclusive(key, move || async move {
                store
                    .increment_and_get(key)
                    .await
                    .map_err(|source| AllocationError::Persistence { key, source })
            })
            .await?;

        let code = ItemCode::encode(counter).map_err(|source| {
            error!(%key, counter, error = %source, "Item codes exhausted for key");
            AllocationError::KeyExhausted { key, source }
        })?;

        debug!(%key, counter, code = %code, "Allocated item code");
        Ok(code)
    }

    /// The last value allocated for `key`, if any.
    pub async fn current(&self, key: CounterKey) -> Result<Option<i64>, AllocationError> {
        self.store
            .current(key)
            .await
            .map_err(|source| AllocationError::Persistence { key, source })
    }

    /// The counter store, for health checks.
    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }
}
