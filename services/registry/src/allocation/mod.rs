//! Item code allocation.
//!
//! An allocation runs the counter store's read-increment-write sequence
//! inside the [`AllocationGate`] and renders the resulting value as an
//! [`ItemCode`](protrack_id::ItemCode):
//!
//! ```text
//! IdentifierAllocator -> AllocationGate::run_exclusive
//!                          -> CounterStore::increment_and_get
//!                     -> ItemCode::encode
//! ```
//!
//! The gate is in-process. Several registry instances sharing one database
//! rely on the row lock taken by the Postgres store instead.

mod allocator;
mod gate;

pub use allocator::IdentifierAllocator;
pub use gate::{AllocationGate, GateScope};

use std::time::Duration;

use protrack_id::{CodeError, CounterKey};
use thiserror::Error;

use crate::db::DbError;

/// Allocation failures.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The counter for this key has passed the last representable code.
    #[error("item codes exhausted for {key}: {source}")]
    KeyExhausted {
        key: CounterKey,
        #[source]
        source: CodeError,
    },

    /// The counter store failed; the counter was not advanced.
    #[error("failed to persist counter for {key}: {source}")]
    Persistence {
        key: CounterKey,
        #[source]
        source: DbError,
    },

    /// The gate could not be acquired in time.
    #[error("timed out after {waited:?} waiting for the allocation gate ({key})")]
    GateTimeout { key: CounterKey, waited: Duration },

    /// The critical section terminated abnormally.
    #[error("allocation for {key} aborted: {reason}")]
    Aborted { key: CounterKey, reason: String },
}

impl AllocationError {
    /// Returns true if repeating the whole allocation may succeed.
    ///
    /// Exhaustion is permanent for a key since counters never reset.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AllocationError::KeyExhausted { .. })
    }

    /// The counter key the failed allocation was for.
    pub fn key(&self) -> CounterKey {
        match self {
            AllocationError::KeyExhausted { key, .. }
            | AllocationError::Persistence { key, .. }
            | AllocationError::GateTimeout { key, .. }
            | AllocationError::Aborted { key, .. } => *key,
        }
    }
}
