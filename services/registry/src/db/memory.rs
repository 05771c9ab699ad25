//! In-process counter store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use protrack_id::CounterKey;
use tokio::sync::RwLock;

use super::{CounterStore, DbError, FIRST_COUNTER_VALUE};

/// Counter store backed by a map.
///
/// Performs the same load, then store sequence as the Postgres store, with a
/// yield point in between. Concurrent callers that bypass the allocation gate
/// will lose updates exactly as they would against the database.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: RwLock<HashMap<CounterKey, i64>>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a pre-existing counter value.
    pub fn with_counter(key: CounterKey, value: i64) -> Self {
        Self {
            counters: RwLock::new(HashMap::from([(key, value)])),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_and_get(&self, key: CounterKey) -> Result<i64, DbError> {
        let loaded = self.counters.read().await.get(&key).copied();

        tokio::task::yield_now().await;

        let next = match loaded {
            None => FIRST_COUNTER_VALUE,
            Some(value) => value + 1,
        };
        self.counters.write().await.insert(key, next);
        Ok(next)
    }

    async fn current(&self, key: CounterKey) -> Result<Option<i64>, DbError> {
        Ok(self.counters.read().await.get(&key).copied())
    }

    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_first_allocation_creates_counter() {
        let store = MemoryCounterStore::new();
        let key = CounterKey::new(1, 2020);

        assert_eq!(store.current(key).await.unwrap(), None);
        assert_eq!(store.increment_and_get(key).await.unwrap(), 1);
        assert_eq!(store.current(key).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_increments_existing_counter() {
        let key = CounterKey::new(4, 2022);
        let store = MemoryCounterStore::with_counter(key, 41);

        assert_eq!(store.increment_and_get(key).await.unwrap(), 42);
        assert_eq!(store.increment_and_get(key).await.unwrap(), 43);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryCounterStore::new();
        let a = CounterKey::new(1, 2020);
        let b = CounterKey::new(1, 2021);

        store.increment_and_get(a).await.unwrap();
        store.increment_and_get(a).await.unwrap();

        assert_eq!(store.increment_and_get(b).await.unwrap(), 1);
        assert_eq!(store.current(a).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_unserialized_callers_lose_updates() {
        let store = Arc::new(MemoryCounterStore::new());
        let key = CounterKey::new(9, 2020);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.increment_and_get(key).await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            seen.insert(handle.await.unwrap());
        }

        assert!(seen.len() < 20, "expected duplicate values, got {seen:?}");
    }
}
