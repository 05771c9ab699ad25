//! Mutual exclusion for counter updates.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use protrack_id::CounterKey;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use super::AllocationError;

/// Granularity of the allocation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateScope {
    /// One lock for the whole process. Unrelated keys serialize too.
    #[default]
    Global,
    /// One lock per counter key, created on first use.
    PerKey,
}

impl std::str::FromStr for GateScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "per_key" | "per-key" => Ok(Self::PerKey),
            other => Err(format!(
                "invalid gate scope '{other}': expected 'global' or 'per_key'"
            )),
        }
    }
}

impl std::fmt::Display for GateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::PerKey => f.write_str("per_key"),
        }
    }
}

/// Serializes critical sections that touch allocation counters.
///
/// Waiting for the gate is cancellable and bounded by `acquire_timeout`.
/// Once admitted, the section runs on its own task that owns the lock, so it
/// completes (or fails and rolls back) even if the caller stops waiting. The
/// lock is released when that task ends, whatever the outcome.
#[derive(Debug)]
pub struct AllocationGate {
    scope: GateScope,
    acquire_timeout: Duration,
    global: Arc<Mutex<()>>,
    per_key: StdMutex<HashMap<CounterKey, Arc<Mutex<()>>>>,
}

impl AllocationGate {
    /// Create a gate with the given scope and acquire timeout.
    pub fn new(scope: GateScope, acquire_timeout: Duration) -> Self {
        Self {
            scope,
            acquire_timeout,
            global: Arc::new(Mutex::new(())),
            per_key: StdMutex::new(HashMap::new()),
        }
    }

    /// Runs `action` while holding the exclusion for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::GateTimeout`] if the lock is not acquired
    /// in time, [`AllocationError::Aborted`] if the section panics, and
    /// otherwise whatever `action` returns.
    pub async fn run_exclusive<F, Fut, T>(
        &self,
        key: CounterKey,
        action: F,
    ) -> Result<T, AllocationError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AllocationError>> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.acquire(key).await?;

        let section = tokio::spawn(async move {
            let _guard = guard;
            action().await
        });

        section.await.map_err(|e| {
            warn!(%key, error = %e, "Allocation critical section aborted");
            AllocationError::Aborted {
                key,
                reason: e.to_string(),
            }
        })?
    }

    async fn acquire(&self, key: CounterKey) -> Result<OwnedMutexGuard<()>, AllocationError> {
        let lock = match self.scope {
            GateScope::Global => Arc::clone(&self.global),
            GateScope::PerKey => self.lock_for(key),
        };

        let started = Instant::now();
        let guard = tokio::time::timeout(self.acquire_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                warn!(
                    %key,
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "Allocation gate busy"
                );
                AllocationError::GateTimeout {
                    key,
                    waited: self.acquire_timeout,
                }
            })?;

        debug!(
            %key,
            scope = %self.scope,
            waited_us = started.elapsed().as_micros() as u64,
            "Allocation gate acquired"
        );
        Ok(guard)
    }

    fn lock_for(&self, key: CounterKey) -> Arc<Mutex<()>> {
        // The table is only touched for map lookups; a poisoned lock still
        // holds a consistent map.
        let mut table = self.per_key.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(key).or_default())
    }
}

impl Default for AllocationGate {
    fn default() -> Self {
        Self::new(GateScope::Global, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rstest::rstest;
    use tokio::sync::oneshot;

    use super::*;

    const KEY_A: CounterKey = CounterKey::new(1, 2020);
    const KEY_B: CounterKey = CounterKey::new(2, 2020);

    /// Holds the gate for `key` until the returned sender fires.
    async fn hold(gate: &Arc<AllocationGate>, key: CounterKey) -> oneshot::Sender<()> {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (entered_tx, entered_rx) = oneshot::channel::<()>();
        let gate = Arc::clone(gate);
        tokio::spawn(async move {
            gate.run_exclusive(key, move || async move {
                let _ = entered_tx.send(());
                let _ = release_rx.await;
                Ok(())
            })
            .await
        });
        entered_rx.await.unwrap();
        release_tx
    }

    #[rstest]
    #[case(GateScope::Global)]
    #[case(GateScope::PerKey)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sections_for_one_key_never_overlap(#[case] scope: GateScope) {
        let gate = Arc::new(AllocationGate::new(scope, Duration::from_secs(10)));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                tokio::spawn(async move {
                    gate.run_exclusive(KEY_A, move || async move {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_releases_gate() {
        let gate = AllocationGate::new(GateScope::Global, Duration::from_millis(200));

        let result: Result<(), _> = gate
            .run_exclusive(KEY_A, || async {
                Err(AllocationError::Aborted {
                    key: KEY_A,
                    reason: "boom".to_string(),
                })
            })
            .await;
        assert!(result.is_err());

        let value = gate.run_exclusive(KEY_A, || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    async fn exploding_section() -> Result<(), AllocationError> {
        panic!("section failed")
    }

    #[tokio::test]
    async fn test_panic_releases_gate() {
        let gate = AllocationGate::new(GateScope::Global, Duration::from_millis(200));

        let result = gate.run_exclusive(KEY_A, exploding_section).await;
        assert!(matches!(result, Err(AllocationError::Aborted { .. })));

        let value = gate.run_exclusive(KEY_A, || async { Ok(1) }).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_global_scope_blocks_unrelated_keys() {
        let gate = Arc::new(AllocationGate::new(
            GateScope::Global,
            Duration::from_millis(50),
        ));
        let release = hold(&gate, KEY_A).await;

        let result = gate.run_exclusive(KEY_B, || async { Ok(()) }).await;
        match result {
            Err(AllocationError::GateTimeout { key, waited }) => {
                assert_eq!(key, KEY_B);
                assert_eq!(waited, Duration::from_millis(50));
            }
            other => panic!("expected gate timeout, got {other:?}"),
        }

        release.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_per_key_scope_admits_unrelated_keys() {
        let gate = Arc::new(AllocationGate::new(
            GateScope::PerKey,
            Duration::from_millis(50),
        ));
        let release = hold(&gate, KEY_A).await;

        gate.run_exclusive(KEY_B, || async { Ok(()) }).await.unwrap();

        let same_key = gate.run_exclusive(KEY_A, || async { Ok(()) }).await;
        assert!(matches!(same_key, Err(AllocationError::GateTimeout { .. })));

        release.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cut_section_short() {
        let gate = Arc::new(AllocationGate::new(
            GateScope::Global,
            Duration::from_secs(5),
        ));
        let finished = Arc::new(AtomicUsize::new(0));
        let (entered_tx, entered_rx) = oneshot::channel::<()>();

        let caller = tokio::spawn({
            let gate = Arc::clone(&gate);
            let finished = Arc::clone(&finished);
            async move {
                gate.run_exclusive(KEY_A, move || async move {
                    let _ = entered_tx.send(());
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }
        });

        entered_rx.await.unwrap();
        caller.abort();

        // The next section is only admitted after the first one ran to completion.
        gate.run_exclusive(KEY_A, || async { Ok(()) }).await.unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[case("global", GateScope::Global)]
    #[case("per_key", GateScope::PerKey)]
    #[case("PER-KEY", GateScope::PerKey)]
    fn test_scope_parse(#[case] input: &str, #[case] expected: GateScope) {
        assert_eq!(input.parse::<GateScope>().unwrap(), expected);
    }

    #[test]
    fn test_scope_parse_invalid() {
        assert!("sharded".parse::<GateScope>().is_err());
    }
}
