#![forbid(unsafe_code)]

//! Run at most one in-flight async operation per key.
//!
//! Concurrent callers for the same key join the stored shared future and
//! observe its single outcome. The map entry is removed when the operation
//! settles (success or failure), but only if the stored entry is still the
//! one that operation inserted; a newer operation installed under the same
//! key while the old one drains must not be cleared by the old one's
//! settlement.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use parking_lot::Mutex;

use crate::{StreamError, StreamResult};

/// Handle to a coalesced in-flight operation.
pub type SharedOp<T> = Shared<BoxFuture<'static, StreamResult<T>>>;

#[derive(Clone)]
struct Entry<T: Clone> {
    /// Distinguishes this operation from any later one stored under the same
    /// key; settlement removes the entry only when the id still matches.
    id: u64,
    op: SharedOp<T>,
}

/// A keyed map of in-flight operations.
///
/// Process-local and never persisted; state resets on process restart.
#[derive(Clone)]
pub struct InflightMap<T: Clone + Send + Sync + 'static> {
    entries: Arc<Mutex<HashMap<String, Entry<T>>>>,
    next_id: Arc<AtomicU64>,
}

impl<T: Clone + Send + Sync + 'static> Default for InflightMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> InflightMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether an operation is currently stored for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Join the operation stored for `key`, if any, without starting one.
    #[must_use]
    pub fn join_existing(&self, key: &str) -> Option<SharedOp<T>> {
        self.entries.lock().get(key).map(|e| e.op.clone())
    }

    /// Insert-or-join: returns the stored operation for `key` when present,
    /// otherwise wraps `factory()`'s future with the settle-time cleanup and
    /// stores it. The returned handle makes progress only while awaited.
    pub fn start<F, Fut>(&self, key: &str, factory: F) -> SharedOp<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StreamResult<T>> + Send + 'static,
    {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(key) {
            return existing.op.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let map = Arc::clone(&self.entries);
        let owned_key = key.to_string();
        let inner = factory();
        let op: SharedOp<T> = async move {
            let out = inner.await;
            let mut entries = map.lock();
            if entries.get(&owned_key).is_some_and(|e| e.id == id) {
                entries.remove(&owned_key);
            }
            out
        }
        .boxed()
        .shared();

        entries.insert(key.to_string(), Entry { id, op: op.clone() });
        op
    }

    /// Run `factory()` under `key`, or join the already-running operation.
    pub async fn coalesce<F, Fut>(&self, key: &str, factory: F) -> StreamResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StreamResult<T>> + Send + 'static,
    {
        self.start(key, factory).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use super::*;

    fn counting_op(
        calls: Arc<AtomicU32>,
        result: StreamResult<u32>,
    ) -> impl Future<Output = StreamResult<u32>> + Send + 'static {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            result
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let map = InflightMap::<u32>::new();
        let calls = Arc::new(AtomicU32::new(0));

        let (a, b) = tokio::join!(
            map.coalesce("k", {
                let calls = Arc::clone(&calls);
                move || counting_op(calls, Ok(7))
            }),
            map.coalesce("k", {
                let calls = Arc::clone(&calls);
                move || counting_op(calls, Ok(7))
            }),
        );

        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sequential_callers_each_execute() {
        let map = InflightMap::<u32>::new();
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            map.coalesce("k", move || counting_op(calls, Ok(1)))
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn entry_is_removed_after_settlement() {
        let map = InflightMap::<u32>::new();
        let calls = Arc::new(AtomicU32::new(0));

        map.coalesce("k", {
            let calls = Arc::clone(&calls);
            move || counting_op(calls, Ok(1))
        })
        .await
        .unwrap();

        assert!(!map.contains("k"));
    }

    #[tokio::test]
    async fn all_joiners_observe_the_single_failure() {
        let map = InflightMap::<u32>::new();
        let calls = Arc::new(AtomicU32::new(0));
        let failure = StreamError::AssetBuildFailed {
            message: "encoder crashed".into(),
        };

        let (a, b) = tokio::join!(
            map.coalesce("k", {
                let calls = Arc::clone(&calls);
                let failure = failure.clone();
                move || counting_op(calls, Err(failure))
            }),
            map.coalesce("k", {
                let calls = Arc::clone(&calls);
                let failure = failure.clone();
                move || counting_op(calls, Err(failure))
            }),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(a, Err(StreamError::AssetBuildFailed { .. })));
        assert!(matches!(b, Err(StreamError::AssetBuildFailed { .. })));
        assert!(!map.contains("k"));
    }

    #[tokio::test]
    async fn settlement_does_not_clear_a_newer_entry() {
        let map = InflightMap::<u32>::new();

        // First operation, driven to completion while a second one has
        // already replaced the entry (simulated by clearing and restarting).
        let first = map.start("k", || async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(1)
        });

        // Simulate the stale-settlement race: drop the old entry and install
        // a fresh one under the same key before the first settles.
        map.entries.lock().remove("k");
        let second = map.start("k", || async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok(2)
        });

        assert_eq!(first.await.unwrap(), 1);
        // The first operation's settlement must not have evicted the second.
        assert!(map.contains("k"));
        assert_eq!(second.await.unwrap(), 2);
        assert!(!map.contains("k"));
    }
}
