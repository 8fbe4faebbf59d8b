//! Approval counter storage.
//!
//! Counters live for the lifetime of the process and are never removed.
//! Every read-modify-write runs under a single lock acquisition so two
//! concurrent approvals for the same merge request can never observe the
//! same count.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tokio::sync::Mutex;

/// Storage for per-merge-request approval counters.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Add one approval for `target_id` and return the count after the increment.
    async fn record_approval(&self, target_id: i64) -> u64;

    /// Current approval count for `target_id` (0 if never seen).
    async fn approval_count(&self, target_id: i64) -> u64;

    /// Flag that a merge was attempted for `target_id`.
    ///
    /// Returns `true` only for the first caller; later calls return `false`.
    async fn mark_merge_attempted(&self, target_id: i64) -> bool;

    /// Number of distinct merge requests seen so far.
    async fn tracked_targets(&self) -> usize;
}

/// Per-target counter state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TargetState {
    approvals: u64,
    merge_attempted: bool,
}

/// Map of target → state, guarded as a unit.
#[derive(Debug, Default)]
struct CounterMap {
    targets: HashMap<i64, TargetState>,
}

impl CounterMap {
    fn record_approval(&mut self, target_id: i64) -> u64 {
        let state = self.targets.entry(target_id).or_default();
        state.approvals += 1;
        state.approvals
    }

    fn approval_count(&self, target_id: i64) -> u64 {
        self.targets
            .get(&target_id)
            .map(|s| s.approvals)
            .unwrap_or(0)
    }

    fn mark_merge_attempted(&mut self, target_id: i64) -> bool {
        let state = self.targets.entry(target_id).or_default();
        !std::mem::replace(&mut state.merge_attempted, true)
    }
}

/// Single-lock store: one mutex covers the whole map.
#[derive(Debug, Default)]
pub struct InMemoryApprovalStore {
    inner: Mutex<CounterMap>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn record_approval(&self, target_id: i64) -> u64 {
        self.inner.lock().await.record_approval(target_id)
    }

    async fn approval_count(&self, target_id: i64) -> u64 {
        self.inner.lock().await.approval_count(target_id)
    }

    async fn mark_merge_attempted(&self, target_id: i64) -> bool {
        self.inner.lock().await.mark_merge_attempted(target_id)
    }

    async fn tracked_targets(&self) -> usize {
        self.inner.lock().await.targets.len()
    }
}

/// Store partitioned into independently locked shards by target hash.
///
/// A given target always maps to the same shard, so per-target updates stay
/// serialized while different targets proceed in parallel.
#[derive(Debug)]
pub struct ShardedApprovalStore {
    shards: Vec<Mutex<CounterMap>>,
}

impl ShardedApprovalStore {
    /// Create a store with `shard_count` shards (at least one).
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(CounterMap::default()))
            .collect();
        Self { shards }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, target_id: i64) -> &Mutex<CounterMap> {
        let mut hasher = DefaultHasher::new();
        target_id.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

#[async_trait]
impl ApprovalStore for ShardedApprovalStore {
    async fn record_approval(&self, target_id: i64) -> u64 {
        self.shard_for(target_id)
            .lock()
            .await
            .record_approval(target_id)
    }

    async fn approval_count(&self, target_id: i64) -> u64 {
        self.shard_for(target_id)
            .lock()
            .await
            .approval_count(target_id)
    }

    async fn mark_merge_attempted(&self, target_id: i64) -> bool {
        self.shard_for(target_id)
            .lock()
            .await
            .mark_merge_attempted(target_id)
    }

    async fn tracked_targets(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.targets.len();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_approval_inserts_count_of_one() {
        let store = InMemoryApprovalStore::new();
        assert_eq!(store.approval_count(42).await, 0);
        assert_eq!(store.record_approval(42).await, 1);
        assert_eq!(store.record_approval(42).await, 2);
        assert_eq!(store.record_approval(7).await, 1);
        assert_eq!(store.approval_count(42).await, 2);
        assert_eq!(store.tracked_targets().await, 2);
    }

    #[tokio::test]
    async fn merge_attempt_marker_is_set_once() {
        let store = InMemoryApprovalStore::new();
        assert!(store.mark_merge_attempted(1).await);
        assert!(!store.mark_merge_attempted(1).await);
        assert!(store.mark_merge_attempted(2).await);
        // Marking does not touch the counter.
        assert_eq!(store.approval_count(1).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_are_not_lost() {
        let store = Arc::new(InMemoryApprovalStore::new());
        let handles: Vec<_> = (0..200)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.record_approval(42).await })
            })
            .collect();

        let mut seen: Vec<u64> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        seen.sort_unstable();

        // Every caller observed a distinct post-increment value.
        assert_eq!(seen, (1..=200).collect::<Vec<u64>>());
        assert_eq!(store.approval_count(42).await, 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sharded_store_keeps_per_target_counts() {
        let store = Arc::new(ShardedApprovalStore::new(8));
        assert_eq!(store.shard_count(), 8);

        let handles: Vec<_> = (0..400)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.record_approval(i % 4).await })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap();
        }

        for target in 0..4 {
            assert_eq!(store.approval_count(target).await, 100);
        }
        assert_eq!(store.tracked_targets().await, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sharded_merge_marker_is_claimed_once_per_target() {
        let store = Arc::new(ShardedApprovalStore::new(4));
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { (i % 2, store.mark_merge_attempted(i % 2).await) })
            })
            .collect();

        let mut claims = [0; 2];
        for result in futures::future::join_all(handles).await {
            let (target, claimed) = result.unwrap();
            if claimed {
                claims[target as usize] += 1;
            }
        }

        assert_eq!(claims, [1, 1]);
        assert!(!store.mark_merge_attempted(0).await);
        assert_eq!(store.approval_count(0).await, 0);
    }

    #[test]
    fn sharded_store_has_at_least_one_shard() {
        assert_eq!(ShardedApprovalStore::new(0).shard_count(), 1);
    }
}
