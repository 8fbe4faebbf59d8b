//! Approval quorum tracking.
//!
//! Wraps an [`ApprovalStore`] and decides when a merge request has collected
//! enough approvals to be merged.

use crate::models::MergeStatus;
use crate::services::approval_store::ApprovalStore;
use std::sync::Arc;

/// Approvals required before a merge may be attempted.
pub const QUORUM_THRESHOLD: u64 = 2;

/// Result of recording one approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumState {
    /// Count immediately after this approval was added.
    pub count: u64,

    /// Whether `count` meets the threshold.
    pub reached: bool,
}

/// Returns `true` when `count` meets [`QUORUM_THRESHOLD`].
pub fn quorum_reached(count: u64) -> bool {
    count >= QUORUM_THRESHOLD
}

/// Merge decision for one approval: quorum met and the triggering event
/// reported the MR as mergeable.
///
/// The mergeability comes from the event, not a fresh API lookup, so it may
/// be stale by the time the merge call is made.
pub fn should_merge(count: u64, mergeability: &MergeStatus) -> bool {
    quorum_reached(count) && mergeability.is_mergeable()
}

/// Owns the approval counters for the process.
#[derive(Clone)]
pub struct QuorumTracker {
    store: Arc<dyn ApprovalStore>,
}

impl QuorumTracker {
    pub fn new(store: Arc<dyn ApprovalStore>) -> Self {
        Self { store }
    }

    /// Count one approval for `target_id`.
    pub async fn record_approval(&self, target_id: i64) -> QuorumState {
        let count = self.store.record_approval(target_id).await;
        let reached = quorum_reached(count);
        log::info!(
            "[quorum] MR {} has {} approval(s) (quorum {}reached)",
            target_id,
            count,
            if reached { "" } else { "not " }
        );
        QuorumState { count, reached }
    }

    /// Claim the single merge attempt for `target_id`.
    ///
    /// Only the first caller gets `true`.
    pub async fn claim_merge(&self, target_id: i64) -> bool {
        self.store.mark_merge_attempted(target_id).await
    }

    /// Current approval count for `target_id`.
    pub async fn approval_count(&self, target_id: i64) -> u64 {
        self.store.approval_count(target_id).await
    }

    /// Number of merge requests with at least one approval.
    pub async fn tracked_targets(&self) -> usize {
        self.store.tracked_targets().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::approval_store::InMemoryApprovalStore;

    fn tracker() -> QuorumTracker {
        QuorumTracker::new(Arc::new(InMemoryApprovalStore::new()))
    }

    #[test]
    fn test_quorum_predicate() {
        assert!(!quorum_reached(0));
        assert!(!quorum_reached(1));
        assert!(quorum_reached(2));
        assert!(quorum_reached(3));
    }

    #[test]
    fn test_should_merge_requires_quorum_and_mergeability() {
        assert!(!should_merge(1, &MergeStatus::CanBeMerged));
        assert!(should_merge(2, &MergeStatus::CanBeMerged));
        assert!(should_merge(5, &MergeStatus::CanBeMerged));
        assert!(!should_merge(2, &MergeStatus::CannotBeMerged));
        assert!(!should_merge(2, &MergeStatus::Unchecked));
        assert!(!should_merge(2, &MergeStatus::Other("checking".into())));
    }

    #[tokio::test]
    async fn test_record_approval_reports_quorum() {
        let tracker = tracker();
        let first = tracker.record_approval(42).await;
        assert_eq!(first, QuorumState { count: 1, reached: false });

        let second = tracker.record_approval(42).await;
        assert_eq!(second, QuorumState { count: 2, reached: true });

        // Past the threshold the count keeps growing and quorum stays reached.
        let third = tracker.record_approval(42).await;
        assert_eq!(third, QuorumState { count: 3, reached: true });
        assert_eq!(tracker.approval_count(42).await, 3);
    }

    #[tokio::test]
    async fn test_claim_merge_only_once() {
        let tracker = tracker();
        assert!(tracker.claim_merge(42).await);
        assert!(!tracker.claim_merge(42).await);
    }
}
