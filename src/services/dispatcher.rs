//! Routes a parsed webhook event through classification, counting and,
//! when due, the merge call.
//!
//! The merge call runs on its own task so the webhook response never waits
//! on GitLab.

use crate::models::ApprovalEvent;
use crate::services::classifier::classify;
use crate::services::merge_trigger::{MergeAttempt, MergeTrigger};
use crate::services::quorum::{should_merge, QuorumTracker};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// What the dispatcher did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not an approval comment; nothing was counted.
    Ignored,
    /// Approval counted, no merge due.
    Counted { count: u64 },
    /// Approval counted and a merge call was started.
    MergeScheduled { count: u64 },
    /// Merge was due but one was already attempted for this MR.
    MergeSuppressed { count: u64 },
}

/// Outcome plus the handle of the merge task, if one was started.
#[derive(Debug)]
pub struct Dispatch {
    pub outcome: DispatchOutcome,
    pub merge: Option<JoinHandle<MergeAttempt>>,
}

/// Connects the classifier, the quorum tracker and the merge trigger.
#[derive(Clone)]
pub struct ApprovalDispatcher {
    tracker: QuorumTracker,
    trigger: MergeTrigger,
    dedupe_merges: bool,
    merges: TaskTracker,
}

impl ApprovalDispatcher {
    pub fn new(tracker: QuorumTracker, trigger: MergeTrigger) -> Self {
        Self {
            tracker,
            trigger,
            dedupe_merges: false,
            merges: TaskTracker::new(),
        }
    }

    /// Only trigger the first merge per MR instead of one per qualifying approval.
    pub fn with_dedupe_merges(mut self, dedupe: bool) -> Self {
        self.dedupe_merges = dedupe;
        self
    }

    pub fn tracker(&self) -> &QuorumTracker {
        &self.tracker
    }

    /// Tracker of the spawned merge tasks, shared by every clone.
    pub fn merge_tasks(&self) -> TaskTracker {
        self.merges.clone()
    }

    /// Handle one event. `delivery_id` is only used for log correlation.
    pub async fn dispatch(&self, event: &ApprovalEvent, delivery_id: &str) -> Dispatch {
        if !classify(event) {
            log::debug!(
                "[webhook] {} ignored: kind={:?} noteable={:?}",
                delivery_id,
                event.kind,
                event.target_kind
            );
            return Dispatch {
                outcome: DispatchOutcome::Ignored,
                merge: None,
            };
        }

        log::info!(
            "[webhook] {} approval from {} on MR {}",
            delivery_id,
            if event.author.is_empty() { "<unknown>" } else { event.author.as_str() },
            event.target_id
        );

        let state = self.tracker.record_approval(event.target_id).await;

        if !should_merge(state.count, &event.mergeability) {
            return Dispatch {
                outcome: DispatchOutcome::Counted { count: state.count },
                merge: None,
            };
        }

        if self.dedupe_merges && !self.tracker.claim_merge(event.target_id).await {
            log::info!(
                "[webhook] {} merge for MR {} already attempted, skipping",
                delivery_id,
                event.target_id
            );
            return Dispatch {
                outcome: DispatchOutcome::MergeSuppressed { count: state.count },
                merge: None,
            };
        }

        log::info!(
            "[webhook] {} MR {} can be merged, scheduling merge",
            delivery_id,
            event.target_id
        );

        let trigger = self.trigger.clone();
        let project_id = event.project_id;
        let target_id = event.target_id;
        let remove_source_branch = event.remove_source_branch_on_merge;
        let mergeability = event.mergeability.clone();
        let handle = self.merges.spawn(async move {
            trigger
                .try_merge(project_id, target_id, remove_source_branch, &mergeability)
                .await
        });

        Dispatch {
            outcome: DispatchOutcome::MergeScheduled { count: state.count },
            merge: Some(handle),
        }
    }
}
