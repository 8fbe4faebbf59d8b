//! Issues the merge call once quorum is reached.
//!
//! Fire-and-forget: every outcome, including errors, ends in a log line and
//! nothing is propagated to the webhook caller.

use crate::error::AppError;
use crate::models::MergeStatus;
use crate::services::gitlab_client::{GitLabClient, MergeOutcome};
use crate::services::retry::{NoRetry, RetryPolicy};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

/// The merge endpoint as seen by the trigger.
#[async_trait]
pub trait MergeApi: Send + Sync {
    async fn accept_merge_request(
        &self,
        project_id: i64,
        merge_request_id: i64,
        should_remove_source_branch: bool,
    ) -> Result<MergeOutcome, AppError>;
}

#[async_trait]
impl MergeApi for GitLabClient {
    async fn accept_merge_request(
        &self,
        project_id: i64,
        merge_request_id: i64,
        should_remove_source_branch: bool,
    ) -> Result<MergeOutcome, AppError> {
        GitLabClient::accept_merge_request(
            self,
            project_id,
            merge_request_id,
            should_remove_source_branch,
        )
        .await
    }
}

/// Which `should_remove_source_branch` value is sent with the merge call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemoveSourceBranch {
    /// Always `"true"`, ignoring the MR's own setting.
    #[default]
    Always,
    /// The MR's `force_remove_source_branch` flag.
    FromEvent,
    /// Always `"false"`.
    Never,
}

impl RemoveSourceBranch {
    pub fn resolve(self, event_flag: bool) -> bool {
        match self {
            Self::Always => true,
            Self::FromEvent => event_flag,
            Self::Never => false,
        }
    }
}

impl FromStr for RemoveSourceBranch {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "from-event" | "from_event" => Ok(Self::FromEvent),
            "never" => Ok(Self::Never),
            other => Err(AppError::invalid_input_field(
                format!(
                    "unknown value '{}', expected always, from-event or never",
                    other
                ),
                "remove_source_branch",
            )),
        }
    }
}

impl std::fmt::Display for RemoveSourceBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::FromEvent => write!(f, "from-event"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// What happened to one merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAttempt {
    /// The event did not report the MR as mergeable; no call was made.
    NotMergeable,
    /// GitLab answered with a classified status.
    Finished { outcome: MergeOutcome, attempts: u32 },
    /// The call failed and the retry policy gave up.
    Failed { error: String, attempts: u32 },
}

/// Calls the merge endpoint and logs the result.
#[derive(Clone)]
pub struct MergeTrigger {
    api: Arc<dyn MergeApi>,
    retry: Arc<dyn RetryPolicy>,
    remove_source_branch: RemoveSourceBranch,
}

impl MergeTrigger {
    /// Trigger with no retries that always asks GitLab to remove the source branch.
    pub fn new(api: Arc<dyn MergeApi>) -> Self {
        Self {
            api,
            retry: Arc::new(NoRetry),
            remove_source_branch: RemoveSourceBranch::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_remove_source_branch(mut self, policy: RemoveSourceBranch) -> Self {
        self.remove_source_branch = policy;
        self
    }

    /// Attempt to merge `merge_request_id` in `project_id`.
    ///
    /// Never returns an error; the returned [`MergeAttempt`] is informational.
    pub async fn try_merge(
        &self,
        project_id: i64,
        merge_request_id: i64,
        remove_source_branch: bool,
        mergeability: &MergeStatus,
    ) -> MergeAttempt {
        if !mergeability.is_mergeable() {
            log::info!(
                "[merge] MR {} not mergeable ({}), skipping merge call",
                merge_request_id,
                mergeability
            );
            return MergeAttempt::NotMergeable;
        }

        let remove = self.remove_source_branch.resolve(remove_source_branch);
        let mut attempt = 1;

        loop {
            match self
                .api
                .accept_merge_request(project_id, merge_request_id, remove)
                .await
            {
                Ok(outcome) => {
                    log_outcome(project_id, merge_request_id, outcome);
                    return MergeAttempt::Finished {
                        outcome,
                        attempts: attempt,
                    };
                }
                Err(e) => match self.retry.next_delay(attempt, &e) {
                    Some(delay) => {
                        log::warn!(
                            "[merge] Attempt {} to merge MR {} in project {} failed: {}; retrying in {:?}",
                            attempt,
                            merge_request_id,
                            project_id,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        log::error!(
                            "[merge] Failed to merge MR {} in project {}: {}",
                            merge_request_id,
                            project_id,
                            e
                        );
                        return MergeAttempt::Failed {
                            error: e.to_string(),
                            attempts: attempt,
                        };
                    }
                },
            }
        }
    }
}

fn log_outcome(project_id: i64, merge_request_id: i64, outcome: MergeOutcome) {
    match outcome {
        MergeOutcome::Merged => log::info!(
            "[merge] Accepted MR {} in project {}",
            merge_request_id,
            project_id
        ),
        MergeOutcome::Conflict => log::warn!(
            "[merge] MR {} in project {} has conflicts and can not be merged",
            merge_request_id,
            project_id
        ),
        MergeOutcome::AlreadyClosed => log::warn!(
            "[merge] MR {} in project {} is already merged or closed",
            merge_request_id,
            project_id
        ),
    }
}
