//! Webhook handling services.
//!
//! Everything between the HTTP route and the GitLab merge call: classifying
//! comments, counting approvals, deciding on quorum and calling GitLab.

pub mod approval_store;
pub mod classifier;
pub mod dispatcher;
pub mod gitlab_client;
pub mod merge_trigger;
pub mod quorum;
pub mod retry;
pub mod server;
pub mod webhook;

pub use approval_store::{ApprovalStore, InMemoryApprovalStore, ShardedApprovalStore};
pub use dispatcher::{ApprovalDispatcher, Dispatch, DispatchOutcome};
pub use gitlab_client::{GitLabClient, GitLabClientConfig, MergeOutcome};
pub use merge_trigger::{MergeApi, MergeAttempt, MergeTrigger, RemoveSourceBranch};
pub use quorum::{QuorumTracker, QUORUM_THRESHOLD};
pub use server::{start_server, ServerHandle};
pub use webhook::{webhook_routes, WebhookState};
