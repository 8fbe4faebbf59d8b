//! GitLab LGTM - merges a merge request once enough reviewers comment "LGTM".
//!
//! GitLab posts note events to the webhook route; approvals are counted per
//! merge request and, once quorum is reached on a mergeable request, the
//! merge is requested through the GitLab API.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

use axum::Router;
use config::ServerConfig;
use error::AppError;
use services::{
    retry, ApprovalDispatcher, ApprovalStore, GitLabClient, InMemoryApprovalStore,
    MergeTrigger, QuorumTracker, ServerHandle, ShardedApprovalStore, WebhookState,
};
use std::sync::Arc;

/// Approval store for the configured shard count.
pub fn build_store(shards: usize) -> Arc<dyn ApprovalStore> {
    if shards > 1 {
        Arc::new(ShardedApprovalStore::new(shards))
    } else {
        Arc::new(InMemoryApprovalStore::new())
    }
}

/// Wire the store, GitLab client and merge trigger into a dispatcher.
pub fn build_dispatcher(config: &ServerConfig) -> Result<ApprovalDispatcher, AppError> {
    let client = GitLabClient::new(config.gitlab.clone())?;
    let trigger = MergeTrigger::new(Arc::new(client))
        .with_retry_policy(retry::policy_for(config.merge_retries, config.retry_delay))
        .with_remove_source_branch(config.remove_source_branch);
    let tracker = QuorumTracker::new(build_store(config.store_shards));

    Ok(ApprovalDispatcher::new(tracker, trigger).with_dedupe_merges(config.dedupe_merges))
}

/// Full HTTP router for `config` around `dispatcher`.
pub fn build_router(config: &ServerConfig, dispatcher: ApprovalDispatcher) -> Router {
    services::webhook_routes(&config.hook_path, WebhookState { dispatcher })
}

/// Build the router and start serving on the configured address.
///
/// Stopping the returned handle also waits for merge calls still in flight.
pub async fn run(config: &ServerConfig) -> Result<ServerHandle, AppError> {
    log::info!(
        "[server] Forwarding merges to {} (remove source branch: {}, dedupe: {}, retries: {}, shards: {})",
        config.gitlab.base_url,
        config.remove_source_branch,
        config.dedupe_merges,
        config.merge_retries,
        config.store_shards
    );
    let dispatcher = build_dispatcher(config)?;
    let merge_tasks = dispatcher.merge_tasks();
    let app = build_router(config, dispatcher);
    let handle = services::start_server(config.listen, app).await?;
    Ok(handle.with_background_tasks(merge_tasks))
}
