//! Command-line and environment configuration.

use crate::error::AppError;
use crate::services::gitlab_client::GitLabClientConfig;
use crate::services::merge_trigger::RemoveSourceBranch;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Raw command-line arguments; every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "gitlab-lgtm")]
#[command(version)]
#[command(about = "Merges GitLab merge requests once enough LGTM comments arrive", long_about = None)]
pub struct Cli {
    /// Personal access token sent as the PRIVATE-TOKEN header
    #[arg(long, env = "GITLAB_PRIVATE_TOKEN", hide_env_values = true)]
    pub private_token: String,

    /// Base URL of the GitLab instance, e.g. https://gitlab.example.com
    #[arg(long, env = "GITLAB_URL")]
    pub gitlab_url: String,

    /// Address to listen on
    #[arg(long, env = "LGTM_LISTEN", default_value = "0.0.0.0:8989")]
    pub listen: SocketAddr,

    /// Route GitLab posts webhooks to
    #[arg(long, env = "LGTM_HOOK_PATH", default_value = "/gitlab/hook")]
    pub hook_path: String,

    /// API path prefix for the merge endpoint
    #[arg(long, env = "GITLAB_API_PREFIX", default_value = "/api/v3")]
    pub api_prefix: String,

    /// Timeout for calls to GitLab, in seconds
    #[arg(long, env = "GITLAB_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// always, from-event or never
    #[arg(long, env = "LGTM_REMOVE_SOURCE_BRANCH", default_value = "always")]
    pub remove_source_branch: String,

    /// Only attempt the merge once per merge request
    #[arg(long, env = "LGTM_DEDUPE_MERGES")]
    pub dedupe_merges: bool,

    /// Extra merge attempts after a network error or unexpected status
    #[arg(long, env = "LGTM_MERGE_RETRIES", default_value_t = 0)]
    pub merge_retries: u32,

    /// Delay between merge attempts, in milliseconds
    #[arg(long, env = "LGTM_RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Number of independently locked approval counter shards
    #[arg(long, env = "LGTM_STORE_SHARDS", default_value_t = 1)]
    pub store_shards: usize,

    /// Log filter, e.g. info or gitlab_lgtm_lib=debug
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub hook_path: String,
    pub gitlab: GitLabClientConfig,
    pub remove_source_branch: RemoveSourceBranch,
    pub dedupe_merges: bool,
    pub merge_retries: u32,
    pub retry_delay: Duration,
    pub store_shards: usize,
}

impl Cli {
    /// Validate the arguments and build a [`ServerConfig`].
    pub fn into_config(self) -> Result<ServerConfig, AppError> {
        let token = self.private_token.trim();
        if token.is_empty() {
            return Err(AppError::invalid_input_field(
                "Private token is required",
                "private_token",
            ));
        }

        let base_url = validate_base_url(&self.gitlab_url)?;

        if !self.hook_path.starts_with('/') {
            return Err(AppError::invalid_input_field(
                format!("Hook path must start with '/': {}", self.hook_path),
                "hook_path",
            ));
        }

        if self.store_shards == 0 {
            return Err(AppError::invalid_input_field(
                "Store shard count must be at least 1",
                "store_shards",
            ));
        }

        let remove_source_branch = self.remove_source_branch.parse()?;

        Ok(ServerConfig {
            listen: self.listen,
            hook_path: self.hook_path,
            gitlab: GitLabClientConfig {
                base_url,
                token: token.to_string(),
                api_prefix: self.api_prefix,
                timeout_secs: self.timeout_secs,
            },
            remove_source_branch,
            dedupe_merges: self.dedupe_merges,
            merge_retries: self.merge_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            store_shards: self.store_shards,
        })
    }
}

/// Base URL without a trailing slash, or an error naming `gitlab_url`.
fn validate_base_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AppError::invalid_input_field(
            "GitLab URL is required",
            "gitlab_url",
        ));
    }

    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| AppError::invalid_input_field(format!("Invalid URL: {}", e), "gitlab_url"))?;

    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(AppError::invalid_input_field(
            format!("Unsupported URL scheme: {}", other),
            "gitlab_url",
        )),
    }
}
