//! GitLab API client.
//!
//! Authenticates every request with the `PRIVATE-TOKEN` header and wraps the
//! accept-merge-request endpoint.

use crate::error::AppError;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;

/// Header GitLab reads the personal access token from.
pub const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab API client configuration.
#[derive(Debug, Clone)]
pub struct GitLabClientConfig {
    /// Base URL of the GitLab instance (e.g., `https://gitlab.example.com`).
    pub base_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// API path prefix, e.g. `/api/v3`.
    pub api_prefix: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitLabClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            api_prefix: "/api/v3".to_string(),
            timeout_secs: 30,
        }
    }
}

/// How GitLab answered an accept-merge-request call.
///
/// Statuses outside these three are returned as [`AppError::GitLabApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// 200: the MR was merged.
    Merged,
    /// 405: conflicts or other blockers prevent merging.
    Conflict,
    /// 406: the MR is already merged or closed.
    AlreadyClosed,
}

impl std::fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merged => write!(f, "merged"),
            Self::Conflict => write!(f, "conflict"),
            Self::AlreadyClosed => write!(f, "already merged or closed"),
        }
    }
}

/// Body of `PUT /projects/:id/merge_requests/:merge_request_id/merge`.
///
/// GitLab v3 takes the flag as a string.
#[derive(Debug, Serialize)]
struct AcceptMergeRequestBody<'a> {
    should_remove_source_branch: &'a str,
}

/// GitLab API client.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: Client,
    config: GitLabClientConfig,
}

impl GitLabClient {
    /// Create a new GitLab client.
    pub fn new(config: GitLabClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();

        let token_value = header::HeaderValue::from_str(&config.token)
            .map_err(|_| AppError::authentication("Invalid token format"))?;
        headers.insert(PRIVATE_TOKEN_HEADER, token_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the full URL for an API endpoint.
    fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let prefix = self.config.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}{}", base, prefix, path)
        }
    }

    /// Merge endpoint path for a project/MR pair, relative to the API prefix.
    pub fn merge_endpoint(project_id: i64, merge_request_id: i64) -> String {
        format!(
            "/projects/{}/merge_requests/{}/merge",
            project_id, merge_request_id
        )
    }

    /// Accept (merge) a merge request.
    ///
    /// 200, 405 and 406 map to [`MergeOutcome`]; any other status is an error
    /// carrying GitLab's `message` when the body has one.
    pub async fn accept_merge_request(
        &self,
        project_id: i64,
        merge_request_id: i64,
        should_remove_source_branch: bool,
    ) -> Result<MergeOutcome, AppError> {
        let endpoint = Self::merge_endpoint(project_id, merge_request_id);
        let url = self.api_url(&endpoint);

        let body = AcceptMergeRequestBody {
            should_remove_source_branch: if should_remove_source_branch {
                "true"
            } else {
                "false"
            },
        };

        let response = self.client.put(&url).json(&body).send().await?;

        let status = response.status();
        match status {
            StatusCode::OK => Ok(MergeOutcome::Merged),
            StatusCode::METHOD_NOT_ALLOWED => Ok(MergeOutcome::Conflict),
            StatusCode::NOT_ACCEPTABLE => Ok(MergeOutcome::AlreadyClosed),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| {
                        // GitLab returns errors as {"message": "..."} or {"error": "..."}
                        v.get("message")
                            .or_else(|| v.get("error"))
                            .and_then(|m| m.as_str().map(String::from))
                    })
                    .unwrap_or_else(|| match status {
                        StatusCode::UNAUTHORIZED => "Not authorized to merge".into(),
                        StatusCode::NOT_FOUND => "Merge request not found".into(),
                        _ => format!("Merge failed ({})", status),
                    });

                Err(AppError::gitlab_api_full(
                    message,
                    status.as_u16(),
                    endpoint,
                ))
            }
        }
    }
}
