//! Application error types.
//!
//! Request-format errors are reported back to the webhook caller; every
//! other variant only ever reaches the log.

use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// The inbound webhook request could not be accepted.
    #[error("{message}")]
    InvalidRequest { message: String },

    /// GitLab API request failed.
    #[error("GitLab API error: {message}")]
    GitLabApi {
        message: String,
        status_code: Option<u16>,
        endpoint: Option<String>,
    },

    /// Network request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The configured credential is unusable.
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Invalid configuration value.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a request-format error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a GitLab API error.
    pub fn gitlab_api(message: impl Into<String>) -> Self {
        Self::GitLabApi {
            message: message.into(),
            status_code: None,
            endpoint: None,
        }
    }

    /// Create a GitLab API error with status code and endpoint.
    pub fn gitlab_api_full(
        message: impl Into<String>,
        status_code: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::GitLabApi {
            message: message.into(),
            status_code: Some(status_code),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error was caused by the caller's request rather than by us.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. } | Self::InvalidInput { .. })
    }

    /// Whether a later attempt could plausibly succeed.
    ///
    /// Transport failures and unclassified GitLab statuses qualify;
    /// configuration and request errors never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::GitLabApi { .. })
    }
}

// Conversions from common error types

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network("Failed to connect to server")
        } else if err.is_builder() {
            Self::internal(format!("Failed to build request: {}", err))
        } else if err.is_status() {
            Self::gitlab_api(format!("HTTP error: {}", err))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gitlab_api_error_full() {
        let err = AppError::gitlab_api_full("Forbidden", 403, "/projects/1/merge_requests/2/merge");
        match err {
            AppError::GitLabApi {
                status_code,
                endpoint,
                ..
            } => {
                assert_eq!(status_code, Some(403));
                assert_eq!(endpoint.as_deref(), Some("/projects/1/merge_requests/2/merge"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_request_displays_bare_message() {
        let err = AppError::invalid_request("invalid content type");
        assert_eq!(err.to_string(), "invalid content type");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_json_error_is_request_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::InvalidRequest { .. }));
    }

    #[test]
    fn test_transient_classification() {
        assert!(AppError::network("reset").is_transient());
        assert!(AppError::gitlab_api_full("boom", 500, "/x").is_transient());
        assert!(!AppError::invalid_input_field("empty", "private_token").is_transient());
        assert!(!AppError::authentication("bad header").is_transient());
    }

    #[test]
    fn test_display_impl() {
        let err = AppError::authentication("invalid token");
        assert_eq!(format!("{}", err), "Authentication error: invalid token");
    }
}
