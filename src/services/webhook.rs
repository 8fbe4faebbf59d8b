//! HTTP routes for the GitLab webhook.
//!
//! Every request that parses is answered `200 OK` with body `OK`, whether or
//! not the comment counted. Requests that don't parse get a `400` with a
//! plain-text reason.

use crate::error::AppError;
use crate::models::{ApprovalEvent, NoteEvent};
use crate::services::dispatcher::ApprovalDispatcher;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Extensions, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;

/// Body returned for every accepted webhook.
pub const RESPONSE_OK: &str = "OK";

/// Header GitLab uses to name the hook type, e.g. `Note Hook`.
const GITLAB_EVENT_HEADER: &str = "x-gitlab-event";

// ── Error handling ───────────────────────────────────────────────────────────

/// Wrapper to make AppError usable as an axum error response.
struct ApiErr(AppError);

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = format!("error occurs:{}", self.0);
        log::warn!("[webhook] {}", message);
        (status, message).into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

// ── Route builder ────────────────────────────────────────────────────────────

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: ApprovalDispatcher,
}

/// Build the webhook router, listening for GitLab hooks on `hook_path`.
pub fn webhook_routes(hook_path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(hook_path, post(receive_hook))
        .route("/healthz", get(healthz))
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST {hook_path}: receive a GitLab webhook.
async fn receive_hook(
    State(state): State<WebhookState>,
    method: Method,
    extensions: Extensions,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiErr> {
    let delivery_id = uuid::Uuid::new_v4().to_string();
    // Only present when served with connect info; router tests go without.
    let remote = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    log::info!(
        "[webhook] {} {} from {}: {} ({} bytes)",
        delivery_id,
        method,
        remote,
        headers
            .get(GITLAB_EVENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown event"),
        body.len()
    );

    let note = parse_note_event(&headers, &body)?;
    let event = ApprovalEvent::from(&note);

    // Dropping the handle detaches the merge task; it outlives the response.
    let dispatch = state.dispatcher.dispatch(&event, &delivery_id).await;
    log::debug!("[webhook] {} outcome: {:?}", delivery_id, dispatch.outcome);

    Ok(RESPONSE_OK)
}

/// GET /healthz: liveness probe.
async fn healthz() -> &'static str {
    RESPONSE_OK
}

/// Validate the content type and decode the body.
fn parse_note_event(headers: &HeaderMap, body: &[u8]) -> Result<NoteEvent, AppError> {
    if !is_json_content_type(headers) {
        return Err(AppError::invalid_request("invalid content type"));
    }
    if body.is_empty() {
        return Err(AppError::invalid_request("invalid request body"));
    }
    Ok(serde_json::from_slice(body)?)
}

/// `application/json`, optionally followed by parameters such as a charset.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
