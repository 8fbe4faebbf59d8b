//! HTTP server for the webhook listener.
//!
//! Binds the configured address, serves the webhook router on a background
//! task and stops gracefully when the handle's cancellation token fires.
//! Work spawned by handlers can be attached to the handle so that stopping
//! also waits for it.

use crate::error::AppError;
use axum::Router;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Handle to control the running server.
pub struct ServerHandle {
    cancel_token: CancellationToken,
    local_addr: SocketAddr,
    task: JoinHandle<()>,
    background: Option<TaskTracker>,
}

impl ServerHandle {
    /// Address the listener actually bound, useful when port 0 was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for `tasks` after the listener stops.
    pub fn with_background_tasks(mut self, tasks: TaskTracker) -> Self {
        self.background = Some(tasks);
        self
    }

    /// Token that stops the server when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        log::info!("[server] Stopping server on {}", self.local_addr);
        self.cancel_token.cancel();
        self.wait().await;
    }

    /// Wait until the server stops, however that happens, then for any
    /// attached background tasks.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            log::error!("[server] Server task failed: {}", e);
        }

        if let Some(tasks) = self.background {
            tasks.close();
            if !tasks.is_empty() {
                log::info!(
                    "[server] Waiting for {} in-flight merge call(s)",
                    tasks.len()
                );
            }
            tasks.wait().await;
        }
    }
}

/// Start serving `app` on `addr`.
///
/// Returns once the listener is bound; the server itself runs on a spawned task.
pub async fn start_server(addr: SocketAddr, app: Router) -> Result<ServerHandle, AppError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::network(format!("Failed to bind to {}: {}", addr, e)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Failed to read bound address: {}", e)))?;

    log::info!("[server] Listening on http://{}", local_addr);

    let cancel_token = CancellationToken::new();
    let cancel_clone = cancel_token.clone();

    // The webhook handler logs the caller's address from ConnectInfo.
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    let task = tokio::spawn(async move {
        let server = axum::serve(listener, make_service).with_graceful_shutdown(async move {
            cancel_clone.cancelled().await;
        });

        if let Err(e) = server.await {
            log::error!("[server] Server error: {}", e);
        }

        log::info!("[server] Server stopped");
    });

    Ok(ServerHandle {
        cancel_token,
        local_addr,
        task,
        background: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn app() -> Router {
        Router::new().route("/healthz", get(|| async { "OK" }))
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let handle = start_server("127.0.0.1:0".parse().unwrap(), app())
            .await
            .unwrap();
        let addr = handle.local_addr();
        assert_ne!(addr.port(), 0);

        // No pooled keep-alive connection may hold up the graceful shutdown.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap();
        let body = client
            .get(format!("http://{}/healthz", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "OK");

        handle.shutdown().await;

        assert!(client
            .get(format!("http://{}/healthz", addr))
            .send()
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_background_tasks() {
        let tasks = TaskTracker::new();
        let handle = start_server("127.0.0.1:0".parse().unwrap(), app())
            .await
            .unwrap()
            .with_background_tasks(tasks.clone());

        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        });

        handle.shutdown().await;

        assert!(done.load(Ordering::SeqCst));
        assert!(tasks.is_closed());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = start_server("127.0.0.1:0".parse().unwrap(), app())
            .await
            .unwrap();

        let second = start_server(first.local_addr(), app()).await;
        assert!(matches!(second, Err(AppError::Network { .. })));

        first.shutdown().await;
    }
}
