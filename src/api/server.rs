//! Server lifecycle: bind → spawn background task → return handle with
//! shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::router::clinic_router;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Session metadata for a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running server.
pub struct ClinicServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ClinicServer {
    /// Signal graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Server shutdown signal sent");
        }
    }

    /// Wait until the server task has exited.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Start the HTTP server on `addr` (port 0 picks an ephemeral port).
pub async fn start_server_on(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<ClinicServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = clinic_router(core);

    let session = ServerSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Server received shutdown signal");
        };

        tracing::info!(%addr, "Server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Server error: {e}");
        }

        tracing::info!("Server stopped");
    });

    Ok(ClinicServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let core = Arc::new(CoreState::new(
            tmp.path().join("clinic.db"),
            Duration::from_secs(60),
        ));
        (core, tmp)
    }

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let (core, _tmp) = test_core();
        let mut server = start_server_on(core, localhost())
            .await
            .expect("server should start");

        assert!(!server.session.session_id.is_empty());
        assert!(server.session.port > 0);

        let port = server.session.port;
        let status = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::OK);

        let status = reqwest::get(format!("http://127.0.0.1:{port}/dashboard"))
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (core, _tmp) = test_core();
        let mut server = start_server_on(core, localhost())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown();
        server.stopped().await;
    }
}
