//! Audit logging middleware.
//!
//! Logs every authenticated request with user, method, path and
//! response status. Runs innermost (after auth has injected `Caller`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authorization::Caller;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let user = req
        .extensions()
        .get::<Caller>()
        .map(|c| format!("{}({})", c.username, c.role))
        .unwrap_or_else(|| "anonymous".to_string());

    let started = Instant::now();
    let response = next.run(req).await;

    tracing::info!(
        %user,
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "API access"
    );
    response
}
