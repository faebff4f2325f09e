//! Shared types for the HTTP layer.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;

use crate::core_state::CoreState;

/// Header value marking a request as an incremental (scripted) call.
pub const XHR_HEADER_VALUE: &str = "XMLHttpRequest";

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Incremental requests
// ═══════════════════════════════════════════════════════════

/// `true` when the request carries `X-Requested-With: XMLHttpRequest`.
pub fn is_incremental(headers: &HeaderMap) -> bool {
    headers
        .get("X-Requested-With")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case(XHR_HEADER_VALUE))
}

/// `{success, message}` / `{success, error}` reply for incremental calls.
#[derive(Debug, Serialize)]
pub struct IncrementalReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IncrementalReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn done() -> Self {
        Self {
            success: true,
            message: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}
