//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it against the
//! session store, loads the account, and injects a `Caller` into request
//! extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::authorization::Caller;
use crate::db;

/// Token presented in the `Authorization` header, if any.
pub fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Require a live login session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;

    // Session guard is dropped before any .await
    let user_id = ctx
        .core
        .resolve_session(token)?
        .ok_or(ApiError::Unauthorized)?;

    let user = {
        let conn = ctx.core.open_db()?;
        db::get_user(&conn, user_id)?
    };
    let Some(user) = user else {
        tracing::warn!(user_id, "Session refers to a missing account");
        return Err(ApiError::Unauthorized);
    };

    req.extensions_mut().insert(Caller::from_user(&user));
    Ok(next.run(req).await)
}
