//! Notification poll.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::authorization::Caller;
use crate::dashboard;

#[derive(Serialize)]
pub struct NotificationResponse {
    pub pending_referrals: u32,
}

/// `GET /notifications`: read-only, safe to poll.
pub async fn poll(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let pending_referrals = dashboard::poll_pending_count(&conn, &caller)?;
    Ok(Json(NotificationResponse { pending_referrals }))
}
