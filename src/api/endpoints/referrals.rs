//! Referral endpoints.
//!
//! `POST /referrals` - refer a client (incremental)
//! `POST /referrals/:id/complete` - assigned doctor completes (incremental)
//! `POST /referrals/:id/seen` - assigned doctor acknowledges
//! `GET  /referrals/pending` - doctor's pending referral list

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{is_incremental, ApiContext, IncrementalReply};
use crate::authorization::Caller;
use crate::dashboard;
use crate::models::Client;
use crate::referral;

/// Raw refer form. Ids arrive as text and are parsed here so a malformed
/// submission gets the incremental error shape. The clinic's refer dialog
/// posts `referred_to` and `referral_notes`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReferForm {
    pub client_id: String,
    #[serde(alias = "referred_to")]
    pub doctor_id: String,
    #[serde(alias = "referral_notes")]
    pub notes: String,
}

#[derive(Serialize)]
pub struct PendingReferralsPage {
    pub clients: Vec<Client>,
    pub total_count: usize,
}

fn invalid_request() -> ApiError {
    ApiError::Incremental {
        status: StatusCode::BAD_REQUEST,
        message: "Invalid request".into(),
    }
}

fn require_incremental(headers: &HeaderMap) -> Result<(), ApiError> {
    if is_incremental(headers) {
        Ok(())
    } else {
        Err(invalid_request())
    }
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse().map_err(|_| invalid_request())
}

pub async fn refer(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Form(form): Form<ReferForm>,
) -> Result<Json<IncrementalReply>, ApiError> {
    require_incremental(&headers)?;
    let client_id = parse_id(&form.client_id)?;
    let doctor_id = parse_id(&form.doctor_id)?;

    let conn = ctx.core.open_db().map_err(ApiError::incremental_internal)?;
    let client = referral::refer_client(&conn, &caller, client_id, doctor_id, &form.notes)?;
    let doctor = client
        .referral
        .referred_to_username
        .as_deref()
        .unwrap_or_default();

    Ok(Json(IncrementalReply::ok(format!(
        "Client referred to Dr. {doctor} successfully!"
    ))))
}

pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Path(client_id): Path<String>,
) -> Result<Json<IncrementalReply>, ApiError> {
    require_incremental(&headers)?;
    let client_id = parse_id(&client_id)?;
    let conn = ctx.core.open_db().map_err(ApiError::incremental_internal)?;
    referral::complete_referral(&conn, &caller, client_id)?;
    Ok(Json(IncrementalReply::ok("Referral completed!")))
}

pub async fn mark_seen(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(client_id): Path<String>,
) -> Result<Json<IncrementalReply>, ApiError> {
    let client_id = parse_id(&client_id)?;
    let conn = ctx.core.open_db().map_err(ApiError::incremental_internal)?;
    referral::mark_referral_seen(&conn, &caller, client_id)?;
    Ok(Json(IncrementalReply::done()))
}

pub async fn pending(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<PendingReferralsPage>, ApiError> {
    let conn = ctx.core.open_db()?;
    let clients = dashboard::pending_referrals(&conn, &caller)?;
    Ok(Json(PendingReferralsPage {
        total_count: clients.len(),
        clients,
    }))
}
