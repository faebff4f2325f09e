//! Dashboard endpoint: full page model, or the table fragment for
//! incremental search refreshes.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{is_incremental, ApiContext};
use crate::authorization::Caller;
use crate::dashboard;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub q: Option<String>,
}

/// `GET /dashboard?q=`
pub async fn show(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Query(params): Query<DashboardQuery>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let query = params.q.as_deref();

    if is_incremental(&headers) {
        let fragment = dashboard::dashboard_fragment(&conn, &caller, query)?;
        return Ok(Json(fragment).into_response());
    }
    let page = dashboard::dashboard_page(&conn, &caller, query)?;
    Ok(Json(page).into_response())
}
