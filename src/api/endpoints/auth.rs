//! Login and logout.
//!
//! `POST /auth/login`  - unprotected, username/password → bearer token
//! `POST /auth/logout` - protected, revokes the presented token

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::accounts;
use crate::api::error::ApiError;
use crate::api::middleware::auth::bearer_token;
use crate::api::types::ApiContext;
use crate::authorization::{Caller, Role};
use crate::models::User;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
}

pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // PBKDF2 verification is CPU-bound; keep it off the async workers.
    let core = ctx.core.clone();
    let user = tokio::task::spawn_blocking(move || -> Result<User, ApiError> {
        let conn = core.open_db()?;
        Ok(accounts::authenticate(&conn, &request.username, &request.password)?)
    })
    .await??;
    let caller = Caller::from_user(&user);
    let token = ctx.core.start_session(user.id)?;

    tracing::info!(
        username = %caller.username,
        role = %caller.role,
        active_sessions = ctx.core.active_sessions(),
        "Login"
    );
    Ok(Json(LoginResponse {
        token,
        username: caller.username,
        role: caller.role,
    }))
}

pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    req: Request,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = bearer_token(&req) {
        ctx.core.end_session(token)?;
    }
    tracing::info!(
        username = %caller.username,
        active_sessions = ctx.core.active_sessions(),
        "Logout"
    );
    Ok(StatusCode::NO_CONTENT)
}
