//! Clinic API router.
//!
//! Middleware stack for protected routes (outermost → innermost):
//! Extension → Cache-Control → Auth → Audit → Handler

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the clinic router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn clinic_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/dashboard", get(endpoints::dashboard::show))
        .route("/clients", post(endpoints::clients::create))
        .route("/clients/new", get(endpoints::clients::new_form))
        .route("/clients/:id", get(endpoints::clients::detail))
        .route(
            "/clients/:id/medical",
            get(endpoints::clients::medical_form).post(endpoints::clients::update_medical),
        )
        .route(
            "/clients/:id/delete",
            get(endpoints::clients::delete_prompt).post(endpoints::clients::delete),
        )
        .route("/referrals", post(endpoints::referrals::refer))
        .route("/referrals/pending", get(endpoints::referrals::pending))
        .route(
            "/referrals/:id/complete",
            post(endpoints::referrals::complete),
        )
        .route("/referrals/:id/seen", post(endpoints::referrals::mark_seen))
        .route("/notifications", get(endpoints::notifications::poll))
        .route(
            "/signup",
            get(endpoints::signup::form).post(endpoints::signup::submit),
        )
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::Extension(ctx));

    Router::new().merge(protected).merge(unprotected)
}
