//! API error types with structured JSON responses.
//!
//! Page requests that fail authorization are redirected to the dashboard;
//! incremental requests get a `{success:false, error}` body instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::accounts::AccountError;
use crate::api::types::IncrementalReply;
use crate::authorization::{AccessError, FailureMode};
use crate::clients::ClientError;
use crate::core_state::CoreError;
use crate::dashboard::DashboardError;
use crate::referral::ReferralError;
use crate::validation::FieldErrors;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation {
        errors: FieldErrors,
        input: Option<serde_json::Value>,
    },
    /// Page-view rejection: 303 to the given location.
    #[error("Redirect to {0}")]
    Redirect(String),
    /// Incremental-call failure: `{success:false, error}` with the status.
    #[error("{message}")]
    Incremental { status: StatusCode, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn incremental(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Incremental {
            status,
            message: message.into(),
        }
    }

    /// Internal failure on an incremental call. The detail is logged; the
    /// client only sees the fixed message.
    pub fn incremental_internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(detail = %detail, "API internal error");
        ApiError::incremental(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    /// Attach the submitted form to a validation failure so the client can
    /// re-render it. Other errors pass through unchanged.
    pub fn echo<T: Serialize>(self, input: &T) -> Self {
        match self {
            ApiError::Validation { errors, .. } => ApiError::Validation {
                errors,
                input: serde_json::to_value(input).ok(),
            },
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, fields, input) = match self {
            ApiError::Redirect(location) => return Redirect::to(&location).into_response(),
            ApiError::Incremental { status, message } => {
                return (status, Json(IncrementalReply::failed(message))).into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
                None,
                None,
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password".to_string(),
                None,
                None,
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None, None),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None, None)
            }
            ApiError::Validation { errors, input } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION",
                "Please correct the errors below".to_string(),
                Some(errors),
                input,
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    INTERNAL_MESSAGE.to_string(),
                    None,
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
            fields,
            input,
        };
        (status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err.operation().failure_mode() {
            FailureMode::RedirectToDashboard => ApiError::Redirect("/dashboard".into()),
            FailureMode::JsonError => ApiError::incremental(StatusCode::FORBIDDEN, err.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            CoreError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

impl From<ReferralError> for ApiError {
    fn from(err: ReferralError) -> Self {
        match err {
            ReferralError::Access(e) => e.into(),
            ReferralError::ClientNotFound | ReferralError::DoctorNotFound => {
                ApiError::incremental(StatusCode::NOT_FOUND, err.to_string())
            }
            ReferralError::NotAssignedDoctor => {
                ApiError::incremental(StatusCode::FORBIDDEN, err.to_string())
            }
            ReferralError::NotReferred | ReferralError::Closed(_) => {
                ApiError::incremental(StatusCode::CONFLICT, err.to_string())
            }
            ReferralError::Database(e) => ApiError::incremental_internal(e),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound => ApiError::NotFound("Client not found".into()),
            ClientError::Access(e) => e.into(),
            ClientError::Validation(errors) => ApiError::Validation {
                errors,
                input: None,
            },
            ClientError::Database(e) => e.into(),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Access(e) => e.into(),
            DashboardError::Database(e) => e.into(),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Access(e) => e.into(),
            AccountError::Validation(errors) => ApiError::Validation {
                errors,
                input: None,
            },
            AccountError::InvalidCredentials => ApiError::InvalidCredentials,
            AccountError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{Operation, Role};
    use axum::body::to_bytes;

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn validation_returns_422_with_fields_and_input() {
        let err = ApiError::Validation {
            errors: FieldErrors::single("age", "Age must be between 1 and 120."),
            input: None,
        }
        .echo(&serde_json::json!({"age": "0"}));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_of(response).await;
        assert_eq!(json["fields"]["age"][0], "Age must be between 1 and 120.");
        assert_eq!(json["input"]["age"], "0");
    }

    #[tokio::test]
    async fn page_access_error_redirects_to_dashboard() {
        let err: ApiError = AccessError::RoleRequired {
            operation: Operation::EditMedical,
            required: Role::Doctor,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/dashboard");
    }

    #[tokio::test]
    async fn incremental_access_error_is_json_403() {
        let err: ApiError = AccessError::RoleRequired {
            operation: Operation::CompleteReferral,
            required: Role::Doctor,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = json_of(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Only doctors can complete referrals");
    }

    #[tokio::test]
    async fn referral_errors_map_to_statuses() {
        let cases = [
            (ReferralError::ClientNotFound, StatusCode::NOT_FOUND),
            (ReferralError::DoctorNotFound, StatusCode::NOT_FOUND),
            (ReferralError::NotAssignedDoctor, StatusCode::FORBIDDEN),
            (ReferralError::NotReferred, StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn referral_database_failure_keeps_incremental_shape() {
        let err = ReferralError::Database(crate::db::DatabaseError::ConstraintViolation(
            "disk on fire".into(),
        ));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "An internal error occurred"})
        );
    }

    #[tokio::test]
    async fn client_not_found_returns_404() {
        let response = ApiError::from(ClientError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_of(response).await;
        assert_eq!(json["error"]["message"], "Client not found");
    }
}
