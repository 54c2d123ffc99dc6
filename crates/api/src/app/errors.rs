use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use backoffice_authz::AuthzError;
use backoffice_core::DomainError;
use backoffice_infra::AuditLogError;

/// Failure of a request handler, mapped onto a JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authorization denial. Never carries which grant was missing.
    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Audit(#[from] AuditLogError),
}

impl From<AuthzError> for ApiError {
    fn from(_: AuthzError) -> Self {
        Self::Forbidden
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound("record"),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Forbidden => forbidden(),
            ApiError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
            ApiError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            ApiError::Audit(AuditLogError::Timeout) => json_error(
                StatusCode::GATEWAY_TIMEOUT,
                "audit_unavailable",
                "audit storage timed out",
            ),
            ApiError::Audit(e) => {
                tracing::error!(error = %e, "audit log read failed");
                json_error(StatusCode::SERVICE_UNAVAILABLE, "audit_unavailable", "audit storage unavailable")
            }
        }
    }
}

pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
