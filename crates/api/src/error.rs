use achievo_core::error::CoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `achievo_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A malformed request (bad query value, missing field).
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Message returned in place of any internal detail.
const SANITIZED: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    SANITIZED.to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a domain error to its HTTP status, stable code and client message.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    let status = match err {
        CoreError::InvalidType(_) | CoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::InvalidState(_) => StatusCode::CONFLICT,
        CoreError::StoreUnavailable { .. } | CoreError::ReferenceCreateFailed => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CoreError::DocumentMissing { .. } | CoreError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = match err {
        CoreError::InvalidType(msg)
        | CoreError::InvalidArgument(msg)
        | CoreError::Unauthorized(msg)
        | CoreError::Forbidden(msg)
        | CoreError::InvalidState(msg) => msg.clone(),
        CoreError::NotFound { entity, id } => format!("{entity} with id {id} not found"),
        // Names only the store, never the adapter's error text.
        CoreError::StoreUnavailable { .. } | CoreError::ReferenceCreateFailed => err.to_string(),
        CoreError::DocumentMissing { .. } | CoreError::Internal(_) => {
            tracing::error!(error = %err, "Internal core error");
            SANITIZED.to_string()
        }
    };

    (status, err.code(), message)
}
