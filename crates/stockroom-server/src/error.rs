//! API error mapping.
//!
//! Wraps [`StockroomError`] for the HTTP layer. The JSON response
//! always carries a stable machine-readable code plus the message:
//!
//! ```json
//! {"code": "PRECONDITION_FAILED", "message": "product is decommissioned"}
//! ```
//!
//! Clients match on `code`; messages may be reworded.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stockroom_core::StockroomError;
use tracing::error;

/// Stable error code constants.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const PRECONDITION_FAILED: &str = "PRECONDITION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Newtype so the HTTP mapping lives in this crate.
#[derive(Debug)]
pub struct ApiError(pub StockroomError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StockroomError> for ApiError {
    fn from(err: StockroomError) -> Self {
        ApiError(err)
    }
}

impl From<stockroom_auth::AuthError> for ApiError {
    fn from(err: stockroom_auth::AuthError) -> Self {
        ApiError(err.into())
    }
}

impl ApiError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match &self.0 {
            StockroomError::Validation { .. } => error_code::VALIDATION_FAILED,
            StockroomError::NotFound { .. } => error_code::NOT_FOUND,
            StockroomError::Conflict { .. } => error_code::ALREADY_EXISTS,
            StockroomError::PreconditionFailed { .. } => error_code::PRECONDITION_FAILED,
            StockroomError::Unauthorized { .. } => error_code::UNAUTHENTICATED,
            StockroomError::Forbidden { .. } => error_code::PERMISSION_DENIED,
            StockroomError::Database(_) | StockroomError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            StockroomError::Validation { .. } | StockroomError::PreconditionFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            StockroomError::NotFound { .. } => StatusCode::NOT_FOUND,
            StockroomError::Conflict { .. } => StatusCode::CONFLICT,
            StockroomError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            StockroomError::Forbidden { .. } => StatusCode::FORBIDDEN,
            StockroomError::Database(_) | StockroomError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Store/IO failures are logged with detail but surfaced as a
        // generic message so internals never leak to the caller.
        let message = match &self.0 {
            StockroomError::Database(detail) | StockroomError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "code": self.error_code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
