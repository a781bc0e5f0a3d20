//! # API Error Type
//!
//! What HTTP clients see when a request fails.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ErrorKind            Status   Body                                     │
//! │  ─────────            ──────   ────                                     │
//! │  Validation           400      {code: VALIDATION_ERROR, message}        │
//! │  InsufficientStock    400      {code: INSUFFICIENT_STOCK, message}      │
//! │  NotFound (body ref)  400      {code: SKU_NOT_FOUND, message}           │
//! │  NotFound (price)     400      {code: PRICE_NOT_FOUND, message}         │
//! │  NotFound (path)      404      {code: NOT_FOUND, message}               │
//! │  Conflict             409      {code: CONFLICT, message}                │
//! │  Persistence          500      {code: DATABASE_ERROR, "try again"}      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence details are logged here and never returned.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use strand_core::{CoreError, ErrorKind};
use strand_db::DbError;
use tracing::error;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    SkuNotFound,
    PriceNotFound,
    InsufficientStock,
    Conflict,
    DatabaseError,
}

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for X-NB-STD-O03-SR-20-20250101-01: available 200 g, requested 300 g"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    /// Converts an error for a request whose SKU ids come from the body.
    ///
    /// A SKU the client named that doesn't exist is bad input (400), not a
    /// missing resource.
    pub fn referenced(err: DbError) -> Self {
        if let Some(CoreError::SkuNotFound(_)) = err.as_domain() {
            return ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::SkuNotFound, err.to_string());
        }
        ApiError::from(err)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if let Some(CoreError::PriceNotFound { .. }) = err.as_domain() {
            return ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::PriceNotFound, err.to_string());
        }

        match err.kind() {
            ErrorKind::Validation => ApiError::validation(err.to_string()),
            ErrorKind::InsufficientStock => {
                ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::InsufficientStock, err.to_string())
            }
            ErrorKind::NotFound => ApiError::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, err.to_string()),
            ErrorKind::Conflict => ApiError::new(StatusCode::CONFLICT, ErrorCode::Conflict, err.to_string()),
            ErrorKind::Persistence => {
                error!(error = %err, "Request failed in the store");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DatabaseError,
                    "Something went wrong, please try again",
                )
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::from(DbError::from(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::ValidationError;

    #[test]
    fn test_status_mapping() {
        let stock = ApiError::from(CoreError::InsufficientStock {
            sku: "X".to_string(),
            available: 200,
            requested: 300,
        });
        assert_eq!(stock.status, StatusCode::BAD_REQUEST);
        assert_eq!(stock.code, ErrorCode::InsufficientStock);

        let missing = ApiError::from(CoreError::OrderNotFound("o-1".to_string()));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let locked = ApiError::from(CoreError::SkuInUse("s-1".to_string()));
        assert_eq!(locked.status, StatusCode::CONFLICT);

        let invalid = ApiError::from(CoreError::Validation(ValidationError::Required {
            field: "items".to_string(),
        }));
        assert_eq!(invalid.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_sku_reference_from_body() {
        let err = DbError::from(CoreError::SkuNotFound("nope".to_string()));
        let api = ApiError::referenced(err);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, ErrorCode::SkuNotFound);

        let err = DbError::from(CoreError::SkuNotFound("nope".to_string()));
        assert_eq!(ApiError::from(err).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_persistence_detail_hidden() {
        let api = ApiError::from(DbError::QueryFailed("disk I/O error at page 42".to_string()));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("page 42"));
    }
}
