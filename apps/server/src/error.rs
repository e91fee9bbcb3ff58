//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Inventario                             │
//! │                                                                         │
//! │  Handler -> Result<Json<T>, ApiError>                                  │
//! │       │                                                                 │
//! │       ├── ValidationError / EmptyBatch ────────► 400 VALIDATION_ERROR  │
//! │       ├── Item / Sale / Event not found ───────► 404 NOT_FOUND         │
//! │       ├── EventNotOpen / ItemUnavailable ──────► 400 CONFLICT          │
//! │       ├── EventClosed (staging) ───────────────► 403 EVENT_CLOSED      │
//! │       ├── DbError::Busy / PoolExhausted ───────► 503 DATABASE_BUSY     │
//! │       ├── other DbError (logged, generic msg) ─► 500 DATABASE_ERROR    │
//! │       └── ScannerError ────────────────────────► 404 / 500             │
//! │                                                                         │
//! │  Body: {"ok": false, "code": "NOT_FOUND", "msg": "..."}                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use inventario_core::{CoreError, ValidationError};
use inventario_db::DbError;
use inventario_scanner::ScannerError;
use serde::Serialize;
use serde_json::json;

/// API error returned from handlers.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    pub status: StatusCode,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Request conflicts with current state (400)
    Conflict,

    /// Today's event is closed to new items (403)
    EventClosed,

    /// Write lock contention outlived the busy timeout (503)
    DatabaseBusy,

    /// Database operation failed (500)
    DatabaseError,

    /// No serial port found (404)
    NoDevice,

    /// Serial driver or port failure (500)
    ScannerError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    /// Default status for the code.
    pub const fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound | ErrorCode::NoDevice => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::Conflict => StatusCode::BAD_REQUEST,
            ErrorCode::EventClosed => StatusCode::FORBIDDEN,
            ErrorCode::DatabaseBusy => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::ScannerError | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ApiError {
    /// Creates a new API error with the code's default status.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            status: code.status(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::NotFound, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(e) => e.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(format!("{} {} no existe", entity, id)),
            DbError::UniqueViolation { field, value } => {
                ApiError::new(ErrorCode::Conflict, format!("{} '{}' ya existe", field, value))
            }
            e @ (DbError::Busy(_) | DbError::PoolExhausted) => {
                tracing::warn!(error = %e, "Write lock contention reached the client");
                ApiError::new(ErrorCode::DatabaseBusy, "Base de datos ocupada, intente de nuevo")
            }
            e => {
                // Details stay in the log; clients get a generic message.
                tracing::error!(error = %e, "Storage failure");
                ApiError::new(ErrorCode::DatabaseError, "Error de base de datos")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            e if e.is_not_found() => ErrorCode::NotFound,
            CoreError::EventClosed { .. } => ErrorCode::EventClosed,
            CoreError::EventNotOpen { .. }
            | CoreError::ItemUnavailable { .. }
            | CoreError::DuplicateSerial(_) => ErrorCode::Conflict,
            _ => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        CoreError::from(err).into()
    }
}

/// Converts scanner errors to API errors.
impl From<ScannerError> for ApiError {
    fn from(err: ScannerError) -> Self {
        let code = match &err {
            ScannerError::NoDevice => ErrorCode::NoDevice,
            ScannerError::MissingCode => ErrorCode::ValidationError,
            ScannerError::DriverUnavailable(_) | ScannerError::Open { .. } | ScannerError::Io(_) => {
                tracing::error!(error = %err, "Scanner failure");
                ErrorCode::ScannerError
            }
        };
        ApiError::new(code, err.to_string())
    }
}

/// Malformed or missing JSON bodies.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            code: ErrorCode::ValidationError,
            message: rejection.body_text(),
            status: rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "ok": false,
            "code": self.code,
            "msg": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;
