//! # API Error Type
//!
//! The error a controller layer returns to its client.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Error Flow in Ledgerline ERP                        │
//! │                                                                         │
//! │  Service call                                                          │
//! │  ServiceResult<T>                                                      │
//! │         │                                                               │
//! │         ├── CoreError::Overpayment ──────────► INVALID_OPERATION (422) │
//! │         ├── CoreError::DocumentNotFound ─────► NOT_FOUND (404)         │
//! │         ├── CoreError::Validation ───────────► VALIDATION_ERROR (400)  │
//! │         ├── DbError::Conflict / Unique ──────► CONFLICT (409)          │
//! │         └── DbError::QueryFailed ... ─► log ─► DATABASE_ERROR (500)    │
//! │                                                                         │
//! │  Response body:                                                        │
//! │  { "code": "INVALID_OPERATION",                                        │
//! │    "message": "Payment of 1.00 exceeds outstanding balance of 0.00" }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal details (SQL messages, pool state) are logged and replaced by a
//! generic message.

use serde::Serialize;
use tracing::error;
use ts_rs::TS;

use super::ServiceError;
use crate::error::DbError;
use erp_core::{CoreError, ErrorKind};

/// Error body returned to API clients.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Invoice not found: 6f1c..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced entity does not exist (404)
    NotFound,

    /// Duplicate key or concurrent modification (409)
    Conflict,

    /// Business rule violated (422)
    InvalidOperation,

    /// Malformed input (400)
    ValidationError,

    /// Storage failure (500)
    DatabaseError,

    /// Anything else (500)
    Internal,
}

impl ErrorCode {
    /// HTTP status a controller should answer with.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::InvalidOperation => 422,
            ErrorCode::ValidationError => 400,
            ErrorCode::DatabaseError | ErrorCode::Internal => 500,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::InvalidOperation => ErrorCode::InvalidOperation,
            ErrorKind::Validation => ErrorCode::ValidationError,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::new(err.kind().into(), err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            DbError::UniqueViolation { .. } | DbError::Conflict { .. } => {
                ApiError::new(ErrorCode::Conflict, err.to_string())
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::InvalidOperation, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database is busy")
            }
            DbError::Corrupt { column, value } => {
                error!(column = %column, value = %value, "Corrupt stored value");
                ApiError::internal("Stored data is inconsistent")
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) => e.into(),
            ServiceError::Db(e) => e.into(),
        }
    }
}
