//! # App Error Type
//!
//! Unified error type returned by the terminal's state objects and commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kervy POS                              │
//! │                                                                         │
//! │  CLI / caller                State objects                              │
//! │  ────────────                ─────────────                              │
//! │                                                                         │
//! │  categories.add(...)                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Result<T, AppError>                                             │  │
//! │  │                                                                  │  │
//! │  │  ValidationError ──► VALIDATION_ERROR                            │  │
//! │  │  SyncError::Offline ──► OFFLINE      (online-only operations)    │  │
//! │  │  SyncError::Remote ──► REMOTE_ERROR  (write lost, not queued)    │  │
//! │  │  DbError ──► STORAGE_ERROR                                       │  │
//! │  │  PrintError ──► PRINTER_ERROR        (sale is kept)              │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "OFFLINE", "message": "No internet connection" }             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use kervy_core::{CoreError, ValidationError};
use kervy_db::DbError;
use kervy_print::PrintError;
use kervy_sync::SyncError;

/// Result alias for terminal operations.
pub type AppResult<T> = Result<T, AppError>;

/// Error returned to the operator.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Not enough stock for Puto: available 1, requested 3"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    /// An online-only operation was attempted without a connection.
    Offline,
    NotAuthenticated,
    AuthFailed,
    RemoteError,
    StorageError,
    CartError,
    InsufficientStock,
    PaymentError,
    PrinterError,
    ConfigError,
    Internal,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => AppError::not_found("Product", &id),
            CoreError::InsufficientStock { .. } => {
                AppError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::CartTooLarge { .. } | CoreError::EmptyCart => {
                AppError::new(ErrorCode::CartError, err.to_string())
            }
            CoreError::QuantityTooLarge { .. } => AppError::validation(err.to_string()),
            CoreError::InsufficientCash { .. } => {
                AppError::new(ErrorCode::PaymentError, err.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let code = match &err {
            SyncError::Offline => ErrorCode::Offline,
            SyncError::NotFound { .. } => ErrorCode::NotFound,
            SyncError::NotAuthenticated => ErrorCode::NotAuthenticated,
            SyncError::AuthFailed(_) => ErrorCode::AuthFailed,
            SyncError::Persistence(_) => ErrorCode::StorageError,
            e if e.is_config_error() => ErrorCode::ConfigError,
            SyncError::Remote { .. }
            | SyncError::ConnectionFailed(_)
            | SyncError::Timeout(_)
            | SyncError::ImageReadFailed { .. }
            | SyncError::ImageUploadFailed(_) => ErrorCode::RemoteError,
            _ => {
                tracing::error!(error = %err, "Internal sync error");
                ErrorCode::Internal
            }
        };
        AppError::new(code, err.to_string())
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Local storage failed");
        AppError::new(ErrorCode::StorageError, err.to_string())
    }
}

impl From<PrintError> for AppError {
    fn from(err: PrintError) -> Self {
        AppError::new(ErrorCode::PrinterError, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
