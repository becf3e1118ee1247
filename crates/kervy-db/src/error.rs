//! Errors from the local database.
//!
//! ```text
//! sqlx::Error / MigrateError ──► DbError ──► SyncError::Persistence ──► STORAGE_ERROR
//! ```
//!
//! None of these are retried: a queue that cannot be written is reported to
//! the operator instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The database file could not be created or opened.
    #[error("Cannot open local database: {0}")]
    ConnectionFailed(String),

    #[error("Local schema migration failed: {0}")]
    MigrationFailed(String),

    /// A statement was rejected (disk full, read-only file, corrupt page).
    #[error("Local storage query failed: {0}")]
    QueryFailed(String),

    /// Every pooled connection stayed busy past the timeout.
    #[error("Local database is busy")]
    PoolExhausted,

    #[error("Local storage error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("database already closed".into()),
            sqlx::Error::Io(io) => DbError::QueryFailed(io.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
