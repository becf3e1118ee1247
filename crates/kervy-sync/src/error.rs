//! # Sync Errors
//!
//! Everything that can go wrong between the terminal and the remote store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  setup                network               remote answer              │
//! │  ─────                ───────               ─────────────              │
//! │  InvalidConfig        Offline               Remote { status }          │
//! │  InvalidUrl           ConnectionFailed      NotFound                   │
//! │  ConfigLoadFailed     Timeout               NotAuthenticated           │
//! │  ConfigSaveFailed                           AuthFailed                 │
//! │                                             ImageReadFailed            │
//! │                                             ImageUploadFailed          │
//! │                                                                         │
//! │  local                encoding              Internal                   │
//! │  ─────                ────────                                          │
//! │  Persistence          SerializationFailed                               │
//! │  (from DbError)       DeserializationFailed                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A network failure while writing never surfaces: the write goes to the
//! offline queue. A remote rejection while online is shown to the operator
//! and the write is dropped. Failures inside a flush are logged by the agent
//! and the item stays queued.

use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Setup
    // =========================================================================
    #[error("Bad sync settings: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Settings file exists but could not be read or parsed.
    #[error("Cannot read settings: {0}")]
    ConfigLoadFailed(String),

    #[error("Cannot write settings: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Network
    // =========================================================================
    /// An online-only operation was attempted while disconnected.
    #[error("No internet connection")]
    Offline,

    #[error("Cannot reach remote store: {0}")]
    ConnectionFailed(String),

    #[error("Remote store timed out: {0}")]
    Timeout(String),

    // =========================================================================
    // Remote answers
    // =========================================================================
    #[error("Remote store rejected request ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("{collection} document not found: {id}")]
    NotFound { collection: String, id: String },

    /// No signed-in user, or the session has no ID token.
    #[error("Not signed in")]
    NotAuthenticated,

    /// Carries the identity provider's reason code (`EMAIL_EXISTS`, ...).
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Cannot read image {uri}: {reason}")]
    ImageReadFailed { uri: String, reason: String },

    #[error("Image upload failed: {0}")]
    ImageUploadFailed(String),

    // =========================================================================
    // Local and encoding
    // =========================================================================
    #[error("Local storage error: {0}")]
    Persistence(String),

    #[error("Cannot encode record: {0}")]
    SerializationFailed(String),

    #[error("Cannot decode record: {0}")]
    DeserializationFailed(String),

    /// Misuse of the agent or a poisoned lock.
    #[error("Sync internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Conversions
// =============================================================================

impl From<kervy_db::DbError> for SyncError {
    fn from(err: kervy_db::DbError) -> Self {
        SyncError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        let text = err.to_string();
        if err.is_io() {
            SyncError::SerializationFailed(text)
        } else {
            SyncError::DeserializationFailed(text)
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        let text = err.to_string();
        match err.status() {
            _ if err.is_timeout() => SyncError::Timeout(text),
            _ if err.is_decode() => SyncError::DeserializationFailed(text),
            Some(status) => SyncError::Remote {
                status: status.as_u16(),
                message: text,
            },
            None => SyncError::ConnectionFailed(text),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.message().to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl SyncError {
    /// Whether the same request could succeed later: network trouble,
    /// rate limiting (429) or a server-side failure (5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Offline | SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => true,
            SyncError::Remote { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
