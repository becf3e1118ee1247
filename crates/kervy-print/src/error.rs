//! # Print Error Types
//!
//! Printer failures are reported to the operator. A failed receipt never
//! undoes the sale it belongs to.

use thiserror::Error;

/// Result type alias for printer operations.
pub type PrintResult<T> = Result<T, PrintError>;

/// Printer errors.
#[derive(Debug, Error)]
pub enum PrintError {
    /// No printer is paired with this profile.
    #[error("No printer configured")]
    NoPrinter,

    /// The printer could not be reached.
    #[error("Cannot connect to printer at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    /// A command was sent before `connect`.
    #[error("Printer is not connected")]
    NotConnected,

    /// Writing to the printer failed part-way.
    #[error("Printer write failed: {0}")]
    WriteFailed(String),

    /// Column widths, alignments and cells disagree.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

impl From<std::io::Error> for PrintError {
    fn from(err: std::io::Error) -> Self {
        PrintError::WriteFailed(err.to_string())
    }
}

impl PrintError {
    /// True when retrying the print job may help.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PrintError::ConnectionFailed { .. } | PrintError::WriteFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_becomes_write_failed() {
        let err: PrintError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, PrintError::WriteFailed(_)));
        assert!(err.is_transient());
        assert!(!PrintError::NoPrinter.is_transient());
    }
}
