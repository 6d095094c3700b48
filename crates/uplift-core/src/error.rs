//! Error types for Uplift.
//!
//! This module provides a unified error type for all Uplift operations,
//! with specific error variants for different failure modes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized `Result` type for Uplift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Uplift.
#[derive(Error, Debug)]
pub enum Error {
    /// Path does not point to a regular file (E001)
    #[error("not a regular file: {}", path.display())]
    NotAFile {
        /// The offending path
        path: PathBuf,
    },

    /// Transport-level failure while sending a file (E002)
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a non-success status code (E003)
    #[error("server rejected upload with status {0}")]
    HttpStatus(u16),

    /// Server response could not be interpreted (E004)
    #[error("invalid server response: {0}")]
    InvalidResponse(String),

    /// In-flight upload was cancelled via its cancel handle
    #[error("upload cancelled")]
    Cancelled,

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::NotAFile { .. } => Some("E001"),
            Self::Transport(_) => Some("E002"),
            Self::HttpStatus(_) => Some("E003"),
            Self::InvalidResponse(_) => Some("E004"),
            _ => None,
        }
    }

    /// Returns whether this error is recoverable (the upload can be retried).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::HttpStatus(_) | Self::Cancelled
        )
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotAFile { .. } => Some("Only regular files can be uploaded; directories and special files are skipped."),
            Self::Transport(_) => Some(
                "Check that the upload endpoint is reachable:\n\
                   uplift config get transport.endpoint",
            ),
            Self::HttpStatus(_) => Some(
                "The server refused the file. Verify the endpoint accepts multipart uploads\n\
                 and that the file type is allowed.",
            ),
            Self::ConfigError(_) => Some(
                "The configuration file may be corrupt. Reset it with:\n\
                   uplift config reset",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::NotAFile {
                path: PathBuf::from("/tmp")
            }
            .code(),
            Some("E001")
        );
        assert_eq!(Error::Transport("reset".to_string()).code(), Some("E002"));
        assert_eq!(Error::HttpStatus(500).code(), Some("E003"));
        assert_eq!(Error::Cancelled.code(), None);
    }

    #[test]
    fn test_recoverable_errors_are_retryable() {
        assert!(Error::Transport("reset".to_string()).is_recoverable());
        assert!(Error::HttpStatus(503).is_recoverable());
        assert!(Error::Cancelled.is_recoverable());
        assert!(!Error::NotAFile {
            path: PathBuf::from("/tmp")
        }
        .is_recoverable());
    }
}
