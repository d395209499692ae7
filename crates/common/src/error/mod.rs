//! Shared error type and classification for the low-level building blocks
//!
//! `CommonError` covers the failures of the primitives in this crate
//! (payload encoding, symmetric encryption, raw I/O). Higher layers convert
//! it into their own error type; the infra crate maps every variant onto a
//! `TokenCacheError`.
//!
//! [`ErrorClassification`] lets callers decide how to react to an error
//! without matching on its variants. The infra crate implements it for its
//! error newtype, and the persistence layer logs swallowed read failures at
//! the reported [`ErrorSeverity`].
//!
//! | Severity | Meaning here |
//! |----------|--------------|
//! | **Info** | Expected, e.g. nothing persisted yet |
//! | **Warning** | Degraded, e.g. lock contention |
//! | **Error** | The operation failed, e.g. unreadable payload |
//! | **Critical** | Setup is wrong, e.g. bad key length |

use std::fmt;

use thiserror::Error;

/// Result alias for this crate
pub type CommonResult<T> = Result<T, CommonError>;

/// Failures of the shared primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    /// Caller supplied an unusable value (key length, nonce size, ...)
    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// A payload could not be encoded or decoded
    #[error("malformed {format} payload: {message}")]
    Malformed { format: String, message: String },

    /// Encryption or decryption failed (wrong key, tampered payload)
    #[error("{operation} failed: {message}")]
    Crypto { operation: &'static str, message: String },

    /// Underlying file system failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommonError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput { field: field.into(), message: message.into() }
    }

    pub fn malformed(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed { format: format.into(), message: message.into() }
    }

    pub fn crypto(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Crypto { operation, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable label for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Malformed { .. } => "malformed",
            Self::Crypto { .. } => "crypto",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed("json", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Uniform way of asking an error how bad it is
pub trait ErrorClassification {
    /// Transient failure that may succeed on another attempt.
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Ordered severity levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `CommonError::invalid_input` for a bad key length.
    ///
    /// Assertions:
    /// - The message names the field.
    /// - The kind label is stable.
    #[test]
    fn test_invalid_input_message() {
        let err = CommonError::invalid_input("key", "must be exactly 32 bytes");
        assert_eq!(err.to_string(), "invalid key: must be exactly 32 bytes");
        assert_eq!(err.kind(), "invalid_input");
    }

    /// Validates crypto and I/O failures.
    ///
    /// Assertions:
    /// - A failed decryption names the operation.
    /// - `From<std::io::Error>` keeps the OS message.
    #[test]
    fn test_crypto_and_io_errors() {
        let err = CommonError::crypto("decrypt", "tag mismatch");
        assert_eq!(err.to_string(), "decrypt failed: tag mismatch");
        assert_eq!(err.kind(), "crypto");

        let err: CommonError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().contains("denied"));
    }

    struct Contention;

    impl ErrorClassification for Contention {
        fn is_retryable(&self) -> bool {
            true
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }
    }

    #[test]
    fn test_is_critical_follows_severity() {
        assert!(!Contention.is_critical());
        assert!(Contention.is_retryable());
    }

    /// Validates `From<serde_json::Error>`.
    ///
    /// Assertions:
    /// - The result is a malformed JSON payload.
    #[test]
    fn test_conversion_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid").unwrap_err();
        let err: CommonError = json_err.into();
        assert!(matches!(err, CommonError::Malformed { ref format, .. } if format == "json"));
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
