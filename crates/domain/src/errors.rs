//! Error types used throughout the token cache

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for token cache operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TokenCacheError {
    /// Retries exhausted while acquiring the cross-process file lock
    #[error("Failed to acquire cache lock '{path}' after {attempts} attempts")]
    LockAcquisition { path: String, attempts: u32 },

    /// Reading, writing or deleting the backing secret store failed
    #[error("Secret store access error: {0}")]
    StoreAccess(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The identity provider (token endpoint) rejected or failed the request
    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenCacheError {
    /// Stable label suitable for metrics and log fields.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::LockAcquisition { .. } => "lock_acquisition",
            Self::StoreAccess(_) => "store_access",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Provider(_) => "provider",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the failure originates in the persistence layer rather than
    /// the identity provider.
    #[must_use]
    pub const fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::LockAcquisition { .. } | Self::StoreAccess(_) | Self::Serialization(_))
    }
}

/// Result type alias for token cache operations
pub type Result<T> = std::result::Result<T, TokenCacheError>;
