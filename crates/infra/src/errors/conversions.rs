//! Conversions from external infrastructure errors into domain errors.

use keyring::Error as KeyringError;
use tokencache_common::{CommonError, ErrorClassification, ErrorSeverity, KeychainError};
use tokencache_domain::TokenCacheError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TokenCacheError);

impl From<InfraError> for TokenCacheError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TokenCacheError> for InfraError {
    fn from(value: TokenCacheError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTokenCacheError {
    fn into_token_cache(self) -> TokenCacheError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → TokenCacheError */
/* -------------------------------------------------------------------------- */

impl IntoTokenCacheError for KeyringError {
    fn into_token_cache(self) -> TokenCacheError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => TokenCacheError::StoreAccess("credential store entry not found".into()),
            BadEncoding(_) => {
                TokenCacheError::StoreAccess("credential in store is not valid UTF-8".into())
            }
            TooLong(name, limit) => TokenCacheError::Config(format!(
                "credential store attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => TokenCacheError::Config(format!(
                "credential store attribute '{attr}' is invalid: {reason}"
            )),
            Ambiguous(entries) => TokenCacheError::StoreAccess(format!(
                "multiple credential store entries matched request ({} results)",
                entries.len()
            )),
            PlatformFailure(err) => {
                TokenCacheError::StoreAccess(format!("credential store platform error: {err}"))
            }
            NoStorageAccess(err) => {
                TokenCacheError::StoreAccess(format!("unable to access secure storage: {err}"))
            }
            _ => TokenCacheError::StoreAccess(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_token_cache())
    }
}

/* -------------------------------------------------------------------------- */
/* KeychainError → TokenCacheError */
/* -------------------------------------------------------------------------- */

impl IntoTokenCacheError for KeychainError {
    fn into_token_cache(self) -> TokenCacheError {
        match self {
            KeychainError::AccessFailed(message) => TokenCacheError::StoreAccess(message),
            KeychainError::InvalidEntry(message) => {
                TokenCacheError::Config(format!("credential store entry cannot be addressed: {message}"))
            }
        }
    }
}

impl From<KeychainError> for InfraError {
    fn from(value: KeychainError) -> Self {
        InfraError(value.into_token_cache())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → TokenCacheError */
/* -------------------------------------------------------------------------- */

impl IntoTokenCacheError for std::io::Error {
    fn into_token_cache(self) -> TokenCacheError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::PermissionDenied => {
                TokenCacheError::StoreAccess(format!("permission denied: {self}"))
            }
            ErrorKind::NotFound => TokenCacheError::StoreAccess(format!("not found: {self}")),
            _ => TokenCacheError::StoreAccess(format!("I/O error: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_token_cache())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / toml → TokenCacheError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(TokenCacheError::Serialization(value.to_string()))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(TokenCacheError::Config(format!("Invalid TOML format: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* CommonError → TokenCacheError */
/* -------------------------------------------------------------------------- */

impl IntoTokenCacheError for CommonError {
    fn into_token_cache(self) -> TokenCacheError {
        let message = self.to_string();
        match self {
            CommonError::InvalidInput { .. } => TokenCacheError::Config(message),
            CommonError::Malformed { .. } => TokenCacheError::Serialization(message),
            CommonError::Crypto { .. } | CommonError::Io(_) => TokenCacheError::StoreAccess(message),
            CommonError::Internal(_) => TokenCacheError::Internal(message),
        }
    }
}

impl From<CommonError> for InfraError {
    fn from(value: CommonError) -> Self {
        InfraError(value.into_token_cache())
    }
}

/* -------------------------------------------------------------------------- */
/* Classification */
/* -------------------------------------------------------------------------- */

impl ErrorClassification for InfraError {
    fn is_retryable(&self) -> bool {
        matches!(self.0, TokenCacheError::LockAcquisition { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match &self.0 {
            TokenCacheError::LockAcquisition { .. } | TokenCacheError::InvalidInput(_) => {
                ErrorSeverity::Warning
            }
            TokenCacheError::StoreAccess(_)
            | TokenCacheError::Serialization(_)
            | TokenCacheError::Provider(_) => ErrorSeverity::Error,
            TokenCacheError::Config(_) | TokenCacheError::Internal(_) => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn keyring_no_entry_maps_to_store_access() {
        let err: TokenCacheError = InfraError::from(KeyringError::NoEntry).into();
        assert!(matches!(err, TokenCacheError::StoreAccess(message) if message.contains("not found")));
    }

    #[test]
    fn keyring_invalid_attribute_is_a_config_error() {
        let err: TokenCacheError =
            InfraError::from(KeyringError::Invalid("service".into(), "empty".into())).into();
        assert!(matches!(err, TokenCacheError::Config(_)));
    }

    #[test]
    fn io_errors_are_store_access_failures() {
        let err: TokenCacheError =
            InfraError::from(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")).into();
        assert!(err.is_persistence_failure());
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn common_errors_keep_their_category() {
        let err: TokenCacheError =
            InfraError::from(CommonError::malformed("base64", "bad padding")).into();
        assert!(matches!(err, TokenCacheError::Serialization(_)));

        let err: TokenCacheError = InfraError::from(CommonError::crypto("decrypt", "tag mismatch")).into();
        assert!(matches!(err, TokenCacheError::StoreAccess(_)));
    }

    #[test]
    fn lock_failures_are_retryable_warnings() {
        let err = InfraError(TokenCacheError::LockAcquisition { path: ".lockfile".into(), attempts: 60 });
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert!(!err.is_critical());

        let err = InfraError(TokenCacheError::Internal("index out of sync".into()));
        assert!(err.is_critical());
    }
}
