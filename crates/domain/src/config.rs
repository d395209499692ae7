//! Persistence configuration
//!
//! Describes where the shared cache lives, how each platform's secret store
//! is addressed, and how long the cross-process lock keeps retrying.
//! Invalid combinations are rejected by [`PersistenceSettingsBuilder::build`]
//! rather than at first cache access.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_KEYCHAIN_ACCOUNT, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_LOCK_RETRY_COUNT,
    DEFAULT_LOCK_RETRY_DELAY_MS, LOCK_FILE_NAME,
};
use crate::errors::{Result, TokenCacheError};

/// Keychain addressing (macOS)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeychainSettings {
    pub service: String,
    pub account: String,
}

impl Default for KeychainSettings {
    fn default() -> Self {
        Self {
            service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            account: DEFAULT_KEYCHAIN_ACCOUNT.to_string(),
        }
    }
}

/// One key/value attribute attached to a keyring item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringAttribute {
    pub key: String,
    pub value: String,
}

impl KeyringAttribute {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Keyring addressing (Linux secret service)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringSettings {
    pub collection: String,
    pub schema_name: String,
    pub label: String,
    pub attribute1: Option<KeyringAttribute>,
    pub attribute2: Option<KeyringAttribute>,
}

/// Cross-process lock retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRetrySettings {
    /// Pause between attempts, milliseconds (>= 1)
    pub delay_ms: u64,
    /// Number of attempts (>= 1)
    pub retry_count: u32,
}

impl Default for LockRetrySettings {
    fn default() -> Self {
        Self { delay_ms: DEFAULT_LOCK_RETRY_DELAY_MS, retry_count: DEFAULT_LOCK_RETRY_COUNT }
    }
}

impl LockRetrySettings {
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Validated persistence configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceSettings {
    pub cache_file_name: String,
    pub cache_directory: PathBuf,
    #[serde(default)]
    pub keychain: KeychainSettings,
    #[serde(default)]
    pub keyring: Option<KeyringSettings>,
    /// Store the cache as a plain file on Linux instead of the keyring
    #[serde(default)]
    pub use_unprotected_file_on_linux: bool,
    #[serde(default)]
    pub lock_retry: LockRetrySettings,
}

impl PersistenceSettings {
    /// Start building settings for `{cache_directory}/{cache_file_name}`.
    pub fn builder(
        cache_file_name: impl Into<String>,
        cache_directory: impl Into<PathBuf>,
    ) -> PersistenceSettingsBuilder {
        PersistenceSettingsBuilder {
            settings: Self {
                cache_file_name: cache_file_name.into(),
                cache_directory: cache_directory.into(),
                keychain: KeychainSettings::default(),
                keyring: None,
                use_unprotected_file_on_linux: false,
                lock_retry: LockRetrySettings::default(),
            },
        }
    }

    /// Path of the persisted cache (or, for keychain/keyring storage, of the
    /// companion file whose modification time tracks writes).
    #[must_use]
    pub fn cache_file_path(&self) -> PathBuf {
        self.cache_directory.join(&self.cache_file_name)
    }

    /// Sentinel file used by the cross-process lock.
    #[must_use]
    pub fn lock_file_path(&self) -> PathBuf {
        self.cache_directory.join(LOCK_FILE_NAME)
    }

    #[must_use]
    pub fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    /// Validate value ranges and mutually exclusive options.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Config` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.cache_file_name.trim().is_empty() {
            return Err(TokenCacheError::Config("cache file name cannot be empty".to_string()));
        }
        if self.cache_directory.as_os_str().is_empty() {
            return Err(TokenCacheError::Config("cache directory cannot be empty".to_string()));
        }
        if self.lock_retry.delay_ms < 1 {
            return Err(TokenCacheError::Config(
                "lock retry delay must be at least 1 ms".to_string(),
            ));
        }
        if self.lock_retry.retry_count < 1 {
            return Err(TokenCacheError::Config(
                "lock retry count must be at least 1".to_string(),
            ));
        }
        if self.keyring.is_some() && self.use_unprotected_file_on_linux {
            return Err(TokenCacheError::Config(
                "keyring and unprotected file storage are mutually exclusive".to_string(),
            ));
        }
        if let Some(keyring) = &self.keyring {
            if keyring.schema_name.trim().is_empty() {
                return Err(TokenCacheError::Config(
                    "keyring schema name cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Fluent builder for [`PersistenceSettings`]
#[derive(Debug, Clone)]
pub struct PersistenceSettingsBuilder {
    settings: PersistenceSettings,
}

impl PersistenceSettingsBuilder {
    #[must_use]
    pub fn keychain(mut self, service: impl Into<String>, account: impl Into<String>) -> Self {
        self.settings.keychain = KeychainSettings { service: service.into(), account: account.into() };
        self
    }

    #[must_use]
    pub fn keyring(
        mut self,
        collection: impl Into<String>,
        schema_name: impl Into<String>,
        label: impl Into<String>,
        attribute1: Option<KeyringAttribute>,
        attribute2: Option<KeyringAttribute>,
    ) -> Self {
        self.settings.keyring = Some(KeyringSettings {
            collection: collection.into(),
            schema_name: schema_name.into(),
            label: label.into(),
            attribute1,
            attribute2,
        });
        self
    }

    #[must_use]
    pub const fn use_unprotected_file_on_linux(mut self) -> Self {
        self.settings.use_unprotected_file_on_linux = true;
        self
    }

    #[must_use]
    pub const fn lock_retry(mut self, delay_ms: u64, retry_count: u32) -> Self {
        self.settings.lock_retry = LockRetrySettings { delay_ms, retry_count };
        self
    }

    /// Finish and validate.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Config` when the combination is invalid,
    /// e.g. both keyring and unprotected file storage were requested.
    pub fn build(self) -> Result<PersistenceSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_paths() {
        let settings = PersistenceSettings::builder("cache.bin", "/tmp/tc").build().unwrap();
        assert_eq!(settings.cache_file_path(), PathBuf::from("/tmp/tc/cache.bin"));
        assert_eq!(settings.lock_file_path(), PathBuf::from("/tmp/tc/.lockfile"));
        assert_eq!(settings.lock_retry, LockRetrySettings::default());
        assert_eq!(settings.keychain.service, DEFAULT_KEYCHAIN_SERVICE);
    }

    #[test]
    fn keyring_and_unprotected_file_are_exclusive() {
        let result = PersistenceSettings::builder("cache.bin", "/tmp/tc")
            .keyring("default", "tokencache.schema", "Token cache", None, None)
            .use_unprotected_file_on_linux()
            .build();
        assert!(matches!(result, Err(TokenCacheError::Config(msg)) if msg.contains("mutually exclusive")));
    }

    #[test]
    fn lock_retry_bounds() {
        let zero_delay = PersistenceSettings::builder("c", "/tmp").lock_retry(0, 5).build();
        assert!(zero_delay.is_err());

        let zero_count = PersistenceSettings::builder("c", "/tmp").lock_retry(5, 0).build();
        assert!(zero_count.is_err());

        let ok = PersistenceSettings::builder("c", "/tmp").lock_retry(1, 1).build().unwrap();
        assert_eq!(ok.lock_retry.delay(), Duration::from_millis(1));
    }

    #[test]
    fn empty_names_rejected() {
        assert!(PersistenceSettings::builder("  ", "/tmp").build().is_err());
        assert!(PersistenceSettings::builder("c", "").build().is_err());
    }
}
