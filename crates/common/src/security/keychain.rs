//! Keychain provider for a single secure credential entry
//!
//! Thin wrapper over the platform credential store (macOS Keychain Access,
//! Windows Credential Manager, Linux Secret Service API). Each provider
//! addresses exactly one entry and holds on to it for its whole lifetime, so
//! repeated reads and writes observe each other even under
//! `keyring::mock`.
//!
//! ## Usage
//!
//! ```no_run
//! use tokencache_common::security::keychain::KeychainProvider;
//!
//! let keychain = KeychainProvider::new("tokencache.cache", "TokenCache")?;
//! keychain.write_secret(b"{}")?;
//! assert_eq!(keychain.read_secret()?, Some(b"{}".to_vec()));
//! # Ok::<(), tokencache_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use rand::RngCore;
use thiserror::Error;
use tracing::debug;


/// Credential store entry addressed by service and account
pub struct KeychainProvider {
    service_name: String,
    account: String,
    entry: Entry,
}

impl std::fmt::Debug for KeychainProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainProvider")
            .field("service_name", &self.service_name)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl KeychainProvider {
    /// Create a provider for `service` / `account` in the default store.
    ///
    /// # Errors
    /// Returns `KeychainError::InvalidEntry` if the entry cannot be created
    /// (e.g. empty or over-long attributes).
    pub fn new(
        service_name: impl Into<String>,
        account: impl Into<String>,
    ) -> Result<Self, KeychainError> {
        let service_name = service_name.into();
        let account = account.into();
        let entry = Entry::new(&service_name, &account)
            .map_err(|e| KeychainError::InvalidEntry(e.to_string()))?;
        Ok(Self { service_name, account, entry })
    }

    /// Create a provider whose entry lives in a specific target (a Secret
    /// Service collection on Linux, a target name on Windows).
    ///
    /// # Errors
    /// Returns `KeychainError::InvalidEntry` if the entry cannot be created.
    pub fn with_target(
        target: &str,
        service_name: impl Into<String>,
        account: impl Into<String>,
    ) -> Result<Self, KeychainError> {
        let service_name = service_name.into();
        let account = account.into();
        let entry = Entry::new_with_target(target, &service_name, &account)
            .map_err(|e| KeychainError::InvalidEntry(e.to_string()))?;
        Ok(Self { service_name, account, entry })
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Read the stored bytes; `None` when the entry does not exist.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the store is unavailable.
    pub fn read_secret(&self) -> Result<Option<Vec<u8>>, KeychainError> {
        debug!(service = %self.service_name, account = %self.account, "Reading secret from keychain");

        match self.entry.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service_name, account = %self.account, "No keychain entry");
                Ok(None)
            }
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to read secret for {}/{}: {}",
                self.service_name, self.account, e
            ))),
        }
    }

    /// Replace the stored bytes.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the store rejects the write.
    pub fn write_secret(&self, secret: &[u8]) -> Result<(), KeychainError> {
        debug!(
            service = %self.service_name,
            account = %self.account,
            bytes = secret.len(),
            "Storing secret in keychain"
        );

        self.entry.set_secret(secret).map_err(|e| {
            KeychainError::AccessFailed(format!(
                "Failed to store secret for {}/{}: {}",
                self.service_name, self.account, e
            ))
        })
    }

    /// Delete the entry (idempotent).
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` for failures other than a
    /// missing entry.
    pub fn delete_secret(&self) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, account = %self.account, "Deleting secret from keychain");

        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {}/{}: {}",
                self.service_name, self.account, e
            ))),
        }
    }

    /// Return the stored key, generating and storing `key_size` random bytes
    /// on first use.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails.
    pub fn get_or_create_key(&self, key_size: usize) -> Result<Vec<u8>, KeychainError> {
        if let Some(key) = self.read_secret()? {
            if key.len() == key_size {
                debug!(service = %self.service_name, "Existing encryption key found");
                return Ok(key);
            }
            debug!(
                service = %self.service_name,
                found = key.len(),
                expected = key_size,
                "Stored key has the wrong size, replacing"
            );
        }

        let mut key = vec![0u8; key_size];
        rand::thread_rng().fill_bytes(&mut key);
        self.write_secret(&key)?;

        debug!(service = %self.service_name, "New encryption key generated and stored");
        Ok(key)
    }
}

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// The service/account/target triple cannot address an entry
    #[error("Invalid keychain entry: {0}")]
    InvalidEntry(String),
}
