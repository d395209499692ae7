//! AES-256-GCM encrypted file store

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokencache_common::crypto::encryption::KEY_LEN;
use tokencache_common::crypto::EncryptionService;
use tokencache_common::KeychainProvider;
use tokencache_core::SecretStore;
use tokencache_domain::{KeychainSettings, PersistenceSettings, Result, TokenCacheError};
use tracing::debug;

use super::file::FileSecretStore;
use crate::errors::InfraError;

/// Cache document sealed with AES-256-GCM before it reaches the disk.
///
/// The file holds the base64 envelope produced by [`EncryptionService`]; a
/// file that does not decrypt is reported as a store access error, which the
/// persistence aspect treats as "nothing persisted".
pub struct EncryptedFileSecretStore {
    file: FileSecretStore,
    encryption: EncryptionService,
}

impl std::fmt::Debug for EncryptedFileSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileSecretStore").field("path", &self.file.path()).finish_non_exhaustive()
    }
}

impl EncryptedFileSecretStore {
    /// Encrypt with a caller supplied 32-byte key.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Config` for a key of the wrong length.
    pub fn new(path: impl Into<PathBuf>, key: Vec<u8>) -> Result<Self> {
        let encryption = EncryptionService::new(key).map_err(InfraError::from)?;
        Ok(Self { file: FileSecretStore::new(path), encryption })
    }

    /// Encrypt with a key kept in the platform credential store, generated
    /// on first use.
    ///
    /// # Errors
    /// Returns `TokenCacheError::StoreAccess` if the key cannot be read or
    /// stored.
    pub fn with_stored_key(path: impl Into<PathBuf>, keychain: &KeychainSettings) -> Result<Self> {
        let provider = KeychainProvider::new(format!("{}.key", keychain.service), &keychain.account)
            .map_err(InfraError::from)?;
        let key = provider.get_or_create_key(KEY_LEN).map_err(InfraError::from)?;
        debug!(service = %provider.service_name(), "encrypted_file_store.key_loaded");
        Self::new(path, key)
    }

    /// Store at the settings' cache file path, keyed through
    /// `settings.keychain`.
    ///
    /// # Errors
    /// See [`EncryptedFileSecretStore::with_stored_key`].
    pub fn from_settings(settings: &PersistenceSettings) -> Result<Self> {
        Self::with_stored_key(settings.cache_file_path(), &settings.keychain)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl SecretStore for EncryptedFileSecretStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        let Some(sealed) = self.file.read()? else {
            return Ok(None);
        };
        let sealed = std::str::from_utf8(&sealed).map_err(|e| {
            TokenCacheError::StoreAccess(format!("encrypted cache is not an envelope: {e}"))
        })?;
        let plain = self.encryption.decrypt_from_string(sealed).map_err(InfraError::from)?;
        Ok(Some(plain))
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let sealed = self.encryption.encrypt_to_string(data).map_err(InfraError::from)?;
        self.file.write(sealed.as_bytes())
    }

    fn delete(&self) -> Result<()> {
        self.file.delete()
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.file.last_modified()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn content_on_disk_is_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let store = EncryptedFileSecretStore::new(&path, EncryptionService::generate_key()).unwrap();

        store.write(br#"{"AccessToken":{}}"#).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("AccessToken"));
        assert_eq!(store.read().unwrap().as_deref(), Some(&br#"{"AccessToken":{}}"#[..]));
    }

    #[test]
    fn wrong_key_is_a_store_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        EncryptedFileSecretStore::new(&path, EncryptionService::generate_key())
            .unwrap()
            .write(b"{}")
            .unwrap();

        let other = EncryptedFileSecretStore::new(&path, EncryptionService::generate_key()).unwrap();
        let err = other.read().unwrap_err();
        assert!(err.is_persistence_failure(), "unexpected error: {err:?}");
    }

    #[test]
    fn short_key_is_rejected() {
        let err = EncryptedFileSecretStore::new("cache.bin", vec![0; 16]).unwrap_err();
        assert!(matches!(err, TokenCacheError::Config(_)));
    }
}
