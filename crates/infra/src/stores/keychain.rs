//! macOS keychain store

use std::path::PathBuf;
use std::time::SystemTime;

use tokencache_common::KeychainProvider;
use tokencache_core::SecretStore;
use tokencache_domain::{KeychainSettings, PersistenceSettings, Result};

use super::companion::CompanionFile;
use super::credential::CredentialBackedStore;
use crate::errors::InfraError;

/// Cache document kept as a generic password item (service + account).
#[derive(Debug)]
pub struct KeychainSecretStore {
    inner: CredentialBackedStore,
}

impl KeychainSecretStore {
    /// Address `keychain.service` / `keychain.account`; `companion` is the
    /// file whose mtime tracks changes.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Config` if the item cannot be addressed.
    pub fn new(keychain: &KeychainSettings, companion: impl Into<PathBuf>) -> Result<Self> {
        let provider =
            KeychainProvider::new(&keychain.service, &keychain.account).map_err(InfraError::from)?;
        Ok(Self {
            inner: CredentialBackedStore::new(provider, CompanionFile::new(companion), "keychain"),
        })
    }

    /// Store addressed by `settings.keychain`, companion at the cache file path.
    ///
    /// # Errors
    /// See [`KeychainSecretStore::new`].
    pub fn from_settings(settings: &PersistenceSettings) -> Result<Self> {
        Self::new(&settings.keychain, settings.cache_file_path())
    }

    #[must_use]
    pub fn service(&self) -> &str {
        self.inner.provider().service_name()
    }

    #[must_use]
    pub fn account(&self) -> &str {
        self.inner.provider().account()
    }

    #[must_use]
    pub fn companion(&self) -> &CompanionFile {
        self.inner.companion()
    }
}

impl SecretStore for KeychainSecretStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        self.inner.read()
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        self.inner.write(data)
    }

    fn delete(&self) -> Result<()> {
        self.inner.delete()
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.inner.last_modified()
    }
}
