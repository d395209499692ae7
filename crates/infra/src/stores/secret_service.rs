//! Linux keyring (Secret Service) store

use std::path::PathBuf;
use std::time::SystemTime;

use tokencache_common::KeychainProvider;
use tokencache_core::SecretStore;
use tokencache_domain::{KeyringAttribute, KeyringSettings, PersistenceSettings, Result, TokenCacheError};
use tracing::debug;

use super::companion::CompanionFile;
use super::credential::CredentialBackedStore;
use crate::errors::InfraError;

/// Cache document kept as a Secret Service item.
///
/// The item lives in `collection`; the first attribute pair selects the
/// service and the second the user of the credential (falling back to the
/// schema name and label when absent). Schema and label are otherwise only
/// reported in diagnostics.
#[derive(Debug)]
pub struct KeyringSecretStore {
    inner: CredentialBackedStore,
    settings: KeyringSettings,
}

impl KeyringSecretStore {
    /// # Errors
    /// Returns `TokenCacheError::Config` if the item cannot be addressed.
    pub fn new(settings: &KeyringSettings, companion: impl Into<PathBuf>) -> Result<Self> {
        let service = settings
            .attribute1
            .as_ref()
            .map_or_else(|| settings.schema_name.clone(), attribute_selector);
        let user = settings
            .attribute2
            .as_ref()
            .map_or_else(|| settings.label.clone(), attribute_selector);

        let provider = KeychainProvider::with_target(&settings.collection, service, user)
            .map_err(InfraError::from)?;
        debug!(
            collection = %settings.collection,
            schema = %settings.schema_name,
            label = %settings.label,
            "keyring_store.addressed"
        );

        Ok(Self {
            inner: CredentialBackedStore::new(provider, CompanionFile::new(companion), "keyring"),
            settings: settings.clone(),
        })
    }

    /// Store addressed by `settings.keyring`, companion at the cache file path.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Config` when no keyring is configured.
    pub fn from_settings(settings: &PersistenceSettings) -> Result<Self> {
        let keyring = settings
            .keyring
            .as_ref()
            .ok_or_else(|| TokenCacheError::Config("keyring settings are required".into()))?;
        Self::new(keyring, settings.cache_file_path())
    }

    #[must_use]
    pub const fn settings(&self) -> &KeyringSettings {
        &self.settings
    }

    #[must_use]
    pub fn companion(&self) -> &CompanionFile {
        self.inner.companion()
    }
}

fn attribute_selector(attribute: &KeyringAttribute) -> String {
    format!("{}={}", attribute.key, attribute.value)
}

impl SecretStore for KeyringSecretStore {
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
