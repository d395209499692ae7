//! Platform selection of the secret store
//!
//! The store is chosen once, when the persistence layer is built:
//!
//! | Platform | Store |
//! |----------|-------|
//! | macOS | keychain item, companion file at the cache path |
//! | Linux | keyring item, or the plain file when `use_unprotected_file_on_linux` is set |
//! | Windows and others | AES-256-GCM encrypted file, key in the credential store |

use std::sync::Arc;

use tokencache_core::SecretStore;
use tokencache_domain::{PersistenceSettings, Result, TokenCacheError};
use tracing::info;

use super::encrypted_file::EncryptedFileSecretStore;
use super::file::FileSecretStore;
use super::keychain::KeychainSecretStore;
use super::secret_service::KeyringSecretStore;
use crate::file_lock::CrossProcessFileLock;
use crate::persistence::PersistenceAspect;

/// Which secret store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    PlainFile,
    EncryptedFile,
    Keychain,
    Keyring,
}

impl StoreKind {
    /// The store this platform uses for `settings`.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Config` on Linux when neither a keyring nor
    /// unprotected file storage is configured.
    pub fn for_current_platform(settings: &PersistenceSettings) -> Result<Self> {
        Self::for_platform(std::env::consts::OS, settings)
    }

    /// The store platform `os` (as in [`std::env::consts::OS`]) uses.
    ///
    /// # Errors
    /// See [`StoreKind::for_current_platform`].
    pub fn for_platform(os: &str, settings: &PersistenceSettings) -> Result<Self> {
        match os {
            "macos" => Ok(Self::Keychain),
            "linux" if settings.use_unprotected_file_on_linux => Ok(Self::PlainFile),
            "linux" if settings.keyring.is_some() => Ok(Self::Keyring),
            "linux" => Err(TokenCacheError::Config(
                "Linux needs keyring settings or use_unprotected_file_on_linux".into(),
            )),
            _ => Ok(Self::EncryptedFile),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlainFile => "plain_file",
            Self::EncryptedFile => "encrypted_file",
            Self::Keychain => "keychain",
            Self::Keyring => "keyring",
        }
    }

    /// Build the store of this kind.
    ///
    /// # Errors
    /// Whatever the store's constructor reports.
    pub fn build(self, settings: &PersistenceSettings) -> Result<Arc<dyn SecretStore>> {
        let store: Arc<dyn SecretStore> = match self {
            Self::PlainFile => Arc::new(FileSecretStore::new(settings.cache_file_path())),
            Self::EncryptedFile => Arc::new(EncryptedFileSecretStore::from_settings(settings)?),
            Self::Keychain => Arc::new(KeychainSecretStore::from_settings(settings)?),
            Self::Keyring => Arc::new(KeyringSecretStore::from_settings(settings)?),
        };
        Ok(store)
    }
}

/// The secret store for the current platform.
///
/// # Errors
/// Returns `TokenCacheError::Config` for invalid settings and whatever the
/// selected store's constructor reports.
pub fn create_secret_store(settings: &PersistenceSettings) -> Result<Arc<dyn SecretStore>> {
    settings.validate()?;
    let kind = StoreKind::for_current_platform(settings)?;
    info!(
        store = kind.as_str(),
        path = %settings.cache_file_path().display(),
        "secret_store.selected"
    );
    kind.build(settings)
}

/// Persistence aspect over the current platform's store and the settings'
/// lock file.
///
/// # Errors
/// See [`create_secret_store`].
pub fn create_persistence_aspect(settings: &PersistenceSettings) -> Result<PersistenceAspect> {
    let store = create_secret_store(settings)?;
    Ok(PersistenceAspect::new(store, CrossProcessFileLock::for_settings(settings)))
}
