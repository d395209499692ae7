//! Secret store implementations
//!
//! Every store satisfies [`tokencache_core::SecretStore`]. File-backed
//! stores report the cache file's modification time; credential-backed
//! stores touch a companion file on each write or delete so the persistence
//! aspect still has a timestamp to compare.

pub mod companion;
pub mod encrypted_file;
pub mod factory;
pub mod file;
pub mod keychain;
pub mod secret_service;

mod credential;

pub use companion::CompanionFile;
pub use encrypted_file::EncryptedFileSecretStore;
pub use factory::{create_persistence_aspect, create_secret_store, StoreKind};
pub use file::FileSecretStore;
pub use keychain::KeychainSecretStore;
pub use secret_service::KeyringSecretStore;
