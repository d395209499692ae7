//! # TokenCache Infrastructure
//!
//! Implementations of the `tokencache-core` ports.
//!
//! This crate contains:
//! - The cross-process file lock and the persistence aspect
//! - Secret stores (plain file, encrypted file, keychain, keyring) and
//!   platform selection
//! - Configuration loading from environment and files
//! - Error conversions and tracing bootstrap
//!
//! ## Architecture
//! - Implements traits defined in `tokencache-core`
//! - Depends on `tokencache-common`, `tokencache-domain` and `tokencache-core`
//! - Contains all "impure" code (file system, credential stores)

pub mod config;
pub mod errors;
pub mod file_lock;
pub mod observability;
pub mod persistence;
pub mod stores;

// Re-export commonly used items
pub use errors::InfraError;
pub use file_lock::{CrossProcessFileLock, FileLockGuard};
pub use persistence::PersistenceAspect;
pub use stores::{
    create_persistence_aspect, create_secret_store, CompanionFile, EncryptedFileSecretStore,
    FileSecretStore, KeychainSecretStore, KeyringSecretStore, StoreKind,
};
