//! # TokenCache Domain
//!
//! Data model of the OAuth2/OIDC token cache.
//!
//! This crate contains:
//! - Cache entities (accounts, access/refresh/ID tokens, app metadata)
//! - Composite key builders and scope normalization
//! - Persistence configuration and its validation
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure data and value logic, no I/O

pub mod config;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod macros;
pub mod utils;

// Re-export commonly used items
pub use config::{
    KeychainSettings, KeyringAttribute, KeyringSettings, LockRetrySettings, PersistenceSettings,
    PersistenceSettingsBuilder,
};
pub use entities::*;
pub use errors::*;
pub use keys::AccountScope;
