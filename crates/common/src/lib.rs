//! Low-level building blocks for the token cache crates.
//!
//! Features select what gets compiled:
//! - `foundation`: [`CommonError`] and the [`ErrorClassification`] trait
//! - `observability`: emit `tracing` events from the modules below
//! - `runtime`: AES-256-GCM sealing of cache documents ([`crypto`])
//! - `platform`: single-entry access to the OS credential store
//!   ([`security::KeychainProvider`])

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "foundation")]
pub mod error;

#[cfg(feature = "runtime")]
pub mod crypto;

#[cfg(feature = "platform")]
pub mod security;

#[cfg(feature = "runtime")]
pub use crypto::{EncryptedData, EncryptionService};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "platform")]
pub use security::{KeychainError, KeychainProvider};
