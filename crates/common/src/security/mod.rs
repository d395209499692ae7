//! Security primitives
//!
//! Access to the platform credential stores used to hold the serialized
//! cache (or the key that encrypts it).

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider};
