//! # TokenCache Core
//!
//! Cache logic with no platform dependencies.
//!
//! This crate contains:
//! - The in-memory token cache with matching, cascade delete and the
//!   account back-reference index
//! - The cache document serializer
//! - Ports for secret stores, persistence hooks and the token provider
//! - Silent token acquisition on top of a shared cache
//!
//! ## Architecture Principles
//! - Only depends on `tokencache-domain`
//! - No file system, keychain or HTTP code
//! - All external effects go through traits in [`ports`]

pub mod acquire;
pub mod cache;
pub mod clock;
pub mod ports;

pub use acquire::SilentTokenService;
pub use cache::{
    AccessTokenLookup, AccessTokenQuery, CacheSnapshot, CacheStats, CachedAccessToken,
    RemovalSummary, SavedTokens, SharedTokenCache, TokenCache,
};
pub use ports::{CacheAccessAspect, CacheAccessContext, SecretStore, TokenProvider};
