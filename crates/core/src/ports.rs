//! Ports the token cache talks through.
//!
//! Implementations live in `tokencache-infra` (secret stores, persistence
//! aspect) or are supplied by the integrator (token provider).

use std::time::SystemTime;

use tokencache_domain::{RefreshTokenEntity, Result, SilentTokenRequest, TokenResponse};

use crate::cache::TokenCache;

/// Opaque byte store holding the serialized cache.
///
/// Three platform flavours exist (encrypted file, OS keychain, OS keyring)
/// plus a plain file; all satisfy this contract.
pub trait SecretStore: Send + Sync {
    /// Stored bytes, or `None` when nothing has been persisted yet.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored bytes.
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Remove the stored bytes. Deleting a missing blob is not an error.
    fn delete(&self) -> Result<()>;

    /// Modification time of the persisted data, used to skip re-reading an
    /// unchanged store. `None` means unknown and always forces a read.
    fn last_modified(&self) -> Option<SystemTime>;
}

/// What a cache access is about to do.
#[derive(Debug, Clone, Copy)]
pub struct CacheAccessContext<'a> {
    pub token_cache: &'a TokenCache,
    pub client_id: &'a str,
    /// `true` when the access mutates the cache (token acquisition)
    pub has_cache_changed: bool,
}

/// Hooks run around every access to a shared token cache.
///
/// `after_cache_access` is always called once `before_cache_access`
/// returned, including when the access itself failed.
pub trait CacheAccessAspect: Send + Sync {
    /// Synchronize the in-memory cache with the persisted copy.
    ///
    /// # Errors
    /// Lock or store failures that make a mutating access unsafe.
    fn before_cache_access(&self, context: &CacheAccessContext<'_>) -> Result<()>;

    /// Persist a mutated cache and release anything `before` acquired.
    ///
    /// # Errors
    /// Write failures; never swallowed.
    fn after_cache_access(&self, context: &CacheAccessContext<'_>) -> Result<()>;
}

/// Identity provider token endpoint.
pub trait TokenProvider: Send + Sync {
    /// Redeem a refresh token for the request's scopes.
    ///
    /// # Errors
    /// `TokenCacheError::Provider` when the endpoint rejects the grant.
    fn acquire_token_by_refresh_token(
        &self,
        request: &SilentTokenRequest,
        refresh_token: &RefreshTokenEntity,
    ) -> Result<TokenResponse>;

    /// Client credentials grant for app-only requests.
    ///
    /// # Errors
    /// `TokenCacheError::Provider` when the endpoint rejects the grant.
    fn acquire_token_for_client(&self, request: &SilentTokenRequest) -> Result<TokenResponse>;
}
