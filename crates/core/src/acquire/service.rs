//! Silent (cache-first) token acquisition

use std::sync::Arc;

use tokencache_domain::{
    AccountEntity, AuthenticationResult, ResponseIdentity, Result, SilentTokenRequest,
    TokenCacheError, TokenResponse, TokenSource,
};
use tracing::{debug, info, warn};

use crate::cache::{AccessTokenLookup, AccessTokenQuery, CachedAccessToken, SharedTokenCache};
use crate::clock;
use crate::ports::TokenProvider;

/// Serves tokens from the shared cache and falls back to the identity
/// provider on a miss, writing the fresh response back.
pub struct SilentTokenService {
    cache: Arc<SharedTokenCache>,
    provider: Arc<dyn TokenProvider>,
}

impl SilentTokenService {
    pub fn new(cache: Arc<SharedTokenCache>, provider: Arc<dyn TokenProvider>) -> Self {
        Self { cache, provider }
    }

    /// [`SilentTokenService::acquire_token_silent_at`] at the current time.
    ///
    /// # Errors
    /// See [`SilentTokenService::acquire_token_silent_at`].
    pub fn acquire_token_silent(&self, request: &SilentTokenRequest) -> Result<AuthenticationResult> {
        self.acquire_token_silent_at(request, clock::now_epoch_secs())
    }

    /// Return a cached access token when one matches exactly and is not
    /// about to expire; otherwise redeem the refresh token (or run the
    /// client credentials grant for app-only requests) and cache the result.
    ///
    /// A token whose refresh-on hint has passed is still served from cache,
    /// flagged with `refresh_due`; refreshing it is up to the caller.
    ///
    /// # Errors
    /// - `TokenCacheError::LockAcquisition` / `StoreAccess` when the
    ///   persistence layer cannot save the new token.
    /// - `TokenCacheError::Provider` when the provider fails on a miss, or
    ///   no refresh token is available for an account request.
    /// - `TokenCacheError::InvalidInput` for a request without scopes.
    pub fn acquire_token_silent_at(
        &self,
        request: &SilentTokenRequest,
        now: i64,
    ) -> Result<AuthenticationResult> {
        if request.scopes.is_empty() {
            return Err(TokenCacheError::InvalidInput("at least one scope is required".into()));
        }

        if !request.force_refresh {
            let query = AccessTokenQuery::from(request);
            let lookup = self
                .cache
                .read(&request.client_id, |cache| cache.find_access_token_at(&query, now))?;

            match lookup {
                AccessTokenLookup::Found(cached) => {
                    if cached.refresh_due {
                        info!(client_id = %request.client_id, "silent_token.cache_hit_refresh_due");
                    } else {
                        debug!(client_id = %request.client_id, "silent_token.cache_hit");
                    }
                    return Ok(self.from_cache(request, cached));
                }
                AccessTokenLookup::Ambiguous { candidates } => {
                    warn!(
                        client_id = %request.client_id,
                        candidates = candidates.len(),
                        "silent_token.ambiguous_cache_entries"
                    );
                }
                AccessTokenLookup::NotFound => {
                    debug!(client_id = %request.client_id, "silent_token.cache_miss");
                }
            }
        }

        self.refresh(request, now)
    }

    fn refresh(&self, request: &SilentTokenRequest, now: i64) -> Result<AuthenticationResult> {
        let response = match &request.account {
            Some(account) => {
                let scope = account.account_scope();
                let refresh_token = self.cache.read(&request.client_id, |cache| {
                    cache
                        .find_refresh_token(&request.client_id, &scope)
                        .or_else(|| cache.find_family_refresh_token(&request.client_id, &scope))
                })?;
                let refresh_token = refresh_token.ok_or_else(|| {
                    TokenCacheError::Provider(format!(
                        "no refresh token cached for account {}",
                        account.home_account_id
                    ))
                })?;
                self.provider.acquire_token_by_refresh_token(request, &refresh_token)?
            }
            None => self.provider.acquire_token_for_client(request)?,
        };

        let response = complete_response(response, request);
        let saved = self.cache.write(&request.client_id, |cache| {
            cache.save_token_response(&request.client_id, &request.environment, &response, now)
        })?;

        info!(
            client_id = %request.client_id,
            expires_on = saved.access_token.expires_on,
            "silent_token.acquired_from_provider"
        );

        Ok(AuthenticationResult {
            access_token: saved.access_token.secret.clone(),
            token_type: saved.access_token.token_type.clone(),
            expires_on: saved.access_token.expires_on,
            scopes: saved.access_token.scopes(),
            account: saved.account.or_else(|| request.account.clone()),
            source: TokenSource::IdentityProvider,
            refresh_due: false,
        })
    }

    fn from_cache(&self, request: &SilentTokenRequest, cached: CachedAccessToken) -> AuthenticationResult {
        let CachedAccessToken { token, refresh_due } = cached;
        AuthenticationResult {
            scopes: token.scopes(),
            expires_on: token.expires_on,
            token_type: token.token_type,
            access_token: token.secret,
            account: request.account.clone(),
            source: TokenSource::Cache,
            refresh_due,
        }
    }
}

/// Fill in what a provider response may omit from the request it answers.
fn complete_response(mut response: TokenResponse, request: &SilentTokenRequest) -> TokenResponse {
    if response.scope.trim().is_empty() {
        response.scope = request.scopes.to_target();
    }
    if response.realm.is_none() {
        response.realm = request
            .realm
            .clone()
            .or_else(|| request.account.as_ref().map(|account| account.realm.clone()));
    }
    if response.identity.is_none() {
        response.identity = request.account.as_ref().map(identity_of);
    }
    response
}

fn identity_of(account: &AccountEntity) -> ResponseIdentity {
    ResponseIdentity {
        home_account_id: account.home_account_id.clone(),
        realm: account.realm.clone(),
        username: account.username.clone(),
        local_account_id: account.local_account_id.clone(),
        name: account.name.clone(),
    }
}
