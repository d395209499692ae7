//! Shared fixtures for `tokencache-core` integration tests.
//!
//! The stub provider stands in for the identity provider: every token it
//! issues carries a recognizable marker so tests can tell a network answer
//! from a cache hit.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokencache_core::{SharedTokenCache, SilentTokenService, TokenCache, TokenProvider};
use tokencache_domain::{
    AccessTokenEntity, AccountEntity, IdTokenEntity, RefreshTokenEntity, Result,
    ResponseIdentity, ScopeSet, SilentTokenRequest, TokenResponse,
};

pub const NOW: i64 = 1_700_000_000;
pub const ENV: &str = "login.microsoftonline.com";
pub const CLIENT: &str = "client-id";
pub const HOME: &str = "uid.utid";
pub const NETWORK_MARKER: &str = "from-network";

/// Token provider that answers every call with a marker token.
#[derive(Default)]
pub struct StubTokenProvider {
    calls: AtomicUsize,
}

impl StubTokenProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn issue(&self, request: &SilentTokenRequest) -> TokenResponse {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        TokenResponse::bearer(format!("{NETWORK_MARKER}-{n}"), 3_600, request.scopes.to_target())
    }
}

impl TokenProvider for StubTokenProvider {
    fn acquire_token_by_refresh_token(
        &self,
        request: &SilentTokenRequest,
        _refresh_token: &RefreshTokenEntity,
    ) -> Result<TokenResponse> {
        Ok(self.issue(request).with_refresh_token("rotated-rt"))
    }

    fn acquire_token_for_client(&self, request: &SilentTokenRequest) -> Result<TokenResponse> {
        Ok(self.issue(request).with_realm("utid"))
    }
}

/// In-memory cache, shared wrapper and service around a stub provider.
pub struct Harness {
    pub cache: Arc<TokenCache>,
    pub provider: Arc<StubTokenProvider>,
    pub service: SilentTokenService,
}

impl Harness {
    pub fn new() -> Self {
        let cache = Arc::new(TokenCache::new());
        let provider = Arc::new(StubTokenProvider::default());
        let shared = Arc::new(SharedTokenCache::new(cache.clone()));
        let service = SilentTokenService::new(shared, provider.clone());
        Self { cache, provider, service }
    }
}

pub fn account(environment: &str, realm: &str) -> AccountEntity {
    AccountEntity::new(HOME, environment, realm, "ada@example.com").with_local_account_id("uid")
}

pub fn identity(realm: &str) -> ResponseIdentity {
    ResponseIdentity {
        home_account_id: HOME.into(),
        realm: realm.into(),
        username: "ada@example.com".into(),
        local_account_id: "uid".into(),
        name: Some("Ada Lovelace".into()),
    }
}

pub fn access_token(environment: &str, scopes: &str, secret: &str) -> AccessTokenEntity {
    AccessTokenEntity::new(CLIENT, environment, secret)
        .with_home_account_id(HOME)
        .with_realm("utid")
        .with_scopes(&ScopeSet::parse(scopes))
        .with_lifetime(NOW, NOW + 3_600)
}

pub fn refresh_token(environment: &str, client_id: &str) -> RefreshTokenEntity {
    RefreshTokenEntity::new(HOME, environment, client_id, format!("rt-{client_id}"))
}

pub fn id_token(environment: &str, realm: &str) -> IdTokenEntity {
    IdTokenEntity::new(HOME, environment, CLIENT, realm, "header.payload.signature")
}
