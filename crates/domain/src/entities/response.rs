//! Token requests, provider responses and acquisition results
//!
//! The wire protocol is handled elsewhere; these types carry the already
//! parsed outcome of a token endpoint call into the cache.

use serde::{Deserialize, Serialize};

use super::account::AccountEntity;
use super::scope::{AuthScheme, ScopeSet};

/// User identity extracted from the ID token / client info of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseIdentity {
    pub home_account_id: String,
    pub realm: String,
    pub username: String,
    #[serde(default)]
    pub local_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Parsed token endpoint response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_expires_in: Option<i64>,
    /// Seconds until the provider recommends a proactive refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Granted scopes, space separated
    #[serde(default)]
    pub scope: String,
    /// Refresh-token family the client belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    /// Tenant the token was issued in (app-only responses have no identity)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ResponseIdentity>,
}

fn default_token_type() -> String {
    AuthScheme::Bearer.token_type().to_string()
}

impl TokenResponse {
    /// A bearer response without refresh token or identity.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>, expires_in: i64, scope: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in,
            ext_expires_in: None,
            refresh_in: None,
            refresh_token: None,
            id_token: None,
            scope: scope.into(),
            family_id: None,
            realm: None,
            identity: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: ResponseIdentity) -> Self {
        self.realm.get_or_insert_with(|| identity.realm.clone());
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    #[must_use]
    pub fn with_family_id(mut self, family_id: impl Into<String>) -> Self {
        self.family_id = Some(family_id.into());
        self
    }

    #[must_use]
    pub const fn with_refresh_in(mut self, refresh_in: i64) -> Self {
        self.refresh_in = Some(refresh_in);
        self
    }

    #[must_use]
    pub fn scopes(&self) -> ScopeSet {
        ScopeSet::parse(&self.scope)
    }
}

/// Parameters of a silent (cache-first) token acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct SilentTokenRequest {
    pub client_id: String,
    /// Host of the authority the request targets
    pub environment: String,
    pub scopes: ScopeSet,
    /// `None` for app-only flows
    pub account: Option<AccountEntity>,
    /// `None` when the authority is a multi-tenant alias
    pub realm: Option<String>,
    pub auth_scheme: AuthScheme,
    /// Skip the cache lookup and always call the provider
    pub force_refresh: bool,
}

impl SilentTokenRequest {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        environment: impl Into<String>,
        scopes: ScopeSet,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            environment: environment.into(),
            scopes,
            account: None,
            realm: None,
            auth_scheme: AuthScheme::Bearer,
            force_refresh: false,
        }
    }

    #[must_use]
    pub fn for_account(mut self, account: AccountEntity) -> Self {
        self.account = Some(account);
        self
    }

    #[must_use]
    pub fn in_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    #[must_use]
    pub const fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    #[must_use]
    pub const fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

/// Where an access token handed to the caller came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSource {
    Cache,
    IdentityProvider,
}

/// Outcome of a token acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticationResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_on: i64,
    pub scopes: ScopeSet,
    pub account: Option<AccountEntity>,
    pub source: TokenSource,
    /// Served from cache past its refresh-on hint; the caller may refresh
    /// with `force_refresh` when convenient.
    pub refresh_due: bool,
}
