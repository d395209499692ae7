//! Credential entities: access tokens, refresh tokens and ID tokens
//!
//! Credentials reference their account through home account id and
//! environment but are stored in their own maps. Values are immutable once
//! built; an update replaces the whole entry under the same key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::scope::{AuthScheme, ScopeSet};
use crate::constants::{
    CREDENTIAL_TYPE_ACCESS_TOKEN, CREDENTIAL_TYPE_ID_TOKEN, CREDENTIAL_TYPE_REFRESH_TOKEN,
    TOKEN_TYPE_BEARER,
};
use crate::keys::{access_token_key, id_token_key, refresh_token_key, AccountScope};
use crate::utils::epoch::{epoch_string, epoch_string_opt};

fn access_token_type() -> String {
    CREDENTIAL_TYPE_ACCESS_TOKEN.to_string()
}

fn refresh_token_type() -> String {
    CREDENTIAL_TYPE_REFRESH_TOKEN.to_string()
}

fn id_token_type() -> String {
    CREDENTIAL_TYPE_ID_TOKEN.to_string()
}

fn bearer() -> String {
    TOKEN_TYPE_BEARER.to_string()
}

// ============================================================================
// Access tokens
// ============================================================================

/// A bearer or proof-of-possession token for one client, realm and scope set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenEntity {
    /// Empty for app-only (client credentials) tokens
    #[serde(default)]
    pub home_account_id: String,
    pub environment: String,
    #[serde(default = "access_token_type")]
    pub credential_type: String,
    pub client_id: String,
    pub secret: String,
    #[serde(default)]
    pub realm: String,
    /// Normalized space-joined scope string
    #[serde(default)]
    pub target: String,
    #[serde(with = "epoch_string")]
    pub cached_at: i64,
    #[serde(with = "epoch_string")]
    pub expires_on: i64,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "epoch_string_opt")]
    pub extended_expires_on: Option<i64>,
    /// Proactive refresh hint; advisory only
    #[serde(default, skip_serializing_if = "Option::is_none", with = "epoch_string_opt")]
    pub refresh_on: Option<i64>,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl AccessTokenEntity {
    /// Start an app-only bearer token; chain the `with_*` methods to fill
    /// in the rest.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        environment: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: String::new(),
            environment: environment.into(),
            credential_type: access_token_type(),
            client_id: client_id.into(),
            secret: secret.into(),
            realm: String::new(),
            target: String::new(),
            cached_at: 0,
            expires_on: 0,
            extended_expires_on: None,
            refresh_on: None,
            token_type: bearer(),
            additional_fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_home_account_id(mut self, home_account_id: impl Into<String>) -> Self {
        self.home_account_id = home_account_id.into();
        self
    }

    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: &ScopeSet) -> Self {
        self.target = scopes.to_target();
        self
    }

    #[must_use]
    pub const fn with_lifetime(mut self, cached_at: i64, expires_on: i64) -> Self {
        self.cached_at = cached_at;
        self.expires_on = expires_on;
        self
    }

    #[must_use]
    pub const fn with_extended_expires_on(mut self, extended_expires_on: i64) -> Self {
        self.extended_expires_on = Some(extended_expires_on);
        self
    }

    #[must_use]
    pub const fn with_refresh_on(mut self, refresh_on: i64) -> Self {
        self.refresh_on = Some(refresh_on);
        self
    }

    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.token_type = scheme.token_type().to_string();
        self
    }

    #[must_use]
    pub fn cache_key(&self) -> String {
        access_token_key(
            &self.home_account_id,
            &self.environment,
            &self.client_id,
            &self.realm,
            &self.scopes().to_target(),
            self.auth_scheme(),
        )
    }

    #[must_use]
    pub fn account_scope(&self) -> AccountScope {
        AccountScope::new(&self.home_account_id, &self.environment)
    }

    #[must_use]
    pub fn auth_scheme(&self) -> AuthScheme {
        AuthScheme::from_token_type(&self.token_type)
    }

    #[must_use]
    pub fn scopes(&self) -> ScopeSet {
        ScopeSet::parse(&self.target)
    }

    /// Expired, or close enough to expiry that it must not be served.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64, skew_secs: i64) -> bool {
        now.saturating_add(skew_secs) >= self.expires_on
    }

    /// The refresh-on hint has passed. Independent of expiry.
    #[must_use]
    pub fn is_refresh_due_at(&self, now: i64) -> bool {
        self.refresh_on.is_some_and(|refresh_on| now >= refresh_on)
    }

    /// App-only tokens carry no home account id.
    #[must_use]
    pub fn is_app_only(&self) -> bool {
        self.home_account_id.is_empty()
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

/// A refresh credential for a client or a family of clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenEntity {
    #[serde(default)]
    pub home_account_id: String,
    pub environment: String,
    #[serde(default = "refresh_token_type")]
    pub credential_type: String,
    pub client_id: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl RefreshTokenEntity {
    #[must_use]
    pub fn new(
        home_account_id: impl Into<String>,
        environment: impl Into<String>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            environment: environment.into(),
            credential_type: refresh_token_type(),
            client_id: client_id.into(),
            secret: secret.into(),
            family_id: None,
            additional_fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_family_id(mut self, family_id: impl Into<String>) -> Self {
        self.family_id = Some(family_id.into()).filter(|id: &String| !id.is_empty());
        self
    }

    /// Keyed by family id when the token belongs to a family.
    #[must_use]
    pub fn cache_key(&self) -> String {
        refresh_token_key(&self.home_account_id, &self.environment, self.key_client_id())
    }

    #[must_use]
    pub fn key_client_id(&self) -> &str {
        self.family_id.as_deref().unwrap_or(&self.client_id)
    }

    #[must_use]
    pub fn account_scope(&self) -> AccountScope {
        AccountScope::new(&self.home_account_id, &self.environment)
    }

    #[must_use]
    pub const fn is_family_token(&self) -> bool {
        self.family_id.is_some()
    }
}

// ============================================================================
// ID tokens
// ============================================================================

/// An OIDC ID token for one client, realm and account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenEntity {
    #[serde(default)]
    pub home_account_id: String,
    pub environment: String,
    #[serde(default = "id_token_type")]
    pub credential_type: String,
    pub client_id: String,
    pub secret: String,
    #[serde(default)]
    pub realm: String,
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl IdTokenEntity {
    #[must_use]
    pub fn new(
        home_account_id: impl Into<String>,
        environment: impl Into<String>,
        client_id: impl Into<String>,
        realm: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            environment: environment.into(),
            credential_type: id_token_type(),
            client_id: client_id.into(),
            secret: secret.into(),
            realm: realm.into(),
            additional_fields: Map::new(),
        }
    }

    #[must_use]
    pub fn cache_key(&self) -> String {
        id_token_key(&self.home_account_id, &self.environment, &self.client_id, &self.realm)
    }

    #[must_use]
    pub fn account_scope(&self) -> AccountScope {
        AccountScope::new(&self.home_account_id, &self.environment)
    }
}
