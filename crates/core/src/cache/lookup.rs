//! Access token lookup parameters and outcomes

use tokencache_domain::{AccessTokenEntity, AccountEntity, AuthScheme, ScopeSet, SilentTokenRequest};

/// What to look for in the access token map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenQuery {
    pub client_id: String,
    /// `None` selects app-only tokens (empty home account id)
    pub home_account_id: Option<String>,
    /// Matched by alias equivalence when present
    pub environment: Option<String>,
    /// `None` accepts any realm; several realms then make the lookup
    /// ambiguous
    pub realm: Option<String>,
    pub scopes: ScopeSet,
    pub auth_scheme: AuthScheme,
}

impl AccessTokenQuery {
    #[must_use]
    pub fn new(client_id: impl Into<String>, scopes: ScopeSet) -> Self {
        Self {
            client_id: client_id.into(),
            home_account_id: None,
            environment: None,
            realm: None,
            scopes,
            auth_scheme: AuthScheme::Bearer,
        }
    }

    /// Restrict to the account's home id and environment.
    #[must_use]
    pub fn for_account(mut self, account: &AccountEntity) -> Self {
        self.home_account_id = Some(account.home_account_id.clone());
        self.environment = Some(account.environment.clone());
        self
    }

    #[must_use]
    pub fn in_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
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

    pub(crate) fn matches_identity(&self, token: &AccessTokenEntity) -> bool {
        if token.client_id != self.client_id || token.auth_scheme() != self.auth_scheme {
            return false;
        }
        let home_matches = match &self.home_account_id {
            Some(home) => token.home_account_id == *home,
            None => token.is_app_only(),
        };
        home_matches && self.realm.as_ref().is_none_or(|realm| token.realm == *realm)
    }
}

impl From<&SilentTokenRequest> for AccessTokenQuery {
    fn from(request: &SilentTokenRequest) -> Self {
        let mut query = Self::new(request.client_id.clone(), request.scopes.clone())
            .in_environment(request.environment.clone())
            .with_auth_scheme(request.auth_scheme);
        if let Some(account) = &request.account {
            query.home_account_id = Some(account.home_account_id.clone());
        }
        query.realm = request.realm.clone();
        query
    }
}

/// A usable cached access token
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAccessToken {
    pub token: AccessTokenEntity,
    /// The refresh-on hint has passed; the token is still valid but the
    /// caller should refresh it proactively.
    pub refresh_due: bool,
}

/// Outcome of [`crate::cache::TokenCache::find_access_token`]
#[derive(Debug, Clone, PartialEq)]
pub enum AccessTokenLookup {
    Found(CachedAccessToken),
    /// No entry matched, or the only match is expired
    NotFound,
    /// More than one entry matched an under-specified query; the caller must
    /// not pick one
    Ambiguous { candidates: Vec<String> },
}

impl AccessTokenLookup {
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[must_use]
    pub fn into_token(self) -> Option<CachedAccessToken> {
        match self {
            Self::Found(token) => Some(token),
            Self::NotFound | Self::Ambiguous { .. } => None,
        }
    }
}
