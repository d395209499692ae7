//! In-memory token cache
//!
//! Accounts, access tokens, refresh tokens, ID tokens and app metadata live
//! in independent maps keyed by composite strings. An index from account
//! scope (home account id + environment) to dependent keys makes cascade
//! deletes proportional to the number of dependents.
//!
//! All methods take `&self`; the maps sit behind an internal mutex so a
//! `TokenCache` can be shared between threads by reference or `Arc`.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tokencache_domain::constants::ACCESS_TOKEN_EXPIRY_SKEW_SECS;
use tokencache_domain::keys::{app_metadata_key, id_token_key, refresh_token_key};
use tokencache_domain::{
    AccessTokenEntity, AccountEntity, AccountScope, AppMetadataEntity, AuthScheme,
    EnvironmentAliases, IdTokenEntity, RefreshTokenEntity, Result, TenantProfile, TokenCacheError,
    TokenResponse,
};
use tracing::{debug, warn};

use super::lookup::{AccessTokenLookup, AccessTokenQuery, CachedAccessToken};
use super::serializer;
use super::state::{CacheSnapshot, CacheState, CacheStats, RemovalSummary};
use crate::clock;

/// Entities written by [`TokenCache::save_token_response`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedTokens {
    pub access_token: AccessTokenEntity,
    pub account: Option<AccountEntity>,
}

/// Normalized multi-entity token cache
#[derive(Debug, Default)]
pub struct TokenCache {
    state: Mutex<CacheState>,
    aliases: EnvironmentAliases,
}

impl TokenCache {
    /// Empty cache with the built-in environment alias table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty cache using a custom alias table.
    #[must_use]
    pub fn with_aliases(aliases: EnvironmentAliases) -> Self {
        Self { state: Mutex::new(CacheState::default()), aliases }
    }

    #[must_use]
    pub const fn aliases(&self) -> &EnvironmentAliases {
        &self.aliases
    }

    // ========================================================================
    // Upserts
    // ========================================================================

    /// Insert or replace the access token under its composite key.
    pub fn upsert_access_token(&self, token: AccessTokenEntity) {
        self.state.lock().insert_access_token(token);
    }

    pub fn upsert_refresh_token(&self, token: RefreshTokenEntity) {
        self.state.lock().insert_refresh_token(token);
    }

    pub fn upsert_id_token(&self, token: IdTokenEntity) {
        self.state.lock().insert_id_token(token);
    }

    pub fn upsert_account(&self, account: AccountEntity) {
        self.state.lock().insert_account(account);
    }

    pub fn upsert_app_metadata(&self, metadata: AppMetadataEntity) {
        self.state.lock().insert_app_metadata(metadata);
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// [`TokenCache::find_access_token_at`] at the current time.
    #[must_use]
    pub fn find_access_token(&self, query: &AccessTokenQuery) -> AccessTokenLookup {
        self.find_access_token_at(query, clock::now_epoch_secs())
    }

    /// Find the single access token matching `query`.
    ///
    /// Scopes must match exactly after normalization. Entries that expire
    /// within the clock skew are ignored, and copies of one token stored
    /// under alias-equivalent environments count once (the copy in the
    /// queried environment wins, then the newest). More than one remaining
    /// candidate is reported as [`AccessTokenLookup::Ambiguous`].
    #[must_use]
    pub fn find_access_token_at(&self, query: &AccessTokenQuery, now: i64) -> AccessTokenLookup {
        let state = self.state.lock();
        let mut candidates: Vec<(&String, &AccessTokenEntity)> = Vec::new();
        let mut expired = 0usize;

        for (key, token) in state.data().access_tokens.iter().filter(|(_, token)| {
            query.matches_identity(token)
                && query
                    .environment
                    .as_ref()
                    .is_none_or(|env| self.aliases.are_equivalent(env, &token.environment))
                && token.scopes().matches_exactly(&query.scopes)
        }) {
            if token.is_expired_at(now, ACCESS_TOKEN_EXPIRY_SKEW_SECS) {
                debug!(key = %key, expires_on = token.expires_on, "token_cache.access_token_expired");
                expired += 1;
                continue;
            }
            match candidates.iter_mut().find(|(_, kept)| self.is_alias_copy(kept, token)) {
                Some(slot) => {
                    if preference(query, token) > preference(query, slot.1) {
                        *slot = (key, token);
                    }
                }
                None => candidates.push((key, token)),
            }
        }

        match candidates.as_slice() {
            [] => {
                debug!(client_id = %query.client_id, expired, "token_cache.access_token_miss");
                AccessTokenLookup::NotFound
            }
            [(_, token)] => AccessTokenLookup::Found(CachedAccessToken {
                refresh_due: token.is_refresh_due_at(now),
                token: (*token).clone(),
            }),
            _ => {
                warn!(
                    client_id = %query.client_id,
                    candidates = candidates.len(),
                    "token_cache.access_token_ambiguous"
                );
                AccessTokenLookup::Ambiguous {
                    candidates: candidates.iter().map(|(key, _)| (*key).clone()).collect(),
                }
            }
        }
    }

    /// Same token stored under two alias-equivalent environments.
    fn is_alias_copy(&self, left: &AccessTokenEntity, right: &AccessTokenEntity) -> bool {
        left.home_account_id == right.home_account_id
            && left.realm == right.realm
            && self.aliases.are_equivalent(&left.environment, &right.environment)
    }

    /// The refresh token issued to `client_id` for the account scope.
    /// Refresh tokens are neither scope nor realm bound.
    #[must_use]
    pub fn find_refresh_token(&self, client_id: &str, scope: &AccountScope) -> Option<RefreshTokenEntity> {
        let state = self.state.lock();
        self.find_refresh_token_locked(&state, client_id, scope)
    }

    /// The family refresh token usable by `client_id`, resolved through the
    /// client's app metadata.
    #[must_use]
    pub fn find_family_refresh_token(
        &self,
        client_id: &str,
        scope: &AccountScope,
    ) -> Option<RefreshTokenEntity> {
        let state = self.state.lock();
        let family_id = self.aliases.aliases_of(scope.environment()).into_iter().find_map(|env| {
            state
                .data()
                .app_metadata
                .get(&app_metadata_key(&env, client_id))
                .and_then(|metadata| metadata.family_id.clone())
        })?;
        self.find_refresh_token_locked(&state, &family_id, scope)
            .filter(RefreshTokenEntity::is_family_token)
    }

    fn find_refresh_token_locked(
        &self,
        state: &CacheState,
        client_or_family: &str,
        scope: &AccountScope,
    ) -> Option<RefreshTokenEntity> {
        self.aliases.aliases_of(scope.environment()).into_iter().find_map(|env| {
            let key = refresh_token_key(scope.home_account_id(), &env, client_or_family);
            state.data().refresh_tokens.get(&key).cloned()
        })
    }

    /// The ID token for `client_id` in `realm` of the account scope.
    #[must_use]
    pub fn find_id_token(
        &self,
        client_id: &str,
        scope: &AccountScope,
        realm: &str,
    ) -> Option<IdTokenEntity> {
        let state = self.state.lock();
        self.aliases.aliases_of(scope.environment()).into_iter().find_map(|env| {
            let key = id_token_key(scope.home_account_id(), &env, client_id, realm);
            state.data().id_tokens.get(&key).cloned()
        })
    }

    /// App metadata of `client_id` in any alias of `environment`.
    #[must_use]
    pub fn find_app_metadata(&self, client_id: &str, environment: &str) -> Option<AppMetadataEntity> {
        let state = self.state.lock();
        self.aliases.aliases_of(environment).into_iter().find_map(|env| {
            state
                .data()
                .app_metadata
                .get(&app_metadata_key(&env, client_id))
                .cloned()
        })
    }

    /// One entry per user and logical environment.
    ///
    /// Per-realm entries of the same user are folded into the home-tenant
    /// entry (or the first one when the home tenant was never seen), with
    /// every realm listed in `tenant_profiles`.
    #[must_use]
    pub fn get_accounts(&self, environment: Option<&str>) -> Vec<AccountEntity> {
        let state = self.state.lock();
        let mut grouped: BTreeMap<(String, String), Vec<&AccountEntity>> = BTreeMap::new();

        for account in state.data().accounts.values() {
            if environment.is_some_and(|env| !self.aliases.are_equivalent(env, &account.environment)) {
                continue;
            }
            let canonical_env = self
                .aliases
                .aliases_of(&account.environment)
                .into_iter()
                .next()
                .unwrap_or_default();
            grouped
                .entry((account.home_account_id.clone(), canonical_env))
                .or_default()
                .push(account);
        }

        grouped
            .into_values()
            .filter_map(|entries| {
                let representative = entries
                    .iter()
                    .find(|account| account.is_home_tenant())
                    .or_else(|| entries.first())?;

                let mut profiles: Vec<TenantProfile> = Vec::new();
                for profile in entries
                    .iter()
                    .flat_map(|account| {
                        account.tenant_profiles.iter().cloned().chain([account.tenant_profile()])
                    })
                {
                    if !profiles.iter().any(|seen| seen.realm == profile.realm) {
                        profiles.push(profile);
                    }
                }

                Some((*representative).clone().with_tenant_profiles(profiles))
            })
            .collect()
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove the account and every access, refresh and ID token sharing its
    /// home account id and environment. Removing an unknown account is a
    /// no-op.
    pub fn remove_account(&self, account: &AccountEntity) -> RemovalSummary {
        let summary = self.state.lock().remove_scope(&account.account_scope());
        debug!(
            home_account_id = %account.home_account_id,
            environment = %account.environment,
            removed = summary.total(),
            "token_cache.account_removed"
        );
        summary
    }

    /// Evict one access token; the owning account goes too once it has no
    /// credentials left.
    pub fn remove_access_token(&self, key: &str) -> Option<AccessTokenEntity> {
        let mut state = self.state.lock();
        let token = state.remove_access_token(key)?;
        state.prune_orphan_accounts(&token.account_scope());
        Some(token)
    }

    pub fn remove_refresh_token(&self, key: &str) -> Option<RefreshTokenEntity> {
        let mut state = self.state.lock();
        let token = state.remove_refresh_token(key)?;
        state.prune_orphan_accounts(&token.account_scope());
        Some(token)
    }

    pub fn remove_id_token(&self, key: &str) -> Option<IdTokenEntity> {
        let mut state = self.state.lock();
        let token = state.remove_id_token(key)?;
        state.prune_orphan_accounts(&token.account_scope());
        Some(token)
    }

    /// Drop every entity, including preserved unknown sections.
    pub fn clear(&self) {
        self.state.lock().clear();
    }

    // ========================================================================
    // Token responses
    // ========================================================================

    /// Write the entities described by a token endpoint response.
    ///
    /// Access tokens of the same client, account, realm and scheme whose
    /// normalized scopes equal the new token's are replaced, so two entries
    /// differing only in reserved scopes or in an environment alias can
    /// never coexist.
    ///
    /// # Errors
    /// Returns `TokenCacheError::InvalidInput` for a response without an
    /// access token or scopes, or with a negative lifetime.
    pub fn save_token_response(
        &self,
        client_id: &str,
        environment: &str,
        response: &TokenResponse,
        now: i64,
    ) -> Result<SavedTokens> {
        if response.access_token.is_empty() {
            return Err(TokenCacheError::InvalidInput("token response has no access token".into()));
        }
        if response.expires_in < 0 {
            return Err(TokenCacheError::InvalidInput(format!(
                "token response has a negative lifetime ({})",
                response.expires_in
            )));
        }
        let scopes = response.scopes();
        if scopes.is_empty() {
            return Err(TokenCacheError::InvalidInput("token response has no scopes".into()));
        }

        let identity = response.identity.as_ref();
        let home_account_id = identity.map_or("", |identity| identity.home_account_id.as_str());
        let realm = response
            .realm
            .as_deref()
            .or_else(|| identity.map(|identity| identity.realm.as_str()))
            .unwrap_or_default();
        let scheme = AuthScheme::from_token_type(&response.token_type);

        let mut access_token = AccessTokenEntity::new(client_id, environment, &response.access_token)
            .with_home_account_id(home_account_id)
            .with_realm(realm)
            .with_scopes(&scopes)
            .with_lifetime(now, now.saturating_add(response.expires_in))
            .with_auth_scheme(scheme);
        if let Some(ext) = response.ext_expires_in {
            access_token = access_token.with_extended_expires_on(now.saturating_add(ext));
        }
        if let Some(refresh_in) = response.refresh_in {
            access_token = access_token.with_refresh_on(now.saturating_add(refresh_in));
        }

        let mut state = self.state.lock();

        let new_key = access_token.cache_key();
        let superseded: Vec<String> = state
            .data()
            .access_tokens
            .iter()
            .filter(|(key, existing)| {
                **key != new_key
                    && existing.client_id == access_token.client_id
                    && existing.home_account_id == access_token.home_account_id
                    && self.aliases.are_equivalent(&existing.environment, &access_token.environment)
                    && existing.realm == access_token.realm
                    && existing.auth_scheme() == scheme
                    && existing.scopes().matches_exactly(&scopes)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &superseded {
            state.remove_access_token(key);
        }
        state.insert_access_token(access_token.clone());

        if let Some(secret) = &response.refresh_token {
            let refresh_token =
                RefreshTokenEntity::new(home_account_id, environment, client_id, secret)
                    .with_family_id(response.family_id.clone().unwrap_or_default());
            state.insert_refresh_token(refresh_token);
        }

        let account = identity.map(|identity| {
            let mut account =
                AccountEntity::new(&identity.home_account_id, environment, realm, &identity.username)
                    .with_local_account_id(&identity.local_account_id);
            if let Some(name) = &identity.name {
                account = account.with_name(name);
            }
            account
        });

        if let (Some(account), Some(id_token)) = (&account, &response.id_token) {
            state.insert_id_token(IdTokenEntity::new(
                &account.home_account_id,
                environment,
                client_id,
                realm,
                id_token,
            ));
        }
        if let Some(account) = &account {
            state.insert_account(account.clone());
        }

        state.insert_app_metadata(
            AppMetadataEntity::new(client_id, environment)
                .with_family_id(response.family_id.clone().unwrap_or_default()),
        );

        debug!(
            client_id = %client_id,
            key = %new_key,
            superseded = superseded.len(),
            has_refresh_token = response.refresh_token.is_some(),
            "token_cache.response_saved"
        );

        Ok(SavedTokens { access_token, account })
    }

    // ========================================================================
    // Snapshots and serialization
    // ========================================================================

    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        self.state.lock().data().clone()
    }

    /// Replace the whole state with `snapshot`.
    pub fn restore(&self, snapshot: CacheSnapshot) {
        *self.state.lock() = CacheState::from_snapshot(snapshot);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().data().is_empty()
    }

    /// Render the cache as the persisted document.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Serialization` if an entity cannot be
    /// encoded.
    pub fn serialize(&self) -> Result<String> {
        let state = self.state.lock();
        serializer::serialize(state.data())
    }

    /// Replace the in-memory state with the parsed document. The state is
    /// left untouched when parsing fails.
    ///
    /// # Errors
    /// Returns `TokenCacheError::Serialization` for a document that is not a
    /// JSON object.
    pub fn deserialize(&self, data: &str) -> Result<()> {
        let snapshot = serializer::deserialize(data)?;
        self.restore(snapshot);
        Ok(())
    }
}

/// Ranks alias copies: the queried environment first, then the newest.
fn preference(query: &AccessTokenQuery, token: &AccessTokenEntity) -> (bool, i64) {
    let exact = query
        .environment
        .as_ref()
        .is_some_and(|env| env.eq_ignore_ascii_case(&token.environment));
    (exact, token.cached_at)
}
