//! Normalized cache maps and the account back-reference index

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};
use tokencache_domain::{
    AccessTokenEntity, AccountEntity, AccountScope, AppMetadataEntity, IdTokenEntity,
    RefreshTokenEntity,
};

/// Plain copy of every entity in the cache, keyed by composite key.
///
/// This is what the serializer reads and writes. Unknown top-level sections
/// found in a persisted document are carried along untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub access_tokens: BTreeMap<String, AccessTokenEntity>,
    pub refresh_tokens: BTreeMap<String, RefreshTokenEntity>,
    pub id_tokens: BTreeMap<String, IdTokenEntity>,
    pub accounts: BTreeMap<String, AccountEntity>,
    pub app_metadata: BTreeMap<String, AppMetadataEntity>,
    pub unknown_sections: Map<String, Value>,
}

impl CacheSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_tokens.is_empty()
            && self.refresh_tokens.is_empty()
            && self.id_tokens.is_empty()
            && self.accounts.is_empty()
            && self.app_metadata.is_empty()
            && self.unknown_sections.is_empty()
    }
}

/// Entity counts, for logs and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub access_tokens: usize,
    pub refresh_tokens: usize,
    pub id_tokens: usize,
    pub accounts: usize,
    pub app_metadata: usize,
}

/// Keys of the entities hanging off one account scope
#[derive(Debug, Default)]
struct Dependents {
    access_tokens: BTreeSet<String>,
    refresh_tokens: BTreeSet<String>,
    id_tokens: BTreeSet<String>,
    accounts: BTreeSet<String>,
}

impl Dependents {
    fn has_credentials(&self) -> bool {
        !(self.access_tokens.is_empty() && self.refresh_tokens.is_empty() && self.id_tokens.is_empty())
    }

    fn is_empty(&self) -> bool {
        !self.has_credentials() && self.accounts.is_empty()
    }
}

/// Number of entities removed by a cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub access_tokens: usize,
    pub refresh_tokens: usize,
    pub id_tokens: usize,
    pub accounts: usize,
}

impl RemovalSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.access_tokens + self.refresh_tokens + self.id_tokens + self.accounts
    }
}

/// The maps plus an index from account scope to dependent keys.
///
/// Every mutation goes through the methods below so the index never drifts
/// from the maps.
#[derive(Debug, Default)]
pub(crate) struct CacheState {
    data: CacheSnapshot,
    index: HashMap<AccountScope, Dependents>,
}

impl CacheState {
    /// Rebuild state (and index) from a snapshot whose keys are already
    /// canonical.
    pub(crate) fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let mut state = Self::default();
        let CacheSnapshot {
            access_tokens,
            refresh_tokens,
            id_tokens,
            accounts,
            app_metadata,
            unknown_sections,
        } = snapshot;

        for token in access_tokens.into_values() {
            state.insert_access_token(token);
        }
        for token in refresh_tokens.into_values() {
            state.insert_refresh_token(token);
        }
        for token in id_tokens.into_values() {
            state.insert_id_token(token);
        }
        for account in accounts.into_values() {
            state.insert_account(account);
        }
        for metadata in app_metadata.into_values() {
            state.insert_app_metadata(metadata);
        }
        state.data.unknown_sections = unknown_sections;
        state
    }

    pub(crate) const fn data(&self) -> &CacheSnapshot {
        &self.data
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            access_tokens: self.data.access_tokens.len(),
            refresh_tokens: self.data.refresh_tokens.len(),
            id_tokens: self.data.id_tokens.len(),
            accounts: self.data.accounts.len(),
            app_metadata: self.data.app_metadata.len(),
        }
    }

    fn dependents(&mut self, scope: AccountScope) -> &mut Dependents {
        self.index.entry(scope).or_default()
    }

    fn forget(&mut self, scope: &AccountScope, unlink: impl FnOnce(&mut Dependents)) {
        if let Some(dependents) = self.index.get_mut(scope) {
            unlink(dependents);
            if dependents.is_empty() {
                self.index.remove(scope);
            }
        }
    }

    // ------------------------------------------------------------------
    // Upserts (last write wins, no merge)
    // ------------------------------------------------------------------

    pub(crate) fn insert_access_token(&mut self, token: AccessTokenEntity) -> Option<AccessTokenEntity> {
        let key = token.cache_key();
        self.dependents(token.account_scope()).access_tokens.insert(key.clone());
        self.data.access_tokens.insert(key, token)
    }

    pub(crate) fn insert_refresh_token(
        &mut self,
        token: RefreshTokenEntity,
    ) -> Option<RefreshTokenEntity> {
        let key = token.cache_key();
        self.dependents(token.account_scope()).refresh_tokens.insert(key.clone());
        self.data.refresh_tokens.insert(key, token)
    }

    pub(crate) fn insert_id_token(&mut self, token: IdTokenEntity) -> Option<IdTokenEntity> {
        let key = token.cache_key();
        self.dependents(token.account_scope()).id_tokens.insert(key.clone());
        self.data.id_tokens.insert(key, token)
    }

    pub(crate) fn insert_account(&mut self, account: AccountEntity) -> Option<AccountEntity> {
        let key = account.cache_key();
        self.dependents(account.account_scope()).accounts.insert(key.clone());
        self.data.accounts.insert(key, account)
    }

    pub(crate) fn insert_app_metadata(
        &mut self,
        metadata: AppMetadataEntity,
    ) -> Option<AppMetadataEntity> {
        self.data.app_metadata.insert(metadata.cache_key(), metadata)
    }

    // ------------------------------------------------------------------
    // Single-entity removal
    // ------------------------------------------------------------------

    pub(crate) fn remove_access_token(&mut self, key: &str) -> Option<AccessTokenEntity> {
        let token = self.data.access_tokens.remove(key)?;
        self.forget(&token.account_scope(), |d| {
            d.access_tokens.remove(key);
        });
        Some(token)
    }

    pub(crate) fn remove_refresh_token(&mut self, key: &str) -> Option<RefreshTokenEntity> {
        let token = self.data.refresh_tokens.remove(key)?;
        self.forget(&token.account_scope(), |d| {
            d.refresh_tokens.remove(key);
        });
        Some(token)
    }

    pub(crate) fn remove_id_token(&mut self, key: &str) -> Option<IdTokenEntity> {
        let token = self.data.id_tokens.remove(key)?;
        self.forget(&token.account_scope(), |d| {
            d.id_tokens.remove(key);
        });
        Some(token)
    }

    /// Drop the account entries of `scope` once no credential references
    /// it any more. App-only scopes (empty home account id) own no accounts.
    pub(crate) fn prune_orphan_accounts(&mut self, scope: &AccountScope) -> usize {
        if scope.home_account_id().is_empty() {
            return 0;
        }
        let Some(dependents) = self.index.get(scope) else {
            return 0;
        };
        if dependents.has_credentials() {
            return 0;
        }
        let keys: Vec<String> = dependents.accounts.iter().cloned().collect();
        for key in &keys {
            self.data.accounts.remove(key);
        }
        self.index.remove(scope);
        keys.len()
    }

    // ------------------------------------------------------------------
    // Cascades
    // ------------------------------------------------------------------

    /// Remove every account, access, refresh and ID token of `scope`.
    /// Entities of the same user in another environment are a different
    /// scope and stay.
    pub(crate) fn remove_scope(&mut self, scope: &AccountScope) -> RemovalSummary {
        let Some(dependents) = self.index.remove(scope) else {
            return RemovalSummary::default();
        };

        let mut summary = RemovalSummary::default();
        for key in &dependents.access_tokens {
            summary.access_tokens += usize::from(self.data.access_tokens.remove(key).is_some());
        }
        for key in &dependents.refresh_tokens {
            summary.refresh_tokens += usize::from(self.data.refresh_tokens.remove(key).is_some());
        }
        for key in &dependents.id_tokens {
            summary.id_tokens += usize::from(self.data.id_tokens.remove(key).is_some());
        }
        for key in &dependents.accounts {
            summary.accounts += usize::from(self.data.accounts.remove(key).is_some());
        }
        summary
    }

    pub(crate) fn clear(&mut self) {
        self.data = CacheSnapshot::default();
        self.index.clear();
    }

    #[cfg(test)]
    pub(crate) fn indexed_keys(&self, scope: &AccountScope) -> usize {
        self.index.get(scope).map_or(0, |d| {
            d.access_tokens.len() + d.refresh_tokens.len() + d.id_tokens.len() + d.accounts.len()
        })
    }
}

#[cfg(test)]
mod tests {
    use tokencache_domain::ScopeSet;

    use super::*;

    fn access_token(env: &str, realm: &str) -> AccessTokenEntity {
        AccessTokenEntity::new("client", env, "at")
            .with_home_account_id("uid.utid")
            .with_realm(realm)
            .with_scopes(&ScopeSet::parse("user.read"))
            .with_lifetime(0, 3_600)
    }

    #[test]
    fn index_follows_inserts_and_removals() {
        let mut state = CacheState::default();
        let scope = AccountScope::new("uid.utid", "login.example.com");

        state.insert_access_token(access_token("login.example.com", "utid"));
        state.insert_access_token(access_token("login.example.com", "other"));
        state.insert_refresh_token(RefreshTokenEntity::new("uid.utid", "login.example.com", "client", "rt"));
        state.insert_account(AccountEntity::new("uid.utid", "login.example.com", "utid", "ada"));
        assert_eq!(state.indexed_keys(&scope), 4);

        let key = access_token("login.example.com", "other").cache_key();
        assert!(state.remove_access_token(&key).is_some());
        assert_eq!(state.indexed_keys(&scope), 3);
        assert!(state.remove_access_token(&key).is_none());
    }

    #[test]
    fn replacing_an_entry_keeps_one_index_slot() {
        let mut state = CacheState::default();
        let scope = AccountScope::new("uid.utid", "login.example.com");

        assert!(state.insert_access_token(access_token("login.example.com", "utid")).is_none());
        assert!(state.insert_access_token(access_token("login.example.com", "utid")).is_some());
        assert_eq!(state.indexed_keys(&scope), 1);
        assert_eq!(state.stats().access_tokens, 1);
    }

    #[test]
    fn orphan_accounts_are_pruned_only_without_credentials() {
        let mut state = CacheState::default();
        let scope = AccountScope::new("uid.utid", "login.example.com");
        let rt = RefreshTokenEntity::new("uid.utid", "login.example.com", "client", "rt");
        let rt_key = rt.cache_key();

        state.insert_refresh_token(rt);
        state.insert_account(AccountEntity::new("uid.utid", "login.example.com", "utid", "ada"));
        assert_eq!(state.prune_orphan_accounts(&scope), 0);

        state.remove_refresh_token(&rt_key);
        assert_eq!(state.prune_orphan_accounts(&scope), 1);
        assert_eq!(state.stats().accounts, 0);
        assert_eq!(state.indexed_keys(&scope), 0);
    }

    #[test]
    fn remove_scope_leaves_other_environments() {
        let mut state = CacheState::default();
        state.insert_access_token(access_token("login.example.com", "utid"));
        state.insert_access_token(access_token("login.example.de", "utid"));

        let summary = state.remove_scope(&AccountScope::new("uid.utid", "LOGIN.example.com"));
        assert_eq!(summary.access_tokens, 1);
        assert_eq!(summary.total(), 1);
        assert_eq!(state.stats().access_tokens, 1);
        assert_eq!(state.remove_scope(&AccountScope::new("uid.utid", "login.example.com")).total(), 0);
    }
}
