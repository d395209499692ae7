//! Account entities
//!
//! One `AccountEntity` exists per user, environment and realm. Guest
//! accounts in several tenants therefore produce several entries; the cache
//! folds them back together as tenant profiles when enumerating accounts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::AUTHORITY_TYPE_MSSTS;
use crate::keys::{account_key, AccountScope};

/// Realm-specific view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    pub realm: String,
    #[serde(default)]
    pub local_account_id: String,
    #[serde(default)]
    pub is_home_tenant: bool,
}

/// An authenticated end user within one environment and realm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEntity {
    /// `{objectId}.{tenantId}` of the user's home tenant
    pub home_account_id: String,
    pub environment: String,
    #[serde(default)]
    pub realm: String,
    #[serde(default)]
    pub local_account_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_authority_type")]
    pub authority_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tenant_profiles: Vec<TenantProfile>,
    /// Fields written by other library versions; preserved verbatim.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

fn default_authority_type() -> String {
    AUTHORITY_TYPE_MSSTS.to_string()
}

impl AccountEntity {
    /// Create an account record for the given user and tenant.
    #[must_use]
    pub fn new(
        home_account_id: impl Into<String>,
        environment: impl Into<String>,
        realm: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            environment: environment.into(),
            realm: realm.into(),
            local_account_id: String::new(),
            username: username.into(),
            authority_type: default_authority_type(),
            name: None,
            tenant_profiles: Vec::new(),
            additional_fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_local_account_id(mut self, local_account_id: impl Into<String>) -> Self {
        self.local_account_id = local_account_id.into();
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_tenant_profiles(mut self, profiles: Vec<TenantProfile>) -> Self {
        self.tenant_profiles = profiles;
        self
    }

    #[must_use]
    pub fn cache_key(&self) -> String {
        account_key(&self.home_account_id, &self.environment, &self.realm)
    }

    #[must_use]
    pub fn account_scope(&self) -> AccountScope {
        AccountScope::new(&self.home_account_id, &self.environment)
    }

    /// Tenant id embedded in the home account id (`uid.utid` -> `utid`).
    #[must_use]
    pub fn home_tenant_id(&self) -> Option<&str> {
        self.home_account_id.split_once('.').map(|(_, tenant)| tenant).filter(|t| !t.is_empty())
    }

    /// Whether this entry describes the user in their home tenant.
    #[must_use]
    pub fn is_home_tenant(&self) -> bool {
        self.home_tenant_id().is_some_and(|tenant| tenant.eq_ignore_ascii_case(&self.realm))
    }

    /// Usernames compare case-insensitively.
    #[must_use]
    pub fn has_username(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }

    #[must_use]
    pub fn tenant_profile(&self) -> TenantProfile {
        TenantProfile {
            realm: self.realm.clone(),
            local_account_id: self.local_account_id.clone(),
            is_home_tenant: self.is_home_tenant(),
        }
    }
}
