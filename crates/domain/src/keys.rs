//! Composite cache keys
//!
//! Every cache map is keyed by a string built from the fields that make an
//! entity unique. Environments are lowercased inside keys; ids, realms and
//! secrets keep their case.

use crate::constants::{
    KEY_PREFIX_APP_METADATA, KEY_SEGMENT_ACCESS_TOKEN, KEY_SEGMENT_ID_TOKEN,
    KEY_SEGMENT_REFRESH_TOKEN,
};
use crate::entities::AuthScheme;

/// `{homeAccountId}-{environment}-{realm}`
#[must_use]
pub fn account_key(home_account_id: &str, environment: &str, realm: &str) -> String {
    format!("{home_account_id}-{}-{realm}", environment.to_ascii_lowercase())
}

/// `{homeAccountId}-{environment}-accesstoken-{clientId}-{realm}-{target}[-{scheme}]`
#[must_use]
pub fn access_token_key(
    home_account_id: &str,
    environment: &str,
    client_id: &str,
    realm: &str,
    target: &str,
    scheme: AuthScheme,
) -> String {
    let mut key = format!(
        "{home_account_id}-{}-{KEY_SEGMENT_ACCESS_TOKEN}-{client_id}-{realm}-{target}",
        environment.to_ascii_lowercase()
    );
    if let Some(suffix) = scheme.key_suffix() {
        key.push('-');
        key.push_str(&suffix);
    }
    key
}

/// `{homeAccountId}-{environment}-refreshtoken-{clientId|familyId}--`
///
/// Refresh tokens are neither realm nor scope bound, so both trailing
/// segments stay empty.
#[must_use]
pub fn refresh_token_key(home_account_id: &str, environment: &str, client_or_family: &str) -> String {
    format!(
        "{home_account_id}-{}-{KEY_SEGMENT_REFRESH_TOKEN}-{client_or_family}--",
        environment.to_ascii_lowercase()
    )
}

/// `{homeAccountId}-{environment}-idtoken-{clientId}-{realm}`
#[must_use]
pub fn id_token_key(home_account_id: &str, environment: &str, client_id: &str, realm: &str) -> String {
    format!(
        "{home_account_id}-{}-{KEY_SEGMENT_ID_TOKEN}-{client_id}-{realm}",
        environment.to_ascii_lowercase()
    )
}

/// `appmetadata-{environment}-{clientId}`
#[must_use]
pub fn app_metadata_key(environment: &str, client_id: &str) -> String {
    format!("{KEY_PREFIX_APP_METADATA}-{}-{client_id}", environment.to_ascii_lowercase())
}

/// The identity every account-bound entity hangs off: one user in one
/// environment. Used as the back-reference index key for cascade deletes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountScope {
    home_account_id: String,
    environment: String,
}

impl AccountScope {
    #[must_use]
    pub fn new(home_account_id: &str, environment: &str) -> Self {
        Self {
            home_account_id: home_account_id.to_string(),
            environment: environment.to_ascii_lowercase(),
        }
    }

    #[must_use]
    pub fn home_account_id(&self) -> &str {
        &self.home_account_id
    }

    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }
}
