//! Token cache constants
//!
//! Centralized location for the domain-level constants shared by the cache
//! model, the serializer and the persistence layer.

// Persisted document sections
pub const SECTION_ACCESS_TOKEN: &str = "AccessToken";
pub const SECTION_REFRESH_TOKEN: &str = "RefreshToken";
pub const SECTION_ID_TOKEN: &str = "IdToken";
pub const SECTION_ACCOUNT: &str = "Account";
pub const SECTION_APP_METADATA: &str = "AppMetadata";

// Credential type markers (persisted `credential_type` and key segments)
pub const CREDENTIAL_TYPE_ACCESS_TOKEN: &str = "AccessToken";
pub const CREDENTIAL_TYPE_REFRESH_TOKEN: &str = "RefreshToken";
pub const CREDENTIAL_TYPE_ID_TOKEN: &str = "IdToken";
pub const KEY_SEGMENT_ACCESS_TOKEN: &str = "accesstoken";
pub const KEY_SEGMENT_REFRESH_TOKEN: &str = "refreshtoken";
pub const KEY_SEGMENT_ID_TOKEN: &str = "idtoken";
pub const KEY_PREFIX_APP_METADATA: &str = "appmetadata";

pub const AUTHORITY_TYPE_MSSTS: &str = "MSSTS";
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Scopes added implicitly by OIDC flows; ignored when matching targets.
pub const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// A cached access token is only served while `now + skew < expires_on`.
pub const ACCESS_TOKEN_EXPIRY_SKEW_SECS: i64 = 300;

// Persistence defaults
pub const LOCK_FILE_NAME: &str = ".lockfile";
pub const DEFAULT_LOCK_RETRY_DELAY_MS: u64 = 100;
pub const DEFAULT_LOCK_RETRY_COUNT: u32 = 60;
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "tokencache.cache";
pub const DEFAULT_KEYCHAIN_ACCOUNT: &str = "TokenCache";
