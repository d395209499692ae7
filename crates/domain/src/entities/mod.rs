//! Cache entity types
//!
//! The cache is normalized: accounts, access tokens, refresh tokens, ID
//! tokens and app metadata live in independent maps keyed by composite
//! strings (see [`crate::keys`]).

pub mod account;
pub mod app_metadata;
pub mod credential;
pub mod environment;
pub mod response;
pub mod scope;

pub use account::{AccountEntity, TenantProfile};
pub use app_metadata::AppMetadataEntity;
pub use credential::{AccessTokenEntity, IdTokenEntity, RefreshTokenEntity};
pub use environment::EnvironmentAliases;
pub use response::{
    AuthenticationResult, ResponseIdentity, SilentTokenRequest, TokenResponse, TokenSource,
};
pub use scope::{AuthScheme, ScopeSet};
