//! In-memory token cache, its persisted document format and the shared
//! wrapper that runs persistence hooks around every access.

pub mod lookup;
pub mod serializer;
pub mod shared;
pub mod state;
pub mod token_cache;

pub use lookup::{AccessTokenLookup, AccessTokenQuery, CachedAccessToken};
pub use shared::SharedTokenCache;
pub use state::{CacheSnapshot, CacheStats, RemovalSummary};
pub use token_cache::{SavedTokens, TokenCache};
