//! Token cache shared by several callers, with persistence hooks
//!
//! Every access runs as `before_cache_access -> operation ->
//! after_cache_access` behind an access gate, so two threads of one process
//! never interleave their disk round-trips on the same cache.

use std::sync::Arc;

use parking_lot::Mutex;
use tokencache_domain::Result;
use tracing::warn;

use super::token_cache::TokenCache;
use crate::ports::{CacheAccessAspect, CacheAccessContext};

/// A [`TokenCache`] plus the optional aspect that persists it
pub struct SharedTokenCache {
    cache: Arc<TokenCache>,
    aspect: Option<Arc<dyn CacheAccessAspect>>,
    gate: Mutex<()>,
}

impl std::fmt::Debug for SharedTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTokenCache")
            .field("stats", &self.cache.stats())
            .field("persistent", &self.aspect.is_some())
            .finish()
    }
}

impl SharedTokenCache {
    /// In-memory only.
    #[must_use]
    pub fn new(cache: Arc<TokenCache>) -> Self {
        Self { cache, aspect: None, gate: Mutex::new(()) }
    }

    /// Run `aspect` around every access.
    #[must_use]
    pub fn with_aspect(cache: Arc<TokenCache>, aspect: Arc<dyn CacheAccessAspect>) -> Self {
        Self { cache, aspect: Some(aspect), gate: Mutex::new(()) }
    }

    /// The underlying cache, bypassing the hooks.
    #[must_use]
    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    /// Read-only access. The aspect may refresh the cache from its store
    /// first; read-side persistence problems are absorbed by the aspect.
    ///
    /// # Errors
    /// Whatever the aspect reports as fatal.
    pub fn read<T>(&self, client_id: &str, operation: impl FnOnce(&TokenCache) -> T) -> Result<T> {
        let _gate = self.gate.lock();
        let Some(aspect) = &self.aspect else {
            return Ok(operation(&self.cache));
        };

        let context = CacheAccessContext {
            token_cache: &self.cache,
            client_id,
            has_cache_changed: false,
        };
        aspect.before_cache_access(&context)?;
        let value = operation(&self.cache);
        aspect.after_cache_access(&context)?;
        Ok(value)
    }

    /// Mutating access. The aspect holds its cross-process lock from
    /// `before` until `after` has written the cache back.
    ///
    /// # Errors
    /// Lock acquisition or write-back failures, and the operation's own
    /// error. When both the operation and the write-back fail, the
    /// operation's error wins.
    pub fn write<T>(
        &self,
        client_id: &str,
        operation: impl FnOnce(&TokenCache) -> Result<T>,
    ) -> Result<T> {
        let _gate = self.gate.lock();
        let Some(aspect) = &self.aspect else {
            return operation(&self.cache);
        };

        let mut context = CacheAccessContext {
            token_cache: &self.cache,
            client_id,
            has_cache_changed: true,
        };
        aspect.before_cache_access(&context)?;

        let outcome = operation(&self.cache);
        context.has_cache_changed = outcome.is_ok();
        let persisted = aspect.after_cache_access(&context);

        match (outcome, persisted) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(error)) => Err(error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(cleanup)) => {
                warn!(client_id = %client_id, error = %cleanup, "shared_cache.cleanup_failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokencache_domain::{AccessTokenEntity, ScopeSet, TokenCacheError};

    use super::*;

    #[derive(Default)]
    struct CountingAspect {
        before: AtomicUsize,
        after: AtomicUsize,
        writes: AtomicUsize,
    }

    impl CacheAccessAspect for CountingAspect {
        fn before_cache_access(&self, _context: &CacheAccessContext<'_>) -> Result<()> {
            self.before.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn after_cache_access(&self, context: &CacheAccessContext<'_>) -> Result<()> {
            self.after.fetch_add(1, Ordering::SeqCst);
            if context.has_cache_changed {
                self.writes.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[test]
    fn hooks_wrap_every_access() {
        let aspect = Arc::new(CountingAspect::default());
        let shared = SharedTokenCache::with_aspect(Arc::new(TokenCache::new()), aspect.clone());

        let count = shared.read("client", |cache| cache.stats().access_tokens).unwrap();
        assert_eq!(count, 0);

        shared
            .write("client", |cache| {
                cache.upsert_access_token(
                    AccessTokenEntity::new("client", "login.example.com", "at")
                        .with_scopes(&ScopeSet::parse("a")),
                );
                Ok(())
            })
            .unwrap();

        assert_eq!(aspect.before.load(Ordering::SeqCst), 2);
        assert_eq!(aspect.after.load(Ordering::SeqCst), 2);
        assert_eq!(aspect.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_operation_still_runs_after_without_writing() {
        let aspect = Arc::new(CountingAspect::default());
        let shared = SharedTokenCache::with_aspect(Arc::new(TokenCache::new()), aspect.clone());

        let result: Result<()> =
            shared.write("client", |_| Err(TokenCacheError::Provider("invalid_grant".into())));

        assert!(matches!(result, Err(TokenCacheError::Provider(_))));
        assert_eq!(aspect.after.load(Ordering::SeqCst), 1);
        assert_eq!(aspect.writes.load(Ordering::SeqCst), 0);
    }
}
