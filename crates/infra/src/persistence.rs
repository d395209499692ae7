//! Persistence aspect synchronizing a token cache with its secret store
//!
//! ## Protocol
//! - **Mutating access**: take the cross-process lock, reload the store into
//!   the cache, let the operation run, write the cache back in
//!   `after_cache_access`, release the lock.
//! - **Read-only access**: when the store's modification time equals the
//!   last one this aspect saw, skip disk entirely. Otherwise take the lock,
//!   reload and release at once.
//!
//! Read-side problems (unreadable store, corrupt document, lock timeout on a
//! read) are logged at the severity [`InfraError`] classifies them with and
//! leave the in-memory cache as it is; a fresh token from the provider is
//! always a valid fallback. The next read-only access tries the store again. Lock timeouts and store
//! failures on the write path are returned to the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::SystemTime;

use parking_lot::Mutex;
use tokencache_core::cache::serializer;
use tokencache_core::{CacheAccessAspect, CacheAccessContext, SecretStore, TokenCache};
use tokencache_domain::{Result, TokenCacheError};
use tokencache_common::{ErrorClassification, ErrorSeverity};
use tracing::{debug, error, warn};

use crate::errors::InfraError;
use crate::file_lock::{CrossProcessFileLock, FileLockGuard};

/// [`CacheAccessAspect`] backed by a [`SecretStore`] and a
/// [`CrossProcessFileLock`]
pub struct PersistenceAspect {
    store: Arc<dyn SecretStore>,
    lock: CrossProcessFileLock,
    last_seen: Mutex<Option<SystemTime>>,
    /// Write-path locks held between `before` and `after`, per thread
    held: Mutex<HashMap<ThreadId, FileLockGuard>>,
    read_count: AtomicUsize,
    write_count: AtomicUsize,
}

impl std::fmt::Debug for PersistenceAspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAspect")
            .field("lock", &self.lock.path())
            .field("read_count", &self.read_count())
            .field("write_count", &self.write_count())
            .finish_non_exhaustive()
    }
}

impl PersistenceAspect {
    pub fn new(store: Arc<dyn SecretStore>, lock: CrossProcessFileLock) -> Self {
        Self {
            store,
            lock,
            last_seen: Mutex::new(None),
            held: Mutex::new(HashMap::new()),
            read_count: AtomicUsize::new(0),
            write_count: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    #[must_use]
    pub const fn lock(&self) -> &CrossProcessFileLock {
        &self.lock
    }

    /// Number of store reads performed so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Number of store writes performed so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Forget the last observed timestamp so the next read reloads.
    pub fn invalidate(&self) {
        *self.last_seen.lock() = None;
    }

    fn is_unchanged(&self) -> bool {
        match self.store.last_modified() {
            Some(modified) => *self.last_seen.lock() == Some(modified),
            None => false,
        }
    }

    /// Replace the cache with the stored document. Must run under the lock.
    ///
    /// The observed timestamp is only recorded once the store was read and
    /// parsed, so a failed reload is retried on the next access.
    fn reload(&self, cache: &TokenCache) {
        let observed = self.store.last_modified();
        self.read_count.fetch_add(1, Ordering::Relaxed);

        let loaded = match self.store.read() {
            Ok(Some(bytes)) => match serializer::deserialize_bytes(&bytes) {
                Ok(snapshot) => {
                    cache.restore(snapshot);
                    debug!(bytes = bytes.len(), "persistence.reloaded");
                    true
                }
                Err(error) => {
                    report_absorbed("parse", &InfraError(error));
                    false
                }
            },
            Ok(None) => {
                debug!("persistence.nothing_persisted");
                true
            }
            Err(error) => {
                report_absorbed("read", &InfraError(error));
                false
            }
        };

        if loaded {
            *self.last_seen.lock() = observed;
        }
    }

    fn persist(&self, cache: &TokenCache) -> Result<()> {
        let document = cache.serialize()?;
        self.store.write(document.as_bytes())?;
        self.write_count.fetch_add(1, Ordering::Relaxed);
        *self.last_seen.lock() = self.store.last_modified();
        debug!(bytes = document.len(), "persistence.written");
        Ok(())
    }
}

impl CacheAccessAspect for PersistenceAspect {
    fn before_cache_access(&self, context: &CacheAccessContext<'_>) -> Result<()> {
        if context.has_cache_changed {
            let guard = self.lock.lock()?;
            self.reload(context.token_cache);
            if let Some(stale) = self.held.lock().insert(thread::current().id(), guard) {
                warn!(client_id = %context.client_id, "persistence.nested_write_access");
                drop(stale);
            }
            return Ok(());
        }

        if self.is_unchanged() {
            debug!(client_id = %context.client_id, "persistence.read_skipped_unchanged");
            return Ok(());
        }

        match self.lock.lock() {
            Ok(guard) => {
                self.reload(context.token_cache);
                if let Err(error) = guard.unlock() {
                    warn!(error = %error, "persistence.unlock_failed");
                }
            }
            Err(error) => report_absorbed("lock", &InfraError(error)),
        }
        Ok(())
    }

    fn after_cache_access(&self, context: &CacheAccessContext<'_>) -> Result<()> {
        let guard = self.held.lock().remove(&thread::current().id());

        let outcome = if context.has_cache_changed {
            if guard.is_some() {
                self.persist(context.token_cache)
            } else {
                Err(TokenCacheError::Internal(
                    "cache write-back attempted without holding the file lock".into(),
                ))
            }
        } else {
            Ok(())
        };

        if let Some(guard) = guard {
            if let Err(error) = guard.unlock() {
                warn!(error = %error, "persistence.unlock_failed");
            }
        }

        if let Err(error) = &outcome {
            warn!(client_id = %context.client_id, error = %error, "persistence.write_failed");
        }
        outcome
    }
}

/// Log a read-path failure that the aspect swallows.
fn report_absorbed(stage: &'static str, error: &InfraError) {
    let retryable = error.is_retryable();
    match error.severity() {
        ErrorSeverity::Info => debug!(stage, retryable, error = %error, "persistence.read_failed"),
        ErrorSeverity::Warning => warn!(stage, retryable, error = %error, "persistence.read_failed"),
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(stage, retryable, error = %error, "persistence.read_failed");
        }
    }
}
