//! Shared helpers for `tokencache-infra` integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tempfile::TempDir;
use tokencache_core::{SecretStore, SharedTokenCache, TokenCache};
use tokencache_domain::{
    AccessTokenEntity, LockRetrySettings, PersistenceSettings, Result, ScopeSet, TokenCacheError,
};
use tokencache_infra::{CrossProcessFileLock, FileSecretStore, PersistenceAspect};

pub const ENV: &str = "login.example.com";
pub const CLIENT: &str = "client-id";

static KEYRING_MOCK: Once = Once::new();
static TRACING: Once = Once::new();

/// Route every `keyring::Entry` of this test binary to the in-memory mock.
pub fn install_keyring_mock() {
    KEYRING_MOCK.call_once(|| {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
    });
}

pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
    });
}

/// Generous budget so contending test threads never time out.
pub fn patient_retry() -> LockRetrySettings {
    LockRetrySettings { delay_ms: 10, retry_count: 1_000 }
}

pub fn settings(dir: &Path) -> PersistenceSettings {
    PersistenceSettings::builder("cache.json", dir)
        .use_unprotected_file_on_linux()
        .lock_retry(10, 1_000)
        .build()
        .expect("test settings are valid")
}

/// A cache participant as one process would hold it: own in-memory cache,
/// own aspect, shared directory.
pub struct Participant {
    pub cache: Arc<TokenCache>,
    pub aspect: Arc<PersistenceAspect>,
    pub shared: SharedTokenCache,
}

impl Participant {
    pub fn new(dir: &Path) -> Self {
        let aspect = Arc::new(PersistenceAspect::new(
            Arc::new(FileSecretStore::new(dir.join("cache.json"))),
            CrossProcessFileLock::new(dir.join(".lockfile"), patient_retry()),
        ));
        Self::with_aspect(aspect)
    }

    pub fn with_aspect(aspect: Arc<PersistenceAspect>) -> Self {
        let cache = Arc::new(TokenCache::new());
        let shared = SharedTokenCache::with_aspect(cache.clone(), aspect.clone());
        Self { cache, aspect, shared }
    }
}

pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("temp dir should be created")
}

pub fn app_token(scope: &str, secret: &str) -> AccessTokenEntity {
    AccessTokenEntity::new(CLIENT, ENV, secret)
        .with_realm("tenant")
        .with_scopes(&ScopeSet::parse(scope))
        .with_lifetime(1_700_000_000, 4_000_000_000)
}

/// In-memory store whose reads or writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub data: Mutex<Option<Vec<u8>>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    /// Reads that fail before the store starts answering
    pub failing_reads: AtomicUsize,
    pub modified: Option<SystemTime>,
}

impl FlakyStore {
    /// Store already holding `document`, with a timestamp that never moves.
    pub fn holding(document: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Mutex::new(Some(document.into())),
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)),
            ..Default::default()
        }
    }

    pub fn failing_first_reads(self, count: usize) -> Self {
        self.failing_reads.store(count, Ordering::SeqCst);
        self
    }
}

impl SecretStore for FlakyStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        let transient = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if self.fail_reads || transient {
            return Err(TokenCacheError::StoreAccess("disk unplugged".into()));
        }
        Ok(self.data.lock().clone())
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(TokenCacheError::StoreAccess("disk full".into()));
        }
        *self.data.lock() = Some(data.to_vec());
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        *self.data.lock() = None;
        Ok(())
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.modified
    }
}
