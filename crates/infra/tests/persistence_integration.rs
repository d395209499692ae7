//! Integration tests for the persistence aspect
//!
//! Each `Participant` models one process: its own in-memory cache and
//! aspect over a shared cache directory.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use support::*;
use tokencache_core::{SilentTokenService, TokenCache, TokenProvider};
use tokencache_domain::{
    RefreshTokenEntity, Result, ScopeSet, SilentTokenRequest, TokenCacheError, TokenResponse,
    TokenSource,
};
use tokencache_infra::{CrossProcessFileLock, PersistenceAspect};

fn write_token(participant: &Participant, scope: &str, secret: &str) -> Result<()> {
    let token = app_token(scope, secret);
    participant.shared.write(CLIENT, move |cache| {
        cache.upsert_access_token(token);
        Ok(())
    })
}

fn token_count(participant: &Participant) -> usize {
    participant.shared.read(CLIENT, |cache| cache.stats().access_tokens).unwrap()
}

/// Validates that an unchanged store is not read twice.
///
/// Assertions:
/// - The first read-only access loads the persisted cache
/// - A second read-only access with no intervening write leaves the read
///   count unchanged
#[test]
fn unchanged_store_is_read_once() {
    init_test_tracing();
    let dir = temp_dir();
    let writer = Participant::new(dir.path());
    write_token(&writer, "a", "at-a").unwrap();

    let reader = Participant::new(dir.path());
    assert_eq!(token_count(&reader), 1);
    assert_eq!(reader.aspect.read_count(), 1);

    assert_eq!(token_count(&reader), 1);
    assert_eq!(reader.aspect.read_count(), 1);
}

/// Validates that a write by another participant is picked up.
///
/// Assertions:
/// - After an external write the reader reloads and sees both tokens
#[test]
fn external_write_triggers_reload() {
    init_test_tracing();
    let dir = temp_dir();
    let writer = Participant::new(dir.path());
    let reader = Participant::new(dir.path());

    write_token(&writer, "a", "at-a").unwrap();
    assert_eq!(token_count(&reader), 1);

    // Keep the two writes in distinct modification-time ticks.
    thread::sleep(Duration::from_millis(50));
    write_token(&writer, "b", "at-b").unwrap();

    assert_eq!(token_count(&reader), 2);
    assert_eq!(reader.aspect.read_count(), 2);
}

/// Validates that concurrent writers never lose each other's updates.
///
/// Assertions:
/// - Every participant's token is present in the persisted cache
/// - No lock sentinel is left behind
#[test]
fn concurrent_participants_lose_no_updates() {
    init_test_tracing();
    let dir = temp_dir();
    let participants = 6;

    let handles: Vec<_> = (0..participants)
        .map(|i| {
            let path = dir.path().to_path_buf();
            thread::spawn(move || {
                let participant = Participant::new(&path);
                write_token(&participant, &format!("scope-{i}"), &format!("at-{i}")).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let observer = Participant::new(dir.path());
    assert_eq!(token_count(&observer), participants);
    assert!(!dir.path().join(".lockfile").exists());
}

/// Validates that write-back failures reach the caller.
///
/// Assertions:
/// - A failing store write surfaces as `StoreAccess`
/// - The lock is released anyway
#[test]
fn write_failure_propagates_and_releases_lock() {
    init_test_tracing();
    let dir = temp_dir();
    let store = Arc::new(FlakyStore { fail_writes: true, ..Default::default() });
    let aspect = Arc::new(PersistenceAspect::new(
        store,
        CrossProcessFileLock::new(dir.path().join(".lockfile"), patient_retry()),
    ));
    let participant = Participant::with_aspect(aspect.clone());

    let err = write_token(&participant, "a", "at-a").unwrap_err();

    assert!(matches!(err, TokenCacheError::StoreAccess(_)));
    assert_eq!(aspect.write_count(), 0);
    assert!(!dir.path().join(".lockfile").exists());
}

/// Validates that read failures degrade to the in-memory cache.
///
/// Assertions:
/// - A read-only access succeeds while the store cannot be read
/// - Tokens already in memory remain visible
#[test]
fn read_failure_keeps_in_memory_cache() {
    init_test_tracing();
    let dir = temp_dir();
    let store = Arc::new(FlakyStore { fail_reads: true, ..Default::default() });
    let aspect = Arc::new(PersistenceAspect::new(
        store,
        CrossProcessFileLock::new(dir.path().join(".lockfile"), patient_retry()),
    ));
    let participant = Participant::with_aspect(aspect.clone());
    participant.cache.upsert_access_token(app_token("a", "in-memory"));

    assert_eq!(token_count(&participant), 1);
    assert_eq!(aspect.read_count(), 1);
}

/// Validates that a failed reload is retried instead of being skipped.
///
/// Assertions:
/// - The first read-only access fails to read and leaves the cache empty
/// - The next access reads again although the timestamp did not move
/// - Once loaded, an unchanged store is skipped
#[test]
fn failed_read_is_retried_on_next_access() -> anyhow::Result<()> {
    init_test_tracing();
    let dir = temp_dir();
    let document = {
        let cache = TokenCache::new();
        cache.upsert_access_token(app_token("a", "persisted"));
        cache.serialize()?
    };
    let store = Arc::new(FlakyStore::holding(document).failing_first_reads(1));
    let aspect = Arc::new(PersistenceAspect::new(
        store,
        CrossProcessFileLock::new(dir.path().join(".lockfile"), patient_retry()),
    ));
    let participant = Participant::with_aspect(aspect.clone());

    assert_eq!(token_count(&participant), 0);
    assert_eq!(aspect.read_count(), 1);

    assert_eq!(token_count(&participant), 1);
    assert_eq!(aspect.read_count(), 2);

    assert_eq!(token_count(&participant), 1);
    assert_eq!(aspect.read_count(), 2);
    Ok(())
}

#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

impl TokenProvider for CountingProvider {
    fn acquire_token_by_refresh_token(
        &self,
        _request: &SilentTokenRequest,
        _refresh_token: &RefreshTokenEntity,
    ) -> Result<TokenResponse> {
        Err(TokenCacheError::Provider("unexpected refresh token grant".into()))
    }

    fn acquire_token_for_client(&self, request: &SilentTokenRequest) -> Result<TokenResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenResponse::bearer(format!("app-{n}"), 3_600, request.scopes.to_target())
            .with_realm("tenant"))
    }
}

/// Validates that a token acquired by one participant serves another.
///
/// Assertions:
/// - The first participant calls its provider
/// - The second participant is served from the persisted cache without
///   calling its own provider
#[test]
fn token_acquired_by_one_participant_serves_another() {
    init_test_tracing();
    let dir = temp_dir();
    let request = SilentTokenRequest::new(CLIENT, ENV, ScopeSet::parse("api://x/.default"));

    let first_provider = Arc::new(CountingProvider::default());
    let first = Participant::new(dir.path());
    let first_service = SilentTokenService::new(Arc::new(first.shared), first_provider.clone());
    let acquired = first_service.acquire_token_silent(&request).unwrap();
    assert_eq!(acquired.source, TokenSource::IdentityProvider);

    let second_provider = Arc::new(CountingProvider::default());
    let second = Participant::new(dir.path());
    let second_service = SilentTokenService::new(Arc::new(second.shared), second_provider.clone());
    let served = second_service.acquire_token_silent(&request).unwrap();

    assert_eq!(served.source, TokenSource::Cache);
    assert_eq!(served.access_token, acquired.access_token);
    assert_eq!(first_provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_provider.calls.load(Ordering::SeqCst), 0);
}
