//! Integration tests for the credential-store backed secret stores
//!
//! All credential store traffic goes to `keyring::mock`, which keeps state
//! per entry handle; each test therefore works through a single store
//! instance.

mod support;

use std::sync::Arc;

use support::*;
use tokencache_core::SecretStore;
use tokencache_domain::{KeychainSettings, KeyringAttribute, PersistenceSettings};
use tokencache_infra::{
    CrossProcessFileLock, EncryptedFileSecretStore, KeychainSecretStore, KeyringSecretStore,
    PersistenceAspect, StoreKind,
};

/// Validates the keychain store contract.
///
/// Assertions:
/// - Nothing is read before the first write
/// - A write is read back and stamps the companion file
/// - Delete is idempotent and empties the store
#[test]
fn keychain_store_round_trip() -> anyhow::Result<()> {
    install_keyring_mock();
    let dir = temp_dir();
    let keychain = KeychainSettings { service: "tokencache.test".into(), account: "cache".into() };
    let store = KeychainSecretStore::new(&keychain, dir.path().join("cache.json"))?;

    assert_eq!(store.read()?, None);
    assert_eq!(store.last_modified(), None);

    store.write(b"{\"AccessToken\":{}}")?;
    assert_eq!(store.read()?, Some(b"{\"AccessToken\":{}}".to_vec()));
    assert!(store.last_modified().is_some());
    assert!(store.companion().path().exists());

    store.delete()?;
    store.delete()?;
    assert_eq!(store.read()?, None);
    Ok(())
}

/// Validates keyring addressing and round trip.
///
/// Assertions:
/// - Attribute pairs select the credential and the settings are retained
/// - Written bytes are read back
#[test]
fn keyring_store_round_trip() {
    install_keyring_mock();
    let dir = temp_dir();
    let settings = PersistenceSettings::builder("cache.json", dir.path())
        .keyring(
            "default",
            "tokencache.schema",
            "Token cache",
            Some(KeyringAttribute::new("app", "tests")),
            Some(KeyringAttribute::new("version", "1")),
        )
        .build()
        .unwrap();

    let store = KeyringSecretStore::from_settings(&settings).unwrap();
    assert_eq!(store.settings().collection, "default");

    store.write(b"cache").unwrap();
    assert_eq!(store.read().unwrap(), Some(b"cache".to_vec()));
    assert_eq!(store.companion().path(), settings.cache_file_path());
}

/// Validates the encrypted file store with a key held in the credential
/// store.
///
/// Assertions:
/// - The file on disk does not contain the plaintext
/// - The same instance decrypts what it wrote
#[test]
fn encrypted_file_with_stored_key_round_trip() {
    install_keyring_mock();
    let dir = temp_dir();
    let path = dir.path().join("cache.bin");
    let keychain = KeychainSettings { service: "tokencache.enc".into(), account: "cache".into() };
    let store = EncryptedFileSecretStore::with_stored_key(&path, &keychain).unwrap();

    store.write(b"refresh-token-secret").unwrap();

    let on_disk = std::fs::read(&path).unwrap();
    assert!(!on_disk.windows(20).any(|w| w == b"refresh-token-secret"));
    assert_eq!(store.read().unwrap(), Some(b"refresh-token-secret".to_vec()));
}

/// Validates persistence through a keychain store built by the factory.
///
/// Assertions:
/// - A write through the aspect lands in the credential store
/// - An immediate read-only access is skipped thanks to the companion file
#[test]
fn persistence_over_keychain_store() {
    install_keyring_mock();
    init_test_tracing();
    let dir = temp_dir();
    let settings = PersistenceSettings::builder("cache.json", dir.path())
        .keychain("tokencache.persist", "cache")
        .lock_retry(10, 1_000)
        .build()
        .unwrap();

    let store = StoreKind::Keychain.build(&settings).unwrap();
    let aspect = Arc::new(PersistenceAspect::new(
        store.clone(),
        CrossProcessFileLock::for_settings(&settings),
    ));
    let participant = Participant::with_aspect(aspect.clone());

    participant
        .shared
        .write(CLIENT, |cache| {
            cache.upsert_access_token(app_token("a", "at-a"));
            Ok(())
        })
        .unwrap();
    assert!(store.read().unwrap().is_some());

    let reads_before = aspect.read_count();
    let count = participant.shared.read(CLIENT, |cache| cache.stats().access_tokens).unwrap();
    assert_eq!(count, 1);
    assert_eq!(aspect.read_count(), reads_before);
}
