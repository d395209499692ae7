//! Cache document (de)serialization
//!
//! The persisted document is a JSON object with one section per entity kind
//! (`AccessToken`, `RefreshToken`, `IdToken`, `Account`, `AppMetadata`),
//! each mapping composite keys to entity objects. Timestamps are decimal
//! strings. Sections and fields this version does not know are kept so
//! that another library version sharing the file does not lose them.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokencache_domain::constants::{
    SECTION_ACCESS_TOKEN, SECTION_ACCOUNT, SECTION_APP_METADATA, SECTION_ID_TOKEN,
    SECTION_REFRESH_TOKEN,
};
use tokencache_domain::{
    AccessTokenEntity, AccountEntity, AppMetadataEntity, IdTokenEntity, RefreshTokenEntity, Result,
    TokenCacheError,
};
use tracing::{debug, warn};

use super::state::CacheSnapshot;

const KNOWN_SECTIONS: [&str; 5] = [
    SECTION_ACCESS_TOKEN,
    SECTION_REFRESH_TOKEN,
    SECTION_ID_TOKEN,
    SECTION_ACCOUNT,
    SECTION_APP_METADATA,
];

/// Render a snapshot as the canonical cache document.
///
/// # Errors
/// Returns `TokenCacheError::Serialization` if an entity cannot be encoded.
pub fn serialize(snapshot: &CacheSnapshot) -> Result<String> {
    let mut document = snapshot.unknown_sections.clone();
    document.insert(SECTION_ACCESS_TOKEN.to_string(), section(&snapshot.access_tokens)?);
    document.insert(SECTION_REFRESH_TOKEN.to_string(), section(&snapshot.refresh_tokens)?);
    document.insert(SECTION_ID_TOKEN.to_string(), section(&snapshot.id_tokens)?);
    document.insert(SECTION_ACCOUNT.to_string(), section(&snapshot.accounts)?);
    document.insert(SECTION_APP_METADATA.to_string(), section(&snapshot.app_metadata)?);

    serde_json::to_string(&Value::Object(document))
        .map_err(|e| TokenCacheError::Serialization(e.to_string()))
}

/// Parse a cache document.
///
/// Keys are recomputed from each entity's fields, so a document written with
/// different key casing still lands on canonical keys. Entries that do not
/// parse are skipped with a warning rather than failing the whole document.
///
/// # Errors
/// Returns `TokenCacheError::Serialization` when the input is not a JSON
/// object at all.
pub fn deserialize(data: &str) -> Result<CacheSnapshot> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| TokenCacheError::Serialization(e.to_string()))?;
    let Value::Object(mut document) = value else {
        return Err(TokenCacheError::Serialization(
            "cache document must be a JSON object".to_string(),
        ));
    };

    let mut snapshot = CacheSnapshot {
        access_tokens: read_section(&document, SECTION_ACCESS_TOKEN, AccessTokenEntity::cache_key),
        refresh_tokens: read_section(
            &document,
            SECTION_REFRESH_TOKEN,
            RefreshTokenEntity::cache_key,
        ),
        id_tokens: read_section(&document, SECTION_ID_TOKEN, IdTokenEntity::cache_key),
        accounts: read_section(&document, SECTION_ACCOUNT, AccountEntity::cache_key),
        app_metadata: read_section(&document, SECTION_APP_METADATA, AppMetadataEntity::cache_key),
        unknown_sections: Map::new(),
    };

    for name in KNOWN_SECTIONS {
        document.remove(name);
    }
    if !document.is_empty() {
        debug!(sections = document.len(), "cache_serializer.unknown_sections_preserved");
    }
    snapshot.unknown_sections = document;
    Ok(snapshot)
}

/// [`deserialize`] over raw store bytes.
///
/// # Errors
/// Returns `TokenCacheError::Serialization` for non UTF-8 input or a
/// document that is not a JSON object.
pub fn deserialize_bytes(data: &[u8]) -> Result<CacheSnapshot> {
    let text = std::str::from_utf8(data)
        .map_err(|e| TokenCacheError::Serialization(format!("cache document is not UTF-8: {e}")))?;
    deserialize(text)
}

fn section<T: Serialize>(entries: &BTreeMap<String, T>) -> Result<Value> {
    let mut map = Map::with_capacity(entries.len());
    for (key, entity) in entries {
        let value = serde_json::to_value(entity)
            .map_err(|e| TokenCacheError::Serialization(format!("{key}: {e}")))?;
        map.insert(key.clone(), value);
    }
    Ok(Value::Object(map))
}

fn read_section<T, K>(document: &Map<String, Value>, name: &str, key_of: K) -> BTreeMap<String, T>
where
    T: DeserializeOwned,
    K: Fn(&T) -> String,
{
    let mut entries = BTreeMap::new();
    let Some(raw) = document.get(name) else {
        return entries;
    };
    let Value::Object(raw_entries) = raw else {
        warn!(section = name, "cache_serializer.section_not_an_object");
        return entries;
    };

    for (stored_key, value) in raw_entries {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(entity) => {
                let key = key_of(&entity);
                if key != *stored_key {
                    debug!(section = name, stored_key = %stored_key, key = %key, "cache_serializer.key_recomputed");
                }
                entries.insert(key, entity);
            }
            Err(error) => {
                warn!(section = name, key = %stored_key, error = %error, "cache_serializer.entry_skipped");
            }
        }
    }
    entries
}
