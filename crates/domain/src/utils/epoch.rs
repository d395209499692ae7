//! Serde helpers for epoch-second timestamps stored as decimal strings
//!
//! The persisted cache document stores every timestamp as a string
//! (`"1700000000"`) so that libraries written in other languages can share
//! the file. Readers also accept bare JSON numbers.

use serde::de::{self, Deserialize, Deserializer};
use serde::Serializer;

/// Serde serialization result type
type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum EpochRepr {
    Text(String),
    Number(i64),
}

impl EpochRepr {
    fn into_seconds<E: de::Error>(self) -> Result<Option<i64>, E> {
        match self {
            Self::Number(seconds) => Ok(Some(seconds)),
            Self::Text(text) if text.trim().is_empty() => Ok(None),
            Self::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|e| E::custom(format!("invalid epoch seconds '{text}': {e}"))),
        }
    }
}

/// Required timestamp: `i64` <-> `"1700000000"`
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use tokencache_domain::utils::epoch::epoch_string;
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "epoch_string")]
///     cached_at: i64,
/// }
///
/// let json = serde_json::to_string(&Example { cached_at: 42 }).unwrap();
/// assert_eq!(json, r#"{"cached_at":"42"}"#);
/// ```
pub mod epoch_string {
    use super::{Deserialize, Deserializer, EpochRepr, SerializeResult, Serializer};

    /// Serialize epoch seconds as a decimal string
    pub fn serialize<S>(seconds: &i64, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_str(&seconds.to_string())
    }

    /// Deserialize epoch seconds from a decimal string or a number
    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        EpochRepr::deserialize(deserializer)?
            .into_seconds::<D::Error>()?
            .ok_or_else(|| serde::de::Error::custom("missing epoch seconds"))
    }
}

/// Optional timestamp; empty strings and nulls read as `None`
pub mod epoch_string_opt {
    use super::{Deserialize, Deserializer, EpochRepr, SerializeResult, Serializer};

    /// Serialize optional epoch seconds as a decimal string
    pub fn serialize<S>(seconds: &Option<i64>, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        match seconds {
            Some(value) => serializer.serialize_some(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize optional epoch seconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<EpochRepr>::deserialize(deserializer)? {
            Some(repr) => repr.into_seconds::<D::Error>(),
            None => Ok(None),
        }
    }
}
