//! Scope sets and auth schemes
//!
//! Scopes are compared as normalized sets: split on whitespace, lowercased,
//! deduplicated and sorted. The space-joined rendering of a normalized set is
//! the `target` used inside access token keys.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{RESERVED_SCOPES, TOKEN_TYPE_BEARER};
use crate::impl_wire_name_conversions;

/// Normalized, order-insensitive set of OAuth scopes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Parse a whitespace separated scope string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::from_scopes(raw.split_whitespace())
    }

    /// Build a set from individual scopes; entries may themselves contain
    /// whitespace separated scopes.
    pub fn from_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = scopes
            .into_iter()
            .flat_map(|scope| {
                scope.as_ref().split_whitespace().map(str::to_lowercase).collect::<Vec<_>>()
            })
            .collect();
        Self(set)
    }

    /// The canonical space-joined rendering used as a cache key target.
    #[must_use]
    pub fn to_target(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    /// Copy of the set with the OIDC reserved scopes removed.
    #[must_use]
    pub fn without_reserved(&self) -> Self {
        Self(self.0.iter().filter(|scope| !is_reserved(scope)).cloned().collect())
    }

    /// Exact set equality after stripping reserved scopes on both sides.
    ///
    /// A superset or subset never matches: `{a, b}` does not match
    /// `{a, b, c}` nor `{a}`.
    #[must_use]
    pub fn matches_exactly(&self, other: &Self) -> bool {
        self.0.iter().filter(|scope| !is_reserved(scope)).eq(other
            .0
            .iter()
            .filter(|scope| !is_reserved(scope)))
    }

    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(&scope.to_lowercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn is_reserved(scope: &str) -> bool {
    RESERVED_SCOPES.contains(&scope)
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_target())
    }
}

impl From<&str> for ScopeSet {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// How an access token is presented to the resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthScheme {
    /// Plain bearer token
    #[default]
    Bearer,
    /// Proof-of-possession token bound to a request
    Pop,
}

impl_wire_name_conversions!(AuthScheme {
    Bearer => "bearer",
    Pop => "pop",
});

impl AuthScheme {
    /// Derive the scheme from a persisted `token_type`; unknown types are
    /// treated as bearer.
    #[must_use]
    pub fn from_token_type(token_type: &str) -> Self {
        token_type.parse().unwrap_or_default()
    }

    /// The `token_type` value written for this scheme.
    #[must_use]
    pub const fn token_type(self) -> &'static str {
        match self {
            Self::Bearer => TOKEN_TYPE_BEARER,
            Self::Pop => "pop",
        }
    }

    /// Bearer keys carry no suffix so that they stay compatible with
    /// documents written before proof-of-possession existed.
    #[must_use]
    pub fn key_suffix(self) -> Option<String> {
        match self {
            Self::Bearer => None,
            Self::Pop => Some(self.to_string()),
        }
    }
}
