//! Client-level metadata, independent of any account

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys::app_metadata_key;

/// Records which refresh-token family (if any) a client belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppMetadataEntity {
    pub client_id: String,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl AppMetadataEntity {
    #[must_use]
    pub fn new(client_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            environment: environment.into(),
            family_id: None,
            additional_fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_family_id(mut self, family_id: impl Into<String>) -> Self {
        self.family_id = Some(family_id.into()).filter(|id: &String| !id.is_empty());
        self
    }

    #[must_use]
    pub fn cache_key(&self) -> String {
        app_metadata_key(&self.environment, &self.client_id)
    }
}
