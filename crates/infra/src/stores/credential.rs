//! Shared plumbing of the keychain and keyring stores

use std::time::SystemTime;

use tokencache_common::KeychainProvider;
use tokencache_domain::Result;
use tracing::debug;

use super::companion::CompanionFile;
use crate::errors::InfraError;

/// One credential store entry plus the companion file tracking its changes
#[derive(Debug)]
pub(crate) struct CredentialBackedStore {
    provider: KeychainProvider,
    companion: CompanionFile,
    kind: &'static str,
}

impl CredentialBackedStore {
    pub(crate) fn new(provider: KeychainProvider, companion: CompanionFile, kind: &'static str) -> Self {
        Self { provider, companion, kind }
    }

    pub(crate) fn provider(&self) -> &KeychainProvider {
        &self.provider
    }

    pub(crate) fn companion(&self) -> &CompanionFile {
        &self.companion
    }

    pub(crate) fn read(&self) -> Result<Option<Vec<u8>>> {
        self.provider.read_secret().map_err(|e| InfraError::from(e).into())
    }

    pub(crate) fn write(&self, data: &[u8]) -> Result<()> {
        self.provider.write_secret(data).map_err(InfraError::from)?;
        self.companion.touch();
        debug!(store = self.kind, service = %self.provider.service_name(), bytes = data.len(), "credential_store.written");
        Ok(())
    }

    pub(crate) fn delete(&self) -> Result<()> {
        self.provider.delete_secret().map_err(InfraError::from)?;
        self.companion.touch();
        debug!(store = self.kind, service = %self.provider.service_name(), "credential_store.deleted");
        Ok(())
    }

    pub(crate) fn last_modified(&self) -> Option<SystemTime> {
        self.companion.last_modified()
    }
}
