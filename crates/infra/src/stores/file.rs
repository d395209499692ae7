//! Unprotected file store

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::NamedTempFile;
use tokencache_core::SecretStore;
use tokencache_domain::Result;
use tracing::debug;

use crate::errors::InfraError;

/// Stores the cache document as a plain file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a concurrent reader sees either the old or the new
/// document, never a partial one.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for FileSecretStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(InfraError::from(error).into()),
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory).map_err(InfraError::from)?;

        let mut staged = NamedTempFile::new_in(&directory).map_err(InfraError::from)?;
        staged.write_all(data).map_err(InfraError::from)?;
        staged.as_file().sync_all().map_err(InfraError::from)?;
        staged.persist(&self.path).map_err(|e| InfraError::from(e.error))?;

        debug!(path = %self.path.display(), bytes = data.len(), "file_store.written");
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(InfraError::from(error).into()),
        }
    }

    fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|meta| meta.modified()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("cache.json"));

        assert_eq!(store.read().unwrap(), None);
        assert!(store.last_modified().is_none());
        store.delete().unwrap();
    }

    #[test]
    fn write_replaces_content_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("a").join("b").join("cache.json"));

        store.write(b"{\"first\":1}").unwrap();
        store.write(b"{}").unwrap();

        assert_eq!(store.read().unwrap().as_deref(), Some(&b"{}"[..]));
        assert!(store.last_modified().is_some());
        let leftovers = fs::read_dir(store.path().parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);

        store.delete().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }
}
