//! Companion file carrying a modification time for stores that have none

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use tracing::warn;

/// File whose mtime is bumped on every change to a credential-backed store.
///
/// Its content (the time of the last change) is informational only.
#[derive(Debug, Clone)]
pub struct CompanionFile {
    path: PathBuf,
}

impl CompanionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a change. Failures are logged: a missed touch only costs
    /// other processes a skipped re-read until the next change.
    pub fn touch(&self) {
        if let Err(error) = self.write_stamp() {
            warn!(path = %self.path.display(), error = %error, "companion_file.touch_failed");
        }
    }

    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|meta| meta.modified()).ok()
    }

    fn write_stamp(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, Utc::now().to_rfc3339())
    }
}
