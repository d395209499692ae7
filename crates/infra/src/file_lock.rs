//! Cross-process lock around the persisted cache
//!
//! Mutual exclusion comes from an OS advisory lock on a sentinel file next
//! to the cache (`{cache_directory}/.lockfile`). The sentinel is created on
//! demand and deleted on release; its content is a diagnostic tag naming the
//! holder and is not read by anyone.
//!
//! The lock is not re-entrant: two acquisitions from the same process (even
//! the same thread) open separate handles and exclude each other.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

use chrono::Utc;
use tokencache_domain::{LockRetrySettings, PersistenceSettings, Result, TokenCacheError};
use tracing::{debug, info, warn};

/// Retrying acquirer of the sentinel-file lock
#[derive(Debug, Clone)]
pub struct CrossProcessFileLock {
    path: PathBuf,
    retry: LockRetrySettings,
}

impl CrossProcessFileLock {
    pub fn new(path: impl Into<PathBuf>, retry: LockRetrySettings) -> Self {
        Self { path: path.into(), retry }
    }

    /// Lock at the settings' sentinel path with its retry budget.
    #[must_use]
    pub fn for_settings(settings: &PersistenceSettings) -> Self {
        Self::new(settings.lock_file_path(), settings.lock_retry)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the lock is held or the retry budget is spent.
    ///
    /// # Errors
    /// Returns `TokenCacheError::LockAcquisition` after `retry_count` failed
    /// attempts.
    pub fn lock(&self) -> Result<FileLockGuard> {
        self.create_sentinel();

        let attempts = self.retry.retry_count.max(1);
        for attempt in 1..=attempts {
            match self.try_acquire() {
                Ok(Some(file)) => {
                    let mut guard = FileLockGuard { file: Some(file), path: self.path.clone() };
                    guard.write_tag();
                    debug!(path = %self.path.display(), attempt, "file_lock.acquired");
                    return Ok(guard);
                }
                Ok(None) => {
                    debug!(path = %self.path.display(), attempt, "file_lock.contended");
                }
                Err(error) => {
                    debug!(path = %self.path.display(), attempt, error = %error, "file_lock.attempt_failed");
                }
            }
            if attempt < attempts {
                thread::sleep(self.retry.delay());
            }
        }

        warn!(path = %self.path.display(), attempts, "file_lock.retries_exhausted");
        Err(TokenCacheError::LockAcquisition { path: self.path.display().to_string(), attempts })
    }

    fn create_sentinel(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %error, "file_lock.create_directory_failed");
            }
        }
        if let Err(error) = OpenOptions::new().write(true).create(true).truncate(false).open(&self.path)
        {
            debug!(path = %self.path.display(), error = %error, "file_lock.create_sentinel_failed");
        }
    }

    /// One non-blocking attempt. `Ok(None)` means another holder has it.
    fn try_acquire(&self) -> io::Result<Option<File>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Error(error)) => return Err(error),
        }

        // A releasing holder unlinks the sentinel before unlocking; if that
        // happened between our open and our lock, we hold an orphaned inode.
        if !still_names(&file, &self.path)? {
            debug!(path = %self.path.display(), "file_lock.sentinel_replaced");
            return Ok(None);
        }
        Ok(Some(file))
    }
}

#[cfg(unix)]
fn still_names(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(current) => Ok(current.dev() == held.dev() && current.ino() == held.ino()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

#[cfg(not(unix))]
fn still_names(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}

/// Held lock; released by [`FileLockGuard::unlock`] or on drop.
#[derive(Debug)]
pub struct FileLockGuard {
    file: Option<File>,
    path: PathBuf,
}

impl FileLockGuard {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the sentinel and release the OS lock.
    ///
    /// # Errors
    /// Returns `TokenCacheError::StoreAccess` if the OS lock cannot be
    /// released. A sentinel that is already gone is not an error.
    pub fn unlock(mut self) -> Result<()> {
        self.release()
    }

    fn write_tag(&mut self) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let tag = format!(
            "{} {:?} {}",
            std::process::id(),
            thread::current().id(),
            Utc::now().to_rfc3339()
        );
        let written = file.set_len(0).and_then(|()| file.write_all(tag.as_bytes()));
        if let Err(error) = written {
            debug!(path = %self.path.display(), error = %error, "file_lock.write_tag_failed");
        }
    }

    fn release(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        // Unlink while still holding the lock so no waiter can win the
        // inode we are about to orphan.
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "file_lock.remove_sentinel_failed");
            }
        }

        let unlocked = file.unlock();
        drop(file);
        match unlocked {
            Ok(()) => {
                debug!(path = %self.path.display(), "file_lock.released");
                Ok(())
            }
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "file_lock.unlock_failed");
                Err(TokenCacheError::StoreAccess(format!(
                    "failed to release lock '{}': {error}",
                    self.path.display()
                )))
            }
        }
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if self.file.is_some() {
            info!(path = %self.path.display(), "file_lock.released_on_drop");
            let _ = self.release();
        }
    }
}
