use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// A per-cache-key advisory lock, held only for the lifetime of the guard.
/// Only needed when concurrent runs share a cache directory; a single-run
/// invocation never contends for one.
pub struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    pub(crate) fn acquire(lock_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(lock_path) {
            Ok(_) => Ok(Self { path: lock_path.to_path_buf() }),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(CacheError::Locked(lock_path.display().to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
