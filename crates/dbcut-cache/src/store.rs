use std::fs;
use std::path::PathBuf;

use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::CacheError;
use crate::lock::CacheLock;

/// Identifies one cache entry: `<cache_dir>/<dialect>/<host>/<database>/
/// <root_table>-<cache_key>`.
#[derive(Debug, Clone)]
pub struct CacheLocation {
    pub dialect: String,
    pub host: String,
    pub database: String,
    pub root_table: String,
    pub cache_key: String,
}

impl CacheLocation {
    fn dir(&self, root: &std::path::Path) -> PathBuf {
        root.join(&self.dialect).join(&self.host).join(&self.database)
    }

    fn basename(&self) -> String {
        format!("{}-{}", self.root_table, self.cache_key)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub rows: JsonValue,
    pub count: u64,
}

pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn cache_path(&self, loc: &CacheLocation) -> PathBuf {
        loc.dir(&self.root).join(format!("{}.cache", loc.basename()))
    }

    fn count_path(&self, loc: &CacheLocation) -> PathBuf {
        loc.dir(&self.root).join(format!("{}.count", loc.basename()))
    }

    fn lock_path(&self, loc: &CacheLocation) -> PathBuf {
        loc.dir(&self.root).join(format!("{}.lock", loc.basename()))
    }

    /// Acquires the per-entry advisory lock. Only needed when concurrent
    /// runs share `self.root`.
    pub fn lock(&self, loc: &CacheLocation) -> Result<CacheLock, CacheError> {
        CacheLock::acquire(&self.lock_path(loc))
    }

    /// True iff both the `.cache` and `.count` sidecars exist. A `.cache`
    /// with no `.count` is corrupt, not cached.
    pub fn is_cached(&self, loc: &CacheLocation) -> bool {
        self.cache_path(loc).exists() && self.count_path(loc).exists()
    }

    /// Writes `rows` then `count`, each via write-to-temp-then-rename so a
    /// reader never observes a half-written sidecar.
    pub fn save(&self, loc: &CacheLocation, rows: &JsonValue, count: u64) -> Result<(), CacheError> {
        let dir = loc.dir(&self.root);
        fs::create_dir_all(&dir)?;

        let cache_path = self.cache_path(loc);
        let cache_tmp = cache_path.with_extension("cache.tmp");
        fs::write(&cache_tmp, serde_json::to_vec(rows)?)?;
        fs::rename(&cache_tmp, &cache_path)?;

        let count_path = self.count_path(loc);
        let count_tmp = count_path.with_extension("count.tmp");
        fs::write(&count_tmp, count.to_string())?;
        fs::rename(&count_tmp, &count_path)?;

        Ok(())
    }

    /// Reads the entry back, or `None` on a miss or on a corrupt entry
    /// (`.cache` present without its `.count` sibling, or unparsable
    /// contents — both logged at WARN and treated as a miss so the caller
    /// falls through to re-extraction).
    pub fn load(&self, loc: &CacheLocation) -> Result<Option<CacheEntry>, CacheError> {
        let cache_path = self.cache_path(loc);
        let count_path = self.count_path(loc);

        if !cache_path.exists() {
            return Ok(None);
        }
        if !count_path.exists() {
            warn!(path = %cache_path.display(), "cache entry missing its .count sibling, treating as miss");
            return Ok(None);
        }

        let count_text = fs::read_to_string(&count_path)?;
        let count: u64 = match count_text.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                warn!(path = %count_path.display(), "cache entry has a corrupt .count file, treating as miss");
                return Ok(None);
            }
        };

        let raw = fs::read(&cache_path)?;
        let rows: JsonValue = match serde_json::from_slice(&raw) {
            Ok(v) => v,
            Err(_) => {
                warn!(path = %cache_path.display(), "cache entry has corrupt json, treating as miss");
                return Ok(None);
            }
        };

        Ok(Some(CacheEntry { rows, count }))
    }

    /// Removes both sidecars for one entry. Missing files are not an error.
    pub fn purge(&self, loc: &CacheLocation) -> Result<(), CacheError> {
        for path in [self.cache_path(loc), self.count_path(loc)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Removes the entire cache directory.
    pub fn purge_all(&self) -> Result<(), CacheError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
