use std::path::Path;

use crate::error::SchemaError;
use crate::model::Schema;

/// Persist the reflected schema to `<cache_dir>/metadata.cache`, via a
/// write-to-temp-file-then-rename so a reader never observes a partially
/// written file.
pub fn cache_schema(schema: &Schema, cache_dir: &Path) -> Result<(), SchemaError> {
    std::fs::create_dir_all(cache_dir)?;
    let dest = cache_dir.join("metadata.cache");
    let tmp = dest.with_extension("cache.tmp");

    let json = serde_json::to_vec(schema)?;
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &dest)?;

    tracing::debug!(path = %dest.display(), "cached reflected schema");
    Ok(())
}

/// Load a previously cached schema, if present.
pub fn load_cached_schema(cache_dir: &Path) -> Result<Option<Schema>, SchemaError> {
    let path = cache_dir.join("metadata.cache");
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path)?;
    let schema: Schema = serde_json::from_slice(&bytes)?;
    tracing::debug!(path = %path.display(), "loaded cached schema");
    Ok(Some(schema))
}
