use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("cache entry for `{0}` is already locked by another run")]
    Locked(String),
}
