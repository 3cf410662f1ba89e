use thiserror::Error;

/// Shared error type for concerns that don't warrant their own enum.
///
/// Component crates (schema, compiler, cache, load, ...) define their own
/// error types rather than growing variants here; this one exists for the
/// trait default methods and glue code that live directly in `dbcut-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
