use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    DestinationQuery(#[from] dbcut_core::CoreError),
    #[error("flush failed after {rows_flushed} rows, transaction rolled back: {source}")]
    FlushFailed {
        rows_flushed: u64,
        #[source]
        source: dbcut_core::CoreError,
    },
}
