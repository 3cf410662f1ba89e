use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("dialect error: {0}")]
    Dialect(#[from] dbcut_dialect::DialectError),

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error("introspection error: {0}")]
    Introspection(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
