use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialectError {
    #[error("dialect {dialect} has no mapping for source type `{source_type}`")]
    UnmappedType { dialect: String, source_type: String },

    #[error("dialect error: {0}")]
    Other(String),
}
