use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    SourceQuery(#[from] dbcut_core::CoreError),
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error("relationship `{relationship}` not found on table `{table}`")]
    UnknownRelationship { table: String, relationship: String },
    #[error("association table `{0}` does not expose the foreign keys a many-to-many load needs")]
    MalformedAssociation(String),
}
