use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown table `{0}`")]
    InvalidTable(String),
    #[error("field `{0}` is not reachable from the plan's eager-load set")]
    InvalidField(String),
    #[error("operator `{op}` is not valid for field `{field}`")]
    InvalidOperator { field: String, op: String },
    #[error("query syntax error: {0}")]
    QuerySyntax(String),
}
