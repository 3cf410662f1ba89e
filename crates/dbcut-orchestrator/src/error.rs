use thiserror::Error;

use crate::state::RunState;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("illegal run-state transition {from:?} -> {to:?}")]
    InvalidTransition { from: RunState, to: RunState },
    #[error("no manifest entries to run")]
    EmptyManifest,
    #[error(transparent)]
    Schema(#[from] dbcut_schema::SchemaError),
    #[error(transparent)]
    Compile(#[from] dbcut_compiler::CompileError),
    #[error(transparent)]
    Extract(#[from] dbcut_engine::ExtractError),
    #[error(transparent)]
    Cache(#[from] dbcut_cache::CacheError),
    #[error(transparent)]
    Load(#[from] dbcut_load::LoadError),
    #[error(transparent)]
    Source(#[from] dbcut_core::CoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
