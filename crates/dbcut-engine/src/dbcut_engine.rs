//! dbcut-engine - runs a compiled `FetchPlan` against a source connection
//! and materializes the result as a tree of detached entities plus a count.

mod entity;
mod error;
mod extract;
mod sql;

pub use entity::DetachedEntity;
pub use error::ExtractError;
pub use extract::{ExtractionEngine, ExtractionResult};

#[cfg(test)]
mod tests;
