//! dbcut-load - attaches a tree of detached entities to a destination
//! connection and flushes them as chunked, duplicate-tolerant inserts
//! inside a single FK-disabled transaction.

mod error;
mod pipeline;

pub use error::LoadError;
pub use pipeline::{flatten, LoadPipeline, LoadReport, DEFAULT_CHUNK_SIZE};

#[cfg(test)]
mod tests;
