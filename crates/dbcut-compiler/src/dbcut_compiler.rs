//! dbcut-compiler - turns a manifest entry plus a reflected schema into a
//! `FetchPlan` the extraction engine can run: a validated predicate, a
//! bounded eager-load path set, and a stable cache key.


mod cache_key;
mod compiler;
mod error;
mod plan;
mod predicate_compile;
mod traversal;

pub use compiler::QueryCompiler;
pub use error::CompileError;
pub use plan::{EagerLoadPath, EagerLoadStep, FetchPlan, LoadStrategy, RelationTree};
pub use predicate_compile::{CompiledPredicate, FieldRef};

#[cfg(test)]
mod tests;
