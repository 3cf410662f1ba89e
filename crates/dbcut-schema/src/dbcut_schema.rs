//! dbcut-schema - the reflected schema model, dialect translation, and DDL
//! emission.

mod cache;
mod ddl;
mod dialect_apply;
mod error;
mod model;
mod reflect;

pub use cache::{cache_schema, load_cached_schema};
pub use ddl::emit_ddl;
pub use dialect_apply::apply_dialect;
pub use error::SchemaError;
pub use model::{
    Column, ForeignKey, Index, Relationship, RelationshipDirection, Schema, Table,
};
pub use reflect::SchemaReflector;

#[cfg(test)]
mod tests;
