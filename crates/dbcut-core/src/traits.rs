use async_trait::async_trait;

use crate::error::Result;
use crate::introspect::RawTable;
use crate::value::{Row, Value};

/// The introspection surface a concrete driver exposes to the Schema
/// Reflector. A driver implementation lives outside this crate (it is the
/// "dialect-specific SQL driver" collaborator named out of scope in the
/// specification); this trait is the seam it plugs into.
#[async_trait]
pub trait SourceIntrospector: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn table(&self, name: &str) -> Result<RawTable>;

    /// A metadata-derived row count estimate (e.g. `information_schema`),
    /// not an exact `COUNT(*)`. `None` if the driver has no cheap estimate.
    async fn estimated_row_count(&self, _table: &str) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Runs parameterized SQL text and returns rows or an affected-row count.
/// The Extraction Engine and Load Pipeline are both written against this
/// trait rather than any specific driver.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;
}

/// A transaction in progress. Consuming `self` on commit/rollback mirrors
/// the teacher's connection trait shape and prevents reuse after either
/// call.
#[async_trait]
pub trait Transaction: Send {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
