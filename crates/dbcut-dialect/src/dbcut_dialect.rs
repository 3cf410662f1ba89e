//! dbcut-dialect - per-dialect type normalization, DML/DDL rendering, and
//! FK-disable guards.
//!
//! One `DialectAdapter` implementation per driver, looked up by name at the
//! orchestrator boundary. There is no global dispatch table: a caller that
//! needs MySQL behavior holds a `MySqlAdapter`, full stop.

mod adapter;
mod error;
mod mysql;
mod naming;
mod postgres;
mod sqlite;

pub use adapter::DialectAdapter;
pub use error::DialectError;
pub use mysql::MySqlAdapter;
pub use naming::{index_name, sqlite_namespaced_index_name};
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

use dbcut_core::Dialect;

/// Look up the adapter for a named dialect. This is the one place a driver
/// name turns into behavior; nothing else in the engine branches on dialect
/// by string.
pub fn adapter_for(dialect: Dialect) -> Box<dyn DialectAdapter> {
    match dialect {
        Dialect::MySql => Box::new(MySqlAdapter),
        Dialect::PostgreSql => Box::new(PostgresAdapter),
        Dialect::Sqlite => Box::new(SqliteAdapter),
    }
}

#[cfg(test)]
mod tests;
