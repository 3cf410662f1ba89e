use std::collections::BTreeSet;

use dbcut_core::{QueryExecutor, Transaction, Value};
use dbcut_dialect::DialectAdapter;
use dbcut_engine::DetachedEntity;
use tracing::{info, warn};

use crate::error::LoadError;

/// Flush threshold; matches the original's single in-memory `merge_result`
/// call generalized into bounded-memory chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_loaded: u64,
    pub tables_touched: BTreeSet<String>,
}

pub struct LoadPipeline<'a> {
    executor: &'a dyn QueryExecutor,
    adapter: &'a dyn DialectAdapter,
    chunk_size: usize,
}

impl<'a> LoadPipeline<'a> {
    pub fn new(executor: &'a dyn QueryExecutor, adapter: &'a dyn DialectAdapter) -> Self {
        Self {
            executor,
            adapter,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Flattens `entities` depth-first, then inserts every row inside one
    /// transaction with FK enforcement disabled for its duration. Insertion
    /// order within the plan does not matter (spec §4.7): FK checks are off
    /// and every insert is duplicate-tolerant.
    pub async fn load(&self, entities: &[DetachedEntity]) -> Result<LoadReport, LoadError> {
        let rows = flatten(entities);
        let tables: BTreeSet<String> = rows.iter().map(|(table, _)| table.clone()).collect();

        let txn = self.executor.begin_transaction().await?;
        self.disable_fk(txn.as_ref(), &tables).await?;

        let mut loaded = 0u64;
        for chunk in rows.chunks(self.chunk_size) {
            match self.insert_chunk(txn.as_ref(), chunk).await {
                Ok(()) => loaded += chunk.len() as u64,
                Err(source) => {
                    warn!(rows_flushed = loaded, "load chunk failed, rolling back transaction");
                    let _ = self.enable_fk(txn.as_ref(), &tables).await;
                    txn.rollback().await?;
                    return Err(LoadError::FlushFailed {
                        rows_flushed: loaded,
                        source,
                    });
                }
            }
        }

        self.enable_fk(txn.as_ref(), &tables).await?;
        txn.commit().await?;
        info!(rows_loaded = loaded, tables = tables.len(), "load committed");

        Ok(LoadReport {
            rows_loaded: loaded,
            tables_touched: tables,
        })
    }

    async fn disable_fk(&self, txn: &dyn Transaction, tables: &BTreeSet<String>) -> Result<(), LoadError> {
        self.for_each_fk_statement(tables, |t| self.adapter.fk_disable_statements(t), txn)
            .await
    }

    async fn enable_fk(&self, txn: &dyn Transaction, tables: &BTreeSet<String>) -> Result<(), LoadError> {
        self.for_each_fk_statement(tables, |t| self.adapter.fk_enable_statements(t), txn)
            .await
    }

    async fn for_each_fk_statement(
        &self,
        tables: &BTreeSet<String>,
        statements_for: impl Fn(Option<&str>) -> Vec<String>,
        txn: &dyn Transaction,
    ) -> Result<(), LoadError> {
        if self.adapter.fk_guard_is_per_table() {
            for table in tables {
                for statement in statements_for(Some(table)) {
                    txn.execute(&statement, &[]).await?;
                }
            }
        } else {
            for statement in statements_for(None) {
                txn.execute(&statement, &[]).await?;
            }
        }
        Ok(())
    }

    async fn insert_chunk(&self, txn: &dyn Transaction, chunk: &[(String, dbcut_core::Row)]) -> Result<(), dbcut_core::CoreError> {
        for (table, row) in chunk {
            let columns: Vec<String> = row.columns().iter().map(|c| self.adapter.quote_identifier(c)).collect();
            let placeholders: Vec<String> = vec!["?".to_string(); columns.len()];
            let sql = self.adapter.render_insert_ignore(&self.adapter.quote_identifier(table), &columns, &placeholders);
            let values: Vec<Value> = row.values().to_vec();
            txn.execute(&sql, &values).await?;
        }
        Ok(())
    }
}

/// Depth-first `(table, row)` flattening of a detached entity forest,
/// exposed for sinks that bypass the transactional load path entirely
/// (`--export-json`, `--dump-sql`).
pub fn flatten(entities: &[DetachedEntity]) -> Vec<(String, dbcut_core::Row)> {
    let mut rows = Vec::new();
    for entity in entities {
        flatten_into(entity, &mut rows);
    }
    rows
}

fn flatten_into(entity: &DetachedEntity, rows: &mut Vec<(String, dbcut_core::Row)>) {
    rows.push((entity.table.clone(), entity.row.clone()));
    for children in entity.children.values() {
        for child in children {
            flatten_into(child, rows);
        }
    }
}
