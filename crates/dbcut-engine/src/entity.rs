use std::collections::BTreeMap;

use dbcut_core::Row;
use serde::{Deserialize, Serialize};

/// A row materialized into memory with no live connection back to its
/// originating session or transaction. Nested eager-loaded relations hang
/// off `children`, keyed by relationship attribute name; a `ManyToOne`
/// relation ends up with at most one entry in its vector.
///
/// Round-trips through the cache store's `.cache` JSON, so the relation
/// graph travels with the rows rather than needing re-derivation from the
/// schema on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedEntity {
    pub table: String,
    pub row: Row,
    pub children: BTreeMap<String, Vec<DetachedEntity>>,
}

impl DetachedEntity {
    pub fn new(table: impl Into<String>, row: Row) -> Self {
        Self {
            table: table.into(),
            row,
            children: BTreeMap::new(),
        }
    }

    pub fn attach(&mut self, relationship: impl Into<String>, child: DetachedEntity) {
        self.children.entry(relationship.into()).or_default().push(child);
    }

    pub fn children_of(&self, relationship: &str) -> &[DetachedEntity] {
        self.children.get(relationship).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
