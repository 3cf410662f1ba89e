use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A column as reflected from the source, before any destination-dialect
/// rewrite. `data_type` is the source dialect's own type text (e.g.
/// `"LONGTEXT"`); `DialectAdapter::normalize_type` turns it into
/// destination DDL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ordinal: usize,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<i64>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub is_auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub unique_constraints: Vec<Vec<String>>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipDirection {
    ManyToOne,
    OneToMany,
    ManyToMany,
}

/// A directed edge between two tables.
///
/// Invariant: every `ManyToOne` relationship has a mirror `OneToMany` on
/// the remote table (`back_populates` names it). Every `ManyToMany`
/// relationship references exactly one association table, named in
/// `association_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Attribute name this edge is addressed by from `local_table`.
    pub name: String,
    pub direction: RelationshipDirection,
    pub local_table: String,
    pub local_columns: Vec<String>,
    pub remote_table: String,
    pub remote_columns: Vec<String>,
    pub back_populates: Option<String>,
    pub association_table: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    tables: BTreeMap<String, Table>,
    pub relationships: Vec<Relationship>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    pub fn relationships_from(&self, table: &str) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.local_table == table)
    }
}
