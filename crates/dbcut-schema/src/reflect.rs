use std::collections::BTreeSet;

use dbcut_core::{RawTable, SourceIntrospector};

use crate::error::SchemaError;
use crate::model::{Column, ForeignKey, Index, Relationship, RelationshipDirection, Schema, Table};

/// Builds the in-memory schema model from raw introspection data.
pub struct SchemaReflector;

impl SchemaReflector {
    /// Reflect every table the introspector reports, then derive
    /// relationships (including many-to-many via pure-association-table
    /// detection) from the foreign keys collected along the way.
    pub async fn reflect(introspector: &dyn SourceIntrospector) -> Result<Schema, SchemaError> {
        let table_names = introspector
            .list_tables()
            .await
            .map_err(|e| SchemaError::Introspection(e.to_string()))?;

        let mut schema = Schema::new();
        let mut raw_tables = Vec::with_capacity(table_names.len());
        for name in &table_names {
            let raw = introspector
                .table(name)
                .await
                .map_err(|e| SchemaError::Introspection(e.to_string()))?;
            raw_tables.push(raw);
        }

        for raw in &raw_tables {
            schema.insert_table(table_from_raw(raw));
        }

        let mut relationships = Vec::new();
        for raw in &raw_tables {
            for fk in &raw.foreign_keys {
                relationships.push(many_to_one(raw, fk));
                relationships.push(one_to_many(raw, fk));
            }
            if let Some((fk_a, fk_b)) = as_pure_association(raw) {
                relationships.push(many_to_many(raw, fk_a, fk_b));
                relationships.push(many_to_many(raw, fk_b, fk_a));
            }
        }
        schema.relationships = relationships;

        Ok(schema)
    }
}

fn table_from_raw(raw: &RawTable) -> Table {
    let columns = raw
        .columns
        .iter()
        .map(|c| Column {
            name: c.name.clone(),
            ordinal: c.ordinal,
            data_type: c.data_type.clone(),
            nullable: c.nullable,
            default_value: c.default_value.clone(),
            max_length: c.max_length,
            precision: c.precision,
            scale: c.scale,
            is_auto_increment: c.is_auto_increment,
        })
        .collect();

    let indexes = raw
        .indexes
        .iter()
        .filter(|i| !i.is_primary)
        .map(|i| Index {
            name: i.name.clone(),
            columns: i.columns.clone(),
            unique: i.is_unique,
        })
        .collect();

    let foreign_keys = raw
        .foreign_keys
        .iter()
        .map(|fk| ForeignKey {
            name: fk.constraint_name.clone(),
            columns: fk.columns.clone(),
            referenced_table: fk.referenced_table.clone(),
            referenced_columns: fk.referenced_columns.clone(),
        })
        .collect();

    Table {
        name: raw.name.clone(),
        columns,
        primary_key: raw.primary_key.clone(),
        unique_constraints: Vec::new(),
        indexes,
        foreign_keys,
    }
}

fn many_to_one(raw: &RawTable, fk: &dbcut_core::RawForeignKey) -> Relationship {
    Relationship {
        name: fk.referenced_table.clone(),
        direction: RelationshipDirection::ManyToOne,
        local_table: raw.name.clone(),
        local_columns: fk.columns.clone(),
        remote_table: fk.referenced_table.clone(),
        remote_columns: fk.referenced_columns.clone(),
        back_populates: Some(raw.name.clone()),
        association_table: None,
    }
}

fn one_to_many(raw: &RawTable, fk: &dbcut_core::RawForeignKey) -> Relationship {
    Relationship {
        name: raw.name.clone(),
        direction: RelationshipDirection::OneToMany,
        local_table: fk.referenced_table.clone(),
        local_columns: fk.referenced_columns.clone(),
        remote_table: raw.name.clone(),
        remote_columns: fk.columns.clone(),
        back_populates: Some(fk.referenced_table.clone()),
        association_table: None,
    }
}

fn many_to_many(
    raw: &RawTable,
    from: &dbcut_core::RawForeignKey,
    to: &dbcut_core::RawForeignKey,
) -> Relationship {
    Relationship {
        name: to.referenced_table.clone(),
        direction: RelationshipDirection::ManyToMany,
        local_table: from.referenced_table.clone(),
        local_columns: from.referenced_columns.clone(),
        remote_table: to.referenced_table.clone(),
        remote_columns: to.referenced_columns.clone(),
        back_populates: Some(from.referenced_table.clone()),
        association_table: Some(raw.name.clone()),
    }
}

/// A table is a pure many-to-many association iff it has exactly two
/// foreign keys, every column belongs to one of those two keys, and its
/// primary key is precisely the union of the two keys' local columns.
fn as_pure_association<'a>(
    raw: &'a RawTable,
) -> Option<(&'a dbcut_core::RawForeignKey, &'a dbcut_core::RawForeignKey)> {
    if raw.foreign_keys.len() != 2 {
        return None;
    }
    let fk_a = &raw.foreign_keys[0];
    let fk_b = &raw.foreign_keys[1];

    let fk_columns: BTreeSet<&str> = fk_a
        .columns
        .iter()
        .chain(fk_b.columns.iter())
        .map(|s| s.as_str())
        .collect();
    let all_columns: BTreeSet<&str> = raw.columns.iter().map(|c| c.name.as_str()).collect();
    if fk_columns != all_columns {
        return None;
    }

    let pk: BTreeSet<&str> = raw.primary_key.iter().map(|s| s.as_str()).collect();
    if pk != fk_columns {
        return None;
    }

    Some((fk_a, fk_b))
}
