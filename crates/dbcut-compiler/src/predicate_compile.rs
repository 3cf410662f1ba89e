use std::collections::HashSet;

use dbcut_manifest::{Op, Predicate};
use serde_json::Value as JsonValue;

use crate::error::CompileError;

/// A field reference split into an optional relation table qualifier and a
/// column name (`"author.country"` → `table: Some("author"), column:
/// "country"`; `"status"` → `table: None, column: "status"`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub table: Option<String>,
    pub column: String,
}

impl FieldRef {
    pub fn parse(field: &str) -> Self {
        match field.split_once('.') {
            Some((table, column)) => Self {
                table: Some(table.to_string()),
                column: column.to_string(),
            },
            None => Self {
                table: None,
                column: field.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledPredicate {
    And(Vec<CompiledPredicate>),
    Or(Vec<CompiledPredicate>),
    Not(Box<CompiledPredicate>),
    Compare {
        field: FieldRef,
        op: Op,
        value: JsonValue,
    },
}

/// Validates every qualified field reference against `reachable` (the set
/// of tables the plan's eager-load paths touch) and lowers the manifest's
/// `Predicate` tree into one keyed by parsed field references.
pub fn compile_predicate(
    pred: &Predicate,
    root_table: &str,
    reachable: &HashSet<String>,
) -> Result<CompiledPredicate, CompileError> {
    match pred {
        Predicate::And(children) => Ok(CompiledPredicate::And(
            children
                .iter()
                .map(|p| compile_predicate(p, root_table, reachable))
                .collect::<Result<_, _>>()?,
        )),
        Predicate::Or(children) => Ok(CompiledPredicate::Or(
            children
                .iter()
                .map(|p| compile_predicate(p, root_table, reachable))
                .collect::<Result<_, _>>()?,
        )),
        Predicate::Not(inner) => Ok(CompiledPredicate::Not(Box::new(compile_predicate(
            inner,
            root_table,
            reachable,
        )?))),
        Predicate::Compare { field, op, value } => {
            let field_ref = FieldRef::parse(field);
            if let Some(table) = &field_ref.table {
                if table != root_table && !reachable.contains(table) {
                    return Err(CompileError::InvalidField(field.clone()));
                }
            }
            Ok(CompiledPredicate::Compare {
                field: field_ref,
                op: *op,
                value: value.clone(),
            })
        }
    }
}
