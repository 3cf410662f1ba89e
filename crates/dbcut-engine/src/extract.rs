use dbcut_compiler::{EagerLoadPath, FetchPlan, LoadStrategy};
use dbcut_core::{QueryExecutor, Row, Value};
use dbcut_dialect::DialectAdapter;
use dbcut_graph::RelationGraph;
use dbcut_schema::{RelationshipDirection, Schema};

use crate::entity::DetachedEntity;
use crate::error::ExtractError;
use crate::sql;

pub struct ExtractionResult {
    pub entities: Vec<DetachedEntity>,
    /// Bounded by the plan's limit, per §4.5 — not a total-matching-rows
    /// count.
    pub count: u64,
}

pub struct ExtractionEngine;

impl ExtractionEngine {
    /// Runs `plan` against `executor` and returns the detached entity tree
    /// plus count. Rows arrive in plan order; restarting this stream means
    /// going through the cache store, not calling `extract` again.
    pub async fn extract(
        executor: &dyn QueryExecutor,
        schema: &Schema,
        graph: &RelationGraph<'_>,
        adapter: &dyn DialectAdapter,
        plan: &FetchPlan,
    ) -> Result<ExtractionResult, ExtractError> {
        let built = sql::build_root_query(schema, graph, adapter, plan)?;
        let rows = executor.query(&built.sql, &built.params).await?;

        let mut entities = assemble_root_entities(&built.nodes, &built.node_columns, &rows);
        let count = entities.len() as u64;

        let mut collection_paths: Vec<&EagerLoadPath> = plan
            .eager_load
            .iter()
            .filter(|p| p.strategy != LoadStrategy::Joined)
            .collect();
        collection_paths.sort_by_key(|p| p.steps.len());

        for path in collection_paths {
            fetch_selectin_level(executor, schema, graph, adapter, plan, path, &mut entities).await?;
        }

        Ok(ExtractionResult { entities, count })
    }
}

fn slice_row(row: &Row, columns: &[(String, String)]) -> Row {
    let mut names = Vec::with_capacity(columns.len());
    let mut values = Vec::with_capacity(columns.len());
    for (name, output_alias) in columns {
        names.push(name.clone());
        values.push(row.get_by_name(output_alias).cloned().unwrap_or(Value::Null));
    }
    Row::new(names, values)
}

fn assemble_root_entities(
    nodes: &[sql::AliasNode],
    node_columns: &std::collections::HashMap<String, Vec<(String, String)>>,
    rows: &[Row],
) -> Vec<DetachedEntity> {
    let root_node = &nodes[0];
    let root_cols = &node_columns[&root_node.prefix];

    let mut joined_nodes: Vec<&sql::AliasNode> = nodes[1..].iter().collect();
    joined_nodes.sort_by_key(|n| n.prefix.matches('.').count());

    rows.iter()
        .map(|row| {
            let mut root_entity = DetachedEntity::new(root_node.table.clone(), slice_row(row, root_cols));
            for node in &joined_nodes {
                let cols = &node_columns[&node.prefix];
                let node_row = slice_row(row, cols);
                if node_row.values().iter().all(|v| v.is_null()) {
                    continue;
                }
                let (parent_prefix, own_name) = match node.prefix.rsplit_once('.') {
                    Some((p, n)) => (p.to_string(), n.to_string()),
                    None => (String::new(), node.prefix.clone()),
                };
                if let Some(parent) = navigate_mut(&mut root_entity, &parent_prefix) {
                    parent.attach(own_name, DetachedEntity::new(node.table.clone(), node_row));
                }
            }
            root_entity
        })
        .collect()
}

fn navigate_mut<'a>(entity: &'a mut DetachedEntity, prefix: &str) -> Option<&'a mut DetachedEntity> {
    if prefix.is_empty() {
        return Some(entity);
    }
    let mut current = entity;
    for segment in prefix.split('.') {
        current = current.children.get_mut(segment)?.last_mut()?;
    }
    Some(current)
}

fn collect_nodes_mut<'a>(nodes: Vec<&'a mut DetachedEntity>, prefix: &str) -> Vec<&'a mut DetachedEntity> {
    if prefix.is_empty() {
        return nodes;
    }
    let (head, rest) = match prefix.split_once('.') {
        Some((h, r)) => (h, r),
        None => (prefix, ""),
    };
    let mut next = Vec::new();
    for node in nodes {
        if let Some(children) = node.children.get_mut(head) {
            next.extend(children.iter_mut());
        }
    }
    if rest.is_empty() {
        next
    } else {
        collect_nodes_mut(next, rest)
    }
}

fn primary_key_value(schema: &Schema, table: &str, row: &Row) -> Option<Vec<Value>> {
    let pk = &schema.table(table)?.primary_key;
    pk.iter().map(|col| row.get_by_name(col).cloned()).collect()
}

/// Fetches one eager-load level's rows via a follow-up `SELECT ... WHERE
/// <fk> IN (...)`, attaches them to every matching parent entity, and
/// truncates each parent's group to `backref_limit` after the fact (a
/// plain-SQL dialect layer here would need per-parent window functions to
/// do this inside the database; truncating client-side keeps the query
/// portable across all three dialects).
async fn fetch_selectin_level(
    executor: &dyn QueryExecutor,
    schema: &Schema,
    graph: &RelationGraph<'_>,
    adapter: &dyn DialectAdapter,
    plan: &FetchPlan,
    path: &EagerLoadPath,
    root_entities: &mut [DetachedEntity],
) -> Result<(), ExtractError> {
    let depth = path.steps.len();
    let parent_prefix = path.steps[..depth - 1]
        .iter()
        .map(|s| s.relationship_name.as_str())
        .collect::<Vec<_>>()
        .join(".");
    let parent_table = if depth == 1 {
        plan.root_table.clone()
    } else {
        path.steps[depth - 2].remote_table.clone()
    };
    let last_step = &path.steps[depth - 1];

    let rel = graph
        .out_edges(&parent_table)
        .into_iter()
        .find(|r| r.name == last_step.relationship_name)
        .ok_or_else(|| ExtractError::UnknownRelationship {
            table: parent_table.clone(),
            relationship: last_step.relationship_name.clone(),
        })?;

    let parent_nodes = collect_nodes_mut(root_entities.iter_mut().collect(), &parent_prefix);
    if parent_nodes.is_empty() {
        return Ok(());
    }

    let mut parent_keys: Vec<Vec<Value>> = Vec::with_capacity(parent_nodes.len());
    for node in &parent_nodes {
        if let Some(key) = primary_key_value(schema, &parent_table, &node.row) {
            parent_keys.push(key);
        }
    }
    if parent_keys.is_empty() {
        return Ok(());
    }

    let remote_table = rel.remote_table.clone();
    let (sql_text, params, fk_column) = match rel.direction {
        RelationshipDirection::ManyToMany => {
            let association = rel.association_table.clone().ok_or_else(|| {
                ExtractError::MalformedAssociation(remote_table.clone())
            })?;
            build_many_to_many_query(schema, adapter, &association, &parent_table, &remote_table, &parent_keys)?
        }
        _ => build_one_to_many_query(adapter, &remote_table, &rel.remote_columns, &parent_keys),
    };

    let rows = executor.query(&sql_text, &params).await?;

    let mut grouped: Vec<(Vec<Value>, Row)> = Vec::with_capacity(rows.len());
    for row in rows {
        let key: Vec<Value> = fk_column
            .iter()
            .map(|c| row.get_by_name(c).cloned().unwrap_or(Value::Null))
            .collect();
        grouped.push((key, row));
    }

    for node in parent_nodes {
        let key = match primary_key_value(schema, &parent_table, &node.row) {
            Some(k) => k,
            None => continue,
        };
        let mut count = 0u64;
        for (row_key, row) in &grouped {
            if row_key != &key {
                continue;
            }
            if let Some(limit) = plan.backref_limit {
                if count >= limit {
                    break;
                }
            }
            node.attach(last_step.relationship_name.clone(), DetachedEntity::new(remote_table.clone(), row.clone()));
            count += 1;
        }
    }

    Ok(())
}

fn build_one_to_many_query(
    adapter: &dyn DialectAdapter,
    remote_table: &str,
    fk_columns: &[String],
    parent_keys: &[Vec<Value>],
) -> (String, Vec<Value>, Vec<String>) {
    let placeholders = render_key_tuples(fk_columns.len(), parent_keys.len());
    let column_list = fk_columns
        .iter()
        .map(|c| adapter.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT * FROM {} WHERE ({}) IN ({})",
        adapter.quote_identifier(remote_table),
        column_list,
        placeholders,
    );
    let params = parent_keys.iter().flatten().cloned().collect();
    (sql, params, fk_columns.to_vec())
}

fn build_many_to_many_query(
    schema: &Schema,
    adapter: &dyn DialectAdapter,
    association: &str,
    local_table: &str,
    remote_table: &str,
    parent_keys: &[Vec<Value>],
) -> Result<(String, Vec<Value>, Vec<String>), ExtractError> {
    let assoc = schema
        .table(association)
        .ok_or_else(|| ExtractError::UnknownTable(association.to_string()))?;
    let near_fk = assoc
        .foreign_keys
        .iter()
        .find(|fk| fk.referenced_table == local_table)
        .ok_or_else(|| ExtractError::MalformedAssociation(association.to_string()))?;
    let far_fk = assoc
        .foreign_keys
        .iter()
        .find(|fk| fk.referenced_table == remote_table)
        .ok_or_else(|| ExtractError::MalformedAssociation(association.to_string()))?;

    let placeholders = render_key_tuples(near_fk.columns.len(), parent_keys.len());
    let near_columns = near_fk
        .columns
        .iter()
        .map(|c| format!("assoc.{}", adapter.quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(", ");

    let join_conditions: Vec<String> = far_fk
        .columns
        .iter()
        .zip(far_fk.referenced_columns.iter())
        .map(|(assoc_col, remote_col)| {
            format!(
                "assoc.{} = remote.{}",
                adapter.quote_identifier(assoc_col),
                adapter.quote_identifier(remote_col),
            )
        })
        .collect();

    let near_select = near_fk
        .columns
        .iter()
        .map(|c| format!("assoc.{} AS {}", adapter.quote_identifier(c), adapter.quote_identifier(&format!("__fk_{c}"))))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT remote.*, {near_select} FROM {} AS remote INNER JOIN {} AS assoc ON {} WHERE ({near_columns}) IN ({placeholders})",
        adapter.quote_identifier(remote_table),
        adapter.quote_identifier(association),
        join_conditions.join(" AND "),
    );

    let params = parent_keys.iter().flatten().cloned().collect();
    let fk_output_columns = near_fk.columns.iter().map(|c| format!("__fk_{c}")).collect();
    Ok((sql, params, fk_output_columns))
}

fn render_key_tuples(arity: usize, count: usize) -> String {
    let tuple = format!("({})", vec!["?"; arity].join(", "));
    vec![tuple; count].join(", ")
}
