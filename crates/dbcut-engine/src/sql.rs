use std::collections::HashMap;

use dbcut_compiler::{CompiledPredicate, EagerLoadPath, FetchPlan, LoadStrategy};
use dbcut_core::Value;
use dbcut_dialect::DialectAdapter;
use dbcut_graph::RelationGraph;
use dbcut_manifest::{OrderDirection, Op};
use dbcut_schema::Schema;
use serde_json::Value as JsonValue;

use crate::error::ExtractError;

/// One table instance in a joined query: the root, or a `ManyToOne` hop
/// folded into it. `prefix` is the dotted eager-load path up to and
/// including this node (empty for the root).
#[derive(Debug, Clone)]
pub struct AliasNode {
    pub prefix: String,
    pub alias: String,
    pub table: String,
}

pub struct RootQuery {
    pub sql: String,
    pub params: Vec<Value>,
    pub nodes: Vec<AliasNode>,
    /// For each node's prefix, the `(column name, output alias)` pairs
    /// selected for it, used to slice a combined row back into one table's
    /// columns.
    pub node_columns: HashMap<String, Vec<(String, String)>>,
}

fn output_alias(prefix: &str, column: &str) -> String {
    if prefix.is_empty() {
        column.to_string()
    } else {
        format!("{}__{}", prefix.replace('.', "__"), column)
    }
}

/// Builds the alias graph for every `Joined`-strategy eager-load path,
/// reusing shared prefixes (`a` and `a.b` share one join for `a`).
fn build_alias_nodes(
    schema: &Schema,
    graph: &RelationGraph,
    adapter: &dyn DialectAdapter,
    root_table: &str,
    joined_paths: &[&EagerLoadPath],
) -> Result<(Vec<AliasNode>, String), ExtractError> {
    let mut nodes = vec![AliasNode {
        prefix: String::new(),
        alias: "t0".to_string(),
        table: root_table.to_string(),
    }];
    let mut joins_sql = String::new();

    for path in joined_paths {
        let mut prefix = String::new();
        let mut current_table = root_table.to_string();
        for step in &path.steps {
            let next_prefix = if prefix.is_empty() {
                step.relationship_name.clone()
            } else {
                format!("{prefix}.{}", step.relationship_name)
            };
            if nodes.iter().any(|n| n.prefix == next_prefix) {
                prefix = next_prefix;
                current_table = step.remote_table.clone();
                continue;
            }

            let rel = graph
                .out_edges(&current_table)
                .into_iter()
                .find(|r| r.name == step.relationship_name)
                .ok_or_else(|| ExtractError::UnknownRelationship {
                    table: current_table.clone(),
                    relationship: step.relationship_name.clone(),
                })?;

            let parent_alias = nodes
                .iter()
                .find(|n| n.prefix == prefix)
                .map(|n| n.alias.clone())
                .expect("parent prefix was registered before its children");
            let alias = format!("t{}", nodes.len());

            if schema.table(&step.remote_table).is_none() {
                return Err(ExtractError::UnknownTable(step.remote_table.clone()));
            }

            let conditions: Vec<String> = rel
                .local_columns
                .iter()
                .zip(rel.remote_columns.iter())
                .map(|(local, remote)| {
                    format!(
                        "{parent_alias}.{} = {alias}.{}",
                        adapter.quote_identifier(local),
                        adapter.quote_identifier(remote),
                    )
                })
                .collect();

            joins_sql.push_str(&format!(
                " LEFT JOIN {} AS {alias} ON {}",
                adapter.quote_identifier(&step.remote_table),
                conditions.join(" AND "),
            ));

            nodes.push(AliasNode {
                prefix: next_prefix.clone(),
                alias,
                table: step.remote_table.clone(),
            });
            prefix = next_prefix;
            current_table = step.remote_table.clone();
        }
    }

    Ok((nodes, joins_sql))
}

pub fn json_to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else {
                Value::Float64(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => Value::Text(s.clone()),
        other => Value::Json(other.clone()),
    }
}

fn sql_operator(op: Op) -> &'static str {
    match op {
        Op::Eq => "=",
        Op::Ne => "<>",
        Op::Lt => "<",
        Op::Lte => "<=",
        Op::Gt => ">",
        Op::Gte => ">=",
        Op::Like => "LIKE",
        Op::Nlike => "NOT LIKE",
        Op::In | Op::Nin => unreachable!("IN/NIN rendered separately, they take a value list"),
    }
}

/// Renders a compiled predicate to parameterized SQL text (`?` positional
/// placeholders) plus its bound values, in the order they appear.
pub fn render_predicate(
    pred: &CompiledPredicate,
    alias_of_table: &HashMap<String, String>,
    root_alias: &str,
    adapter: &dyn DialectAdapter,
) -> (String, Vec<Value>) {
    match pred {
        CompiledPredicate::And(children) => join_children(children, "AND", alias_of_table, root_alias, adapter),
        CompiledPredicate::Or(children) => join_children(children, "OR", alias_of_table, root_alias, adapter),
        CompiledPredicate::Not(inner) => {
            let (sql, params) = render_predicate(inner, alias_of_table, root_alias, adapter);
            (format!("NOT ({sql})"), params)
        }
        CompiledPredicate::Compare { field, op, value } => {
            let alias = field
                .table
                .as_ref()
                .and_then(|t| alias_of_table.get(t))
                .map(|s| s.as_str())
                .unwrap_or(root_alias);
            let column = format!("{alias}.{}", adapter.quote_identifier(&field.column));
            match op {
                Op::In | Op::Nin => {
                    let items = value.as_array().cloned().unwrap_or_default();
                    let placeholders = vec!["?"; items.len()].join(", ");
                    let keyword = if matches!(op, Op::In) { "IN" } else { "NOT IN" };
                    let sql = format!("{column} {keyword} ({placeholders})");
                    (sql, items.iter().map(json_to_value).collect())
                }
                _ => {
                    let sql = format!("{column} {} ?", sql_operator(*op));
                    (sql, vec![json_to_value(value)])
                }
            }
        }
    }
}

fn join_children(
    children: &[CompiledPredicate],
    joiner: &str,
    alias_of_table: &HashMap<String, String>,
    root_alias: &str,
    adapter: &dyn DialectAdapter,
) -> (String, Vec<Value>) {
    let mut clauses = Vec::with_capacity(children.len());
    let mut params = Vec::new();
    for child in children {
        let (sql, child_params) = render_predicate(child, alias_of_table, root_alias, adapter);
        let needs_parens = matches!(child, CompiledPredicate::And(_) | CompiledPredicate::Or(_));
        clauses.push(if needs_parens { format!("({sql})") } else { sql });
        params.extend(child_params);
    }
    (clauses.join(&format!(" {joiner} ")), params)
}

/// Builds the root SELECT: every `Joined`-strategy eager-load path is
/// folded in as a `LEFT JOIN`, aliasing each table's columns so the result
/// can be sliced back apart per table.
pub fn build_root_query(
    schema: &Schema,
    graph: &RelationGraph,
    adapter: &dyn DialectAdapter,
    plan: &FetchPlan,
) -> Result<RootQuery, ExtractError> {
    if schema.table(&plan.root_table).is_none() {
        return Err(ExtractError::UnknownTable(plan.root_table.clone()));
    }

    let joined_paths: Vec<&EagerLoadPath> = plan
        .eager_load
        .iter()
        .filter(|p| p.strategy == LoadStrategy::Joined)
        .collect();

    let (nodes, joins_sql) = build_alias_nodes(schema, graph, adapter, &plan.root_table, &joined_paths)?;

    let mut select_exprs = Vec::new();
    let mut node_columns: HashMap<String, Vec<(String, String)>> = HashMap::new();
    for node in &nodes {
        let table = schema
            .table(&node.table)
            .ok_or_else(|| ExtractError::UnknownTable(node.table.clone()))?;
        let mut cols = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let out = output_alias(&node.prefix, &column.name);
            select_exprs.push(format!(
                "{}.{} AS {}",
                node.alias,
                adapter.quote_identifier(&column.name),
                adapter.quote_identifier(&out),
            ));
            cols.push((column.name.clone(), out));
        }
        node_columns.insert(node.prefix.clone(), cols);
    }

    let alias_of_table: HashMap<String, String> = nodes
        .iter()
        .map(|n| (n.table.clone(), n.alias.clone()))
        .collect();

    let mut sql = format!(
        "SELECT {} FROM {} AS t0{}",
        select_exprs.join(", "),
        adapter.quote_identifier(&plan.root_table),
        joins_sql,
    );

    let mut params = Vec::new();
    if let Some(filter) = &plan.filter {
        let (where_sql, where_params) = render_predicate(filter, &alias_of_table, "t0", adapter);
        if !where_sql.is_empty() {
            sql.push_str(&format!(" WHERE {where_sql}"));
            params = where_params;
        }
    }

    if !plan.order_by.is_empty() {
        let order_sql: Vec<String> = plan
            .order_by
            .iter()
            .map(|field| {
                let dir = match field.direction {
                    OrderDirection::Asc => "ASC",
                    OrderDirection::Desc => "DESC",
                };
                format!("t0.{} {dir}", adapter.quote_identifier(&field.field))
            })
            .collect();
        sql.push_str(&format!(" ORDER BY {}", order_sql.join(", ")));
    }

    if let Some(limit) = plan.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = plan.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok(RootQuery {
        sql,
        params,
        nodes,
        node_columns,
    })
}
