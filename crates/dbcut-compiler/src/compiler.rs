use std::collections::HashSet;

use dbcut_graph::RelationGraph;
use dbcut_manifest::{ManifestEntry, OrderDirection, OrderField};
use dbcut_schema::Schema;
use tracing::debug;

use crate::cache_key;
use crate::error::CompileError;
use crate::plan::{EagerLoadPath, FetchPlan, LoadStrategy, RelationTree};
use crate::predicate_compile::compile_predicate;
use crate::traversal::traverse;

pub struct QueryCompiler;

impl QueryCompiler {
    /// Compiles one manifest entry against the reflected `schema` into a
    /// `FetchPlan`. `engine_url` feeds only the cache key, never the query
    /// itself.
    pub fn compile(
        schema: &Schema,
        graph: &RelationGraph,
        engine_url: &str,
        entry: &ManifestEntry,
    ) -> Result<FetchPlan, CompileError> {
        let root = schema
            .table(&entry.from)
            .ok_or_else(|| CompileError::InvalidTable(entry.from.clone()))?;

        let bounded = traverse(graph, &entry.from, entry.join_depth, entry.backref_depth, &entry.exclude);
        let mut eager_load: Vec<EagerLoadPath> = bounded;

        if !entry.include.is_empty() {
            let unbounded = traverse(graph, &entry.from, None, None, &entry.exclude);
            for target in &entry.include {
                let Some(full_path) = unbounded
                    .iter()
                    .filter(|p| p.target_table() == Some(target.as_str()))
                    .min_by_key(|p| p.steps.len())
                else {
                    debug!(target, "include target is not reachable, ignoring");
                    continue;
                };
                for prefix_len in 1..=full_path.steps.len() {
                    let prefix_steps = full_path.steps[..prefix_len].to_vec();
                    let prefix_string = prefix_steps
                        .iter()
                        .map(|s| s.relationship_name.as_str())
                        .collect::<Vec<_>>()
                        .join(".");
                    if eager_load.iter().any(|p| p.path_string() == prefix_string) {
                        continue;
                    }
                    let last_is_collection = prefix_steps
                        .last()
                        .map(|s| s.direction != dbcut_schema::RelationshipDirection::ManyToOne)
                        .unwrap_or(false);
                    let strategy = if last_is_collection {
                        LoadStrategy::OuterJoinGrouped
                    } else {
                        LoadStrategy::Joined
                    };
                    eager_load.push(EagerLoadPath {
                        steps: prefix_steps,
                        strategy,
                    });
                }
            }
        }
        eager_load.sort_by(|a, b| a.path_string().cmp(&b.path_string()));

        let reachable: HashSet<String> = eager_load
            .iter()
            .flat_map(|p| p.steps.iter().map(|s| s.remote_table.clone()))
            .collect();

        let filter = entry
            .filter
            .as_ref()
            .map(|pred| compile_predicate(pred, &entry.from, &reachable))
            .transpose()?;

        let order_by = if entry.order_by.is_empty() {
            root.primary_key
                .iter()
                .map(|column| OrderField {
                    field: column.clone(),
                    direction: OrderDirection::Desc,
                })
                .collect()
        } else {
            entry.order_by.clone()
        };

        let mut columns: Vec<String> = root.columns.iter().map(|c| c.name.clone()).collect();
        columns.sort();
        let cache_key = cache_key::compute(engine_url, &entry.from, &columns, entry);

        Ok(FetchPlan {
            root_table: entry.from.clone(),
            filter,
            order_by,
            offset: entry.offset,
            limit: entry.limit,
            relation_tree: RelationTree::new(eager_load.clone()),
            eager_load,
            cache_key,
            backref_limit: entry.backref_limit,
        })
    }
}
