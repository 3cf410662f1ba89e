//! dbcut-graph - a deterministic, name-addressed view over a reflected
//! schema's relationships, used for traversal by the query compiler.

use std::collections::{HashSet, VecDeque};

use dbcut_schema::{Relationship, RelationshipDirection, Schema};

/// A read-only view over a `Schema`'s relationships. Ordering here is load
/// bearing: the cache key derived downstream depends on traversal visiting
/// edges in a stable order across runs.
pub struct RelationGraph<'a> {
    schema: &'a Schema,
}

impl<'a> RelationGraph<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Outbound edges of `table`, `ManyToOne` first, then ordered by
    /// attribute name. Stable across calls and across runs.
    pub fn out_edges(&self, table: &str) -> Vec<&'a Relationship> {
        let mut edges: Vec<&Relationship> = self
            .schema
            .relationships_from(table)
            .collect();
        edges.sort_by(|a, b| {
            let rank = |r: &Relationship| match r.direction {
                RelationshipDirection::ManyToOne => 0,
                RelationshipDirection::OneToMany | RelationshipDirection::ManyToMany => 1,
            };
            rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
        });
        edges
    }

    /// Shortest relationship path from `from` to `to`, if any, via
    /// breadth-first search over edges (not nodes) so the result is
    /// deterministic even in a cyclic graph.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<&'a Relationship>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(from.to_string());
        let mut queue: VecDeque<(String, Vec<&'a Relationship>)> = VecDeque::new();
        queue.push_back((from.to_string(), Vec::new()));

        while let Some((current, path)) = queue.pop_front() {
            for edge in self.out_edges(&current) {
                if visited.contains(&edge.remote_table) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(edge);
                if edge.remote_table == to {
                    return Some(next_path);
                }
                visited.insert(edge.remote_table.clone());
                queue.push_back((edge.remote_table.clone(), next_path));
            }
        }
        None
    }

    /// True iff `table` was recognized during reflection as a pure
    /// many-to-many association table.
    pub fn is_association(&self, table: &str) -> bool {
        self.schema
            .relationships
            .iter()
            .any(|r| r.association_table.as_deref() == Some(table))
    }
}

#[cfg(test)]
mod tests;
