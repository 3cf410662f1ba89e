use std::collections::{HashSet, VecDeque};

use dbcut_graph::RelationGraph;
use dbcut_schema::RelationshipDirection;

use crate::plan::{EagerLoadPath, EagerLoadStep, LoadStrategy};

struct Frame {
    table: String,
    steps: Vec<EagerLoadStep>,
    join_remaining: Option<u64>,
    backref_remaining: Option<u64>,
    /// Edges crossed so far on this specific path, so a longer cycle can
    /// still be walked (bounded by depth) while the edge just crossed is
    /// never immediately re-crossed in reverse.
    visited: HashSet<(String, String)>,
}

/// Breadth-first eager-load traversal from `root`, honoring `join_depth`
/// (decremented by `ManyToOne` hops) and `backref_depth` (decremented by
/// collection hops). Pass `None`/`None` to traverse unbounded, as the
/// `include` override does before pruning.
pub fn traverse(
    graph: &RelationGraph,
    root: &str,
    join_depth: Option<u64>,
    backref_depth: Option<u64>,
    exclude: &[String],
) -> Vec<EagerLoadPath> {
    let mut results = Vec::new();
    let mut queue: VecDeque<Frame> = VecDeque::new();
    queue.push_back(Frame {
        table: root.to_string(),
        steps: Vec::new(),
        join_remaining: join_depth,
        backref_remaining: backref_depth,
        visited: HashSet::new(),
    });

    while let Some(frame) = queue.pop_front() {
        for edge in graph.out_edges(&frame.table) {
            if exclude.iter().any(|e| e == &edge.remote_table) {
                continue;
            }
            let is_collection = edge.direction != RelationshipDirection::ManyToOne;
            if is_collection {
                if frame.backref_remaining == Some(0) {
                    continue;
                }
            } else if frame.join_remaining == Some(0) {
                continue;
            }

            let edge_key = (frame.table.clone(), edge.name.clone());
            if frame.visited.contains(&edge_key) {
                continue;
            }
            if let Some(back) = &edge.back_populates {
                if frame.visited.contains(&(edge.remote_table.clone(), back.clone())) {
                    continue;
                }
            }

            let mut steps = frame.steps.clone();
            steps.push(EagerLoadStep {
                relationship_name: edge.name.clone(),
                direction: edge.direction,
                remote_table: edge.remote_table.clone(),
            });
            let strategy = if is_collection {
                LoadStrategy::Selectin
            } else {
                LoadStrategy::Joined
            };
            results.push(EagerLoadPath {
                steps: steps.clone(),
                strategy,
            });

            let mut visited = frame.visited.clone();
            visited.insert(edge_key);

            let next_join = if is_collection {
                frame.join_remaining
            } else {
                frame.join_remaining.map(|d| d.saturating_sub(1))
            };
            let next_backref = if is_collection {
                frame.backref_remaining.map(|d| d.saturating_sub(1))
            } else {
                frame.backref_remaining
            };

            queue.push_back(Frame {
                table: edge.remote_table.clone(),
                steps,
                join_remaining: next_join,
                backref_remaining: next_backref,
                visited,
            });
        }
    }

    results.sort_by(|a, b| a.path_string().cmp(&b.path_string()));
    results
}
