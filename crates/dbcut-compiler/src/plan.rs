use dbcut_manifest::OrderField;
use dbcut_schema::RelationshipDirection;

use crate::predicate_compile::CompiledPredicate;

/// How an eager-load path's target is folded into the extraction query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Parent columns pulled in alongside the child in a single SELECT.
    Joined,
    /// One follow-up SELECT per level, `backref_limit` applied to it.
    Selectin,
    /// Reached only through an `include` override past the normal depth
    /// bound; needs an outer join plus a root-primary-key `GROUP BY` since
    /// the descendant changes root cardinality.
    OuterJoinGrouped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EagerLoadStep {
    pub relationship_name: String,
    pub direction: RelationshipDirection,
    pub remote_table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EagerLoadPath {
    pub steps: Vec<EagerLoadStep>,
    pub strategy: LoadStrategy,
}

impl EagerLoadPath {
    pub fn path_string(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.relationship_name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn target_table(&self) -> Option<&str> {
        self.steps.last().map(|s| s.remote_table.as_str())
    }
}

/// The set of eager-load paths a compiled plan reaches, kept around for
/// field-reachability validation and for diagnostics (`dbcut inspect`).
#[derive(Debug, Clone, Default)]
pub struct RelationTree {
    paths: Vec<EagerLoadPath>,
}

impl RelationTree {
    pub fn new(mut paths: Vec<EagerLoadPath>) -> Self {
        paths.sort_by(|a, b| a.path_string().cmp(&b.path_string()));
        Self { paths }
    }

    pub fn paths(&self) -> &[EagerLoadPath] {
        &self.paths
    }

    pub fn is_reachable(&self, table: &str) -> bool {
        self.paths.iter().any(|p| p.target_table() == Some(table))
    }
}

#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub root_table: String,
    pub filter: Option<CompiledPredicate>,
    pub order_by: Vec<OrderField>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub eager_load: Vec<EagerLoadPath>,
    pub relation_tree: RelationTree,
    pub cache_key: String,
    pub backref_limit: Option<u64>,
}
