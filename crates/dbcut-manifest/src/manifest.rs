use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderField {
    pub field: String,
    pub direction: OrderDirection,
}

/// One root query. Depth/limit fields are `None` when the manifest author
/// left them unspecified, in which case `Manifest::resolved_queries` fills
/// them from the manifest-level defaults; `join_depth`/`backref_depth`
/// remain `None` after that to mean "unbounded" — only an explicit `0`
/// means "none".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub from: String,
    #[serde(rename = "where", default)]
    pub filter: Option<Predicate>,
    #[serde(default)]
    pub order_by: Vec<OrderField>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub join_depth: Option<u64>,
    #[serde(default)]
    pub backref_depth: Option<u64>,
    #[serde(default)]
    pub backref_limit: Option<u64>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestDefaults {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub backref_limit: Option<u64>,
    #[serde(default)]
    pub backref_depth: Option<u64>,
    #[serde(default)]
    pub join_depth: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseUrls {
    pub source_uri: String,
    pub destination_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub databases: DatabaseUrls,
    pub cache: String,
    #[serde(default, rename = "default_limit")]
    pub default_limit: Option<u64>,
    #[serde(default, rename = "default_backref_limit")]
    pub default_backref_limit: Option<u64>,
    #[serde(default, rename = "default_backref_depth")]
    pub default_backref_depth: Option<u64>,
    #[serde(default, rename = "default_join_depth")]
    pub default_join_depth: Option<u64>,
    #[serde(default)]
    pub global_exclude: Vec<String>,
    pub queries: Vec<ManifestEntry>,
}

impl Manifest {
    fn defaults(&self) -> ManifestDefaults {
        ManifestDefaults {
            limit: self.default_limit,
            backref_limit: self.default_backref_limit,
            backref_depth: self.default_backref_depth,
            join_depth: self.default_join_depth,
        }
    }

    /// Every query entry with manifest-level defaults filled in and
    /// `global_exclude` merged into each entry's own `exclude` list. This
    /// is what the compiler consumes — it never reads `Manifest` fields
    /// directly.
    pub fn resolved_queries(&self) -> Vec<ManifestEntry> {
        let defaults = self.defaults();
        self.queries
            .iter()
            .cloned()
            .map(|mut entry| {
                entry.limit = entry.limit.or(defaults.limit);
                entry.backref_limit = entry.backref_limit.or(defaults.backref_limit);
                entry.backref_depth = entry.backref_depth.or(defaults.backref_depth);
                entry.join_depth = entry.join_depth.or(defaults.join_depth);
                for excluded in &self.global_exclude {
                    if !entry.exclude.contains(excluded) {
                        entry.exclude.push(excluded.clone());
                    }
                }
                entry
            })
            .collect()
    }
}
