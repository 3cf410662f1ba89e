use dbcut_manifest::ManifestEntry;
use serde_json::json;
use sha1::{Digest, Sha1};

/// A stable SHA-1 digest over the inputs that fully determine a plan's
/// result set. `serde_json::Map` sorts object keys by default (no
/// `preserve_order` feature here), so this is already canonical as long as
/// every sequence that isn't semantically ordered (`exclude`, `include`) is
/// sorted before serialization; `order_by` keeps its given order since it's
/// significant.
pub fn compute(engine_url: &str, root_table: &str, columns: &[String], entry: &ManifestEntry) -> String {
    let mut sorted_columns = columns.to_vec();
    sorted_columns.sort();

    let mut sorted_exclude = entry.exclude.clone();
    sorted_exclude.sort();

    let mut sorted_include = entry.include.clone();
    sorted_include.sort();

    let normalized_entry = json!({
        "from": entry.from,
        "where": entry.filter,
        "order_by": entry.order_by,
        "offset": entry.offset,
        "limit": entry.limit,
        "join_depth": entry.join_depth,
        "backref_depth": entry.backref_depth,
        "backref_limit": entry.backref_limit,
        "exclude": sorted_exclude,
        "include": sorted_include,
    });

    let canonical = json!({
        "engine_url": engine_url,
        "root_table": root_table,
        "columns": sorted_columns,
        "manifest_entry": normalized_entry,
    });

    let serialized = serde_json::to_string(&canonical).expect("canonical cache key value is always valid json");
    let mut hasher = Sha1::new();
    hasher.update(serialized.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
