/// Deterministic index name: `<table>_<col1>_<col2>..._{idx|unique_idx}`.
///
/// Grounded on the original implementation's `generate_valid_index_name`.
pub fn index_name(table: &str, columns: &[String], unique: bool) -> String {
    let cols = columns.join("_");
    let suffix = if unique { "unique_idx" } else { "idx" };
    format!("{table}_{cols}_{suffix}")
}

/// SQLite indexes live in a single database-wide namespace rather than
/// per-table. If a reflected index name doesn't already start with its
/// owning table's name, prefix it so it can't collide with a same-named
/// index on a different table.
pub fn sqlite_namespaced_index_name(table: &str, index_name: &str) -> String {
    let prefix = format!("{table}_");
    if index_name.starts_with(&prefix) {
        index_name.to_string()
    } else {
        format!("{prefix}{index_name}")
    }
}
