use dbcut_core::Dialect;

use crate::error::DialectError;
use crate::naming::index_name;

/// Everything the Schema Reflector and Load Pipeline need from a specific
/// SQL dialect, expressed purely as text rendering — no network I/O lives
/// behind this trait, only string/DDL logic.
pub trait DialectAdapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Rewrite a source column type into the text this dialect should use
    /// in DDL. Fails only for a type the dialect genuinely cannot express.
    fn normalize_type(&self, source_type: &str) -> Result<String, DialectError>;

    /// Rewrite a column default expression (e.g. `current_timestamp` to the
    /// dialect's literal spelling of `CURRENT_TIMESTAMP`).
    fn normalize_default(&self, default_expr: &str) -> String {
        if default_expr.trim().eq_ignore_ascii_case("current_timestamp") {
            "CURRENT_TIMESTAMP".to_string()
        } else {
            default_expr.to_string()
        }
    }

    /// Render a duplicate-tolerant INSERT statement for `table` over
    /// `columns`, parameter-placeholder text left to the caller to fill in.
    fn render_insert_ignore(&self, table: &str, columns: &[String], placeholders: &[String]) -> String;

    /// Statements to run before a bulk load to disable FK enforcement.
    /// `table` is `Some` for dialects (PostgreSQL) that only support
    /// disabling triggers per table rather than database-wide.
    fn fk_disable_statements(&self, table: Option<&str>) -> Vec<String>;

    /// Statements to run after a bulk load to restore FK enforcement.
    fn fk_enable_statements(&self, table: Option<&str>) -> Vec<String>;

    /// Whether this dialect's FK guard must be scoped per table rather than
    /// issued once for the whole connection/database.
    fn fk_guard_is_per_table(&self) -> bool {
        false
    }

    /// Metadata-derived row count estimate query text for `table`.
    fn estimated_row_count_query(&self, table: &str, database: &str) -> String;

    fn index_name(&self, table: &str, columns: &[String], unique: bool) -> String {
        index_name(table, columns, unique)
    }

    /// MySQL requires a prefix length for indexes over TEXT/BLOB columns.
    fn text_index_prefix_length(&self) -> Option<u32> {
        None
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn database_exists_statement(&self, database: &str) -> String;

    fn create_database_statement(&self, database: &str) -> String;

    fn drop_database_statement(&self, database: &str) -> String;
}
