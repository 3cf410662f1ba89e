use dbcut_core::Dialect;

use crate::adapter::DialectAdapter;
use crate::error::DialectError;

pub struct SqliteAdapter;

fn split_base(source_type: &str) -> (String, Option<String>) {
    match source_type.find('(') {
        Some(idx) => (
            source_type[..idx].trim().to_ascii_uppercase(),
            Some(source_type[idx..].to_string()),
        ),
        None => (source_type.trim().to_ascii_uppercase(), None),
    }
}

impl DialectAdapter for SqliteAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn normalize_type(&self, source_type: &str) -> Result<String, DialectError> {
        if source_type.trim().is_empty() {
            return Err(DialectError::UnmappedType {
                dialect: self.dialect().to_string(),
                source_type: source_type.to_string(),
            });
        }
        let (base, args) = split_base(source_type);
        let args = args.unwrap_or_default();
        let rendered = match base.as_str() {
            "TINYINT" | "SMALLINT" => "SMALLINT".to_string(),
            "LONGBLOB" | "MEDIUMBLOB" | "TINYBLOB" => "BLOB".to_string(),
            "LONGTEXT" | "MEDIUMTEXT" | "TINYTEXT" => "TEXT".to_string(),
            "TIMESTAMP WITHOUT TIME ZONE" | "TIMESTAMPTZ" => "DATETIME".to_string(),
            "TEXT" | "VARCHAR" | "CHAR" | "INT" | "INTEGER" | "BIGINT" | "MEDIUMINT"
            | "FLOAT" | "DOUBLE" | "DECIMAL" | "NUMERIC" | "DATE" | "TIME" | "DATETIME"
            | "BLOB" | "BOOLEAN" | "JSON" => format!("{base}{args}"),
            other => other.to_string() + &args,
        };
        Ok(rendered)
    }

    fn render_insert_ignore(&self, table: &str, columns: &[String], placeholders: &[String]) -> String {
        format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn fk_disable_statements(&self, _table: Option<&str>) -> Vec<String> {
        vec!["PRAGMA foreign_keys = OFF".to_string()]
    }

    fn fk_enable_statements(&self, _table: Option<&str>) -> Vec<String> {
        vec!["PRAGMA foreign_keys = ON".to_string()]
    }

    fn estimated_row_count_query(&self, table: &str, _database: &str) -> String {
        format!("SELECT COUNT(*) FROM {table}")
    }

    fn index_name(&self, table: &str, columns: &[String], unique: bool) -> String {
        // SQLite indexes share one namespace across the whole database, so
        // the generic `<table>_<cols>_idx` name (already table-prefixed) is
        // sufficient here; the namespace fix in `naming::sqlite_namespaced_index_name`
        // only matters for names reflected from an existing schema dbcut
        // didn't generate itself.
        crate::naming::index_name(table, columns, unique)
    }

    /// SQLite existence/creation/deletion is a filesystem concern (a
    /// database is a file, or `:memory:`), not a SQL statement. These
    /// return the file path note the Orchestrator should act on directly
    /// rather than SQL text to execute; `database_exists` and friends
    /// documented under the engine's ambient stack (SPEC_FULL.md §2.2)
    /// special-case SQLite before consulting this adapter at all.
    fn database_exists_statement(&self, database: &str) -> String {
        database.to_string()
    }

    fn create_database_statement(&self, database: &str) -> String {
        database.to_string()
    }

    fn drop_database_statement(&self, database: &str) -> String {
        database.to_string()
    }
}
