use dbcut_core::Dialect;

use crate::adapter::DialectAdapter;
use crate::error::DialectError;

pub struct MySqlAdapter;

fn split_base(source_type: &str) -> (String, Option<String>) {
    match source_type.find('(') {
        Some(idx) => (
            source_type[..idx].trim().to_ascii_uppercase(),
            Some(source_type[idx..].to_string()),
        ),
        None => (source_type.trim().to_ascii_uppercase(), None),
    }
}

impl DialectAdapter for MySqlAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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
            "BOOLEAN" | "BOOL" => "TINYINT(1)".to_string(),
            "BYTEA" => "LONGBLOB".to_string(),
            "DOUBLE PRECISION" => "DOUBLE".to_string(),
            "TIMESTAMP WITHOUT TIME ZONE" | "TIMESTAMPTZ" => "DATETIME".to_string(),
            "TEXT" | "LONGTEXT" | "MEDIUMTEXT" | "TINYTEXT" | "VARCHAR" | "CHAR" | "INT"
            | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "FLOAT" | "DOUBLE"
            | "DECIMAL" | "NUMERIC" | "DATE" | "TIME" | "DATETIME" | "BLOB" | "LONGBLOB"
            | "MEDIUMBLOB" | "TINYBLOB" | "BINARY" | "VARBINARY" | "JSON" | "ENUM" | "SET" => {
                format!("{base}{args}")
            }
            other => other.to_string() + &args,
        };
        Ok(rendered)
    }

    fn render_insert_ignore(&self, table: &str, columns: &[String], placeholders: &[String]) -> String {
        format!(
            "INSERT IGNORE INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn fk_disable_statements(&self, _table: Option<&str>) -> Vec<String> {
        vec!["SET FOREIGN_KEY_CHECKS = 0".to_string()]
    }

    fn fk_enable_statements(&self, _table: Option<&str>) -> Vec<String> {
        vec!["SET FOREIGN_KEY_CHECKS = 1".to_string()]
    }

    fn estimated_row_count_query(&self, table: &str, database: &str) -> String {
        format!(
            "SELECT TABLE_ROWS FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = '{database}' AND TABLE_NAME = '{table}'"
        )
    }

    fn text_index_prefix_length(&self) -> Option<u32> {
        Some(128)
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn database_exists_statement(&self, database: &str) -> String {
        format!("SELECT SCHEMA_NAME FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = '{database}'")
    }

    fn create_database_statement(&self, database: &str) -> String {
        format!("CREATE DATABASE `{database}` CHARACTER SET utf8mb4")
    }

    fn drop_database_statement(&self, database: &str) -> String {
        format!("DROP DATABASE `{database}`")
    }
}
