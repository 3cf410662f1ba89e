use dbcut_core::Dialect;

use crate::adapter::DialectAdapter;
use crate::error::DialectError;

pub struct PostgresAdapter;

fn split_base(source_type: &str) -> (String, Option<String>) {
    match source_type.find('(') {
        Some(idx) => (
            source_type[..idx].trim().to_ascii_uppercase(),
            Some(source_type[idx..].to_string()),
        ),
        None => (source_type.trim().to_ascii_uppercase(), None),
    }
}

impl DialectAdapter for PostgresAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
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
            "LONGTEXT" | "MEDIUMTEXT" | "TINYTEXT" => "TEXT".to_string(),
            "DATETIME" => "TIMESTAMP WITHOUT TIME ZONE".to_string(),
            "LONGBLOB" | "MEDIUMBLOB" | "TINYBLOB" | "BINARY" | "VARBINARY" => "BYTEA".to_string(),
            "TINYINT(1)" | "BOOL" => "BOOLEAN".to_string(),
            "TEXT" | "VARCHAR" | "CHAR" | "INT" | "INTEGER" | "BIGINT" | "MEDIUMINT"
            | "FLOAT" | "DOUBLE" | "DECIMAL" | "NUMERIC" | "DATE" | "TIME" | "TIMESTAMP"
            | "BLOB" | "JSON" | "BOOLEAN" | "UUID" => format!("{base}{args}"),
            other => other.to_string() + &args,
        };
        Ok(rendered)
    }

    fn render_insert_ignore(&self, table: &str, columns: &[String], placeholders: &[String]) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn fk_disable_statements(&self, table: Option<&str>) -> Vec<String> {
        match table {
            Some(t) => vec![format!("ALTER TABLE {t} DISABLE TRIGGER ALL")],
            None => Vec::new(),
        }
    }

    fn fk_enable_statements(&self, table: Option<&str>) -> Vec<String> {
        match table {
            Some(t) => vec![format!("ALTER TABLE {t} ENABLE TRIGGER ALL")],
            None => Vec::new(),
        }
    }

    fn fk_guard_is_per_table(&self) -> bool {
        true
    }

    fn estimated_row_count_query(&self, table: &str, _database: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", self.quote_identifier(table))
    }

    fn database_exists_statement(&self, database: &str) -> String {
        format!("SELECT 1 FROM pg_database WHERE datname = '{database}'")
    }

    fn create_database_statement(&self, database: &str) -> String {
        format!("CREATE DATABASE \"{database}\" ENCODING 'UTF8' TEMPLATE template1")
    }

    fn drop_database_statement(&self, database: &str) -> String {
        format!("DROP DATABASE \"{database}\"")
    }
}
