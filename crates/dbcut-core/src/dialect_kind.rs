use serde::{Deserialize, Serialize};

/// A SQL dialect dbcut knows how to normalize types and render DML/DDL for.
///
/// Network protocol support for a dialect is an out-of-scope driver
/// concern; this enum only identifies which `DialectAdapter` implementation
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    PostgreSql,
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::PostgreSql => "postgresql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Parse a driver name or common alias, case-insensitively.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "postgresql" | "postgres" | "pg" => Some(Dialect::PostgreSql),
            "sqlite" | "sqlite3" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
