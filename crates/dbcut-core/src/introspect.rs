use serde::{Deserialize, Serialize};

/// Raw column metadata as returned by a driver's information-schema query,
/// before `SchemaReflector` turns it into a `dbcut_schema::Column`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub ordinal: usize,
    /// The dialect's own type name, e.g. `"TINYINT"`, `"longtext"`.
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<i64>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub is_auto_increment: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawForeignKey {
    pub constraint_name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<RawColumn>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<RawForeignKey>,
    pub indexes: Vec<RawIndex>,
}
