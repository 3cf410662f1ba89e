use dbcut_core::Dialect;
use dbcut_dialect::DialectAdapter;

use crate::error::SchemaError;
use crate::model::Schema;

/// Rewrite every column's type/default for the destination dialect, and fix
/// up index naming for dialects (SQLite) with a single database-wide index
/// namespace.
pub fn apply_dialect(schema: &Schema, adapter: &dyn DialectAdapter) -> Result<Schema, SchemaError> {
    let mut out = Schema::new();
    out.relationships = schema.relationships.clone();

    for table in schema.tables() {
        let mut table = table.clone();

        for column in &mut table.columns {
            column.data_type = adapter.normalize_type(&column.data_type)?;
            if let Some(default) = &column.default_value {
                column.default_value = Some(adapter.normalize_default(default));
            }
        }

        if adapter.dialect() == Dialect::Sqlite {
            for index in &mut table.indexes {
                index.name =
                    dbcut_dialect::sqlite_namespaced_index_name(&table.name, &index.name);
            }
        }

        out.insert_table(table);
    }

    Ok(out)
}
