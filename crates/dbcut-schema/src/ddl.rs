use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use dbcut_dialect::DialectAdapter;

use crate::model::Schema;

/// Emit `CREATE TABLE` statements topologically ordered by foreign-key
/// dependency (a table is emitted only after every table its FKs
/// reference), followed by unique indexes and foreign-key constraints,
/// which are always emitted last so no table's DDL depends on one emitted
/// after it.
///
/// `schema` is expected to already have `apply_dialect` applied — this
/// function renders the column types it finds, it does not translate them.
pub fn emit_ddl(schema: &Schema, adapter: &dyn DialectAdapter) -> Vec<String> {
    let order = topological_order(schema);

    let mut statements = Vec::new();
    for table_name in &order {
        let table = schema.table(table_name).expect("topo order is schema-derived");
        let mut cols = Vec::new();
        for col in &table.columns {
            let mut def = format!("{} {}", adapter.quote_identifier(&col.name), col.data_type);
            if !col.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &col.default_value {
                def.push_str(&format!(" DEFAULT {default}"));
            }
            cols.push(def);
        }
        if !table.primary_key.is_empty() {
            let pk_cols = table
                .primary_key
                .iter()
                .map(|c| adapter.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            cols.push(format!("PRIMARY KEY ({pk_cols})"));
        }
        statements.push(format!(
            "CREATE TABLE {} (\n  {}\n)",
            adapter.quote_identifier(&table.name),
            cols.join(",\n  ")
        ));
    }

    for table_name in &order {
        let table = schema.table(table_name).expect("topo order is schema-derived");
        for index in &table.indexes {
            let cols = index
                .columns
                .iter()
                .map(|c| adapter.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            let unique = if index.unique { "UNIQUE " } else { "" };
            statements.push(format!(
                "CREATE {unique}INDEX {} ON {} ({cols})",
                adapter.quote_identifier(&index.name),
                adapter.quote_identifier(&table.name),
            ));
        }
    }

    for table_name in &order {
        let table = schema.table(table_name).expect("topo order is schema-derived");
        for fk in &table.foreign_keys {
            let local = fk
                .columns
                .iter()
                .map(|c| adapter.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            let remote = fk
                .referenced_columns
                .iter()
                .map(|c| adapter.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({local}) REFERENCES {} ({remote})",
                adapter.quote_identifier(&table.name),
                adapter.quote_identifier(&fk.name),
                adapter.quote_identifier(&fk.referenced_table),
            ));
        }
    }

    statements
}

/// Kahn's algorithm over the FK-dependency graph; ties (and any residual
/// cycle) are broken by table name so the output is deterministic.
fn topological_order(schema: &Schema) -> Vec<String> {
    let mut deps: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    let mut indegree: HashMap<&str, usize> = HashMap::new();

    for table in schema.tables() {
        deps.entry(&table.name).or_default();
        indegree.entry(&table.name).or_insert(0);
    }
    for table in schema.tables() {
        for fk in &table.foreign_keys {
            if fk.referenced_table == table.name {
                continue; // self-referencing FK, no ordering constraint
            }
            if schema.table(&fk.referenced_table).is_none() {
                continue; // dangling reference, nothing to order against
            }
            if deps.get_mut(fk.referenced_table.as_str()).map(|s| s.insert(&table.name)) == Some(true) {
                *indegree.entry(&table.name).or_insert(0) += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&n, _)| n)
        .collect();
    let mut queue: VecDeque<&str> = ready.iter().copied().collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();

    while let Some(next) = pop_smallest(&mut queue) {
        if !visited.insert(next) {
            continue;
        }
        order.push(next.to_string());
        ready.remove(next);
        if let Some(dependents) = deps.get(next) {
            for &dep in dependents {
                if let Some(d) = indegree.get_mut(dep) {
                    *d = d.saturating_sub(1);
                    if *d == 0 {
                        queue.push_back(dep);
                    }
                }
            }
        }
    }

    // Any tables left (pure cycles) are appended in name order so every
    // table still gets DDL, just without a dependency guarantee between
    // members of the cycle.
    let mut remaining: Vec<&str> = indegree
        .keys()
        .filter(|n| !visited.contains(*n))
        .copied()
        .collect();
    remaining.sort();
    order.extend(remaining.into_iter().map(String::from));

    order
}

fn pop_smallest<'a>(queue: &mut VecDeque<&'a str>) -> Option<&'a str> {
    if queue.is_empty() {
        return None;
    }
    let mut items: Vec<&str> = queue.drain(..).collect();
    items.sort();
    let smallest = items.remove(0);
    queue.extend(items);
    Some(smallest)
}
