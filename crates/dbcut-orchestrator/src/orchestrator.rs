use std::path::PathBuf;
use std::time::Instant;

use dbcut_cache::{CacheLocation, CacheStore};
use dbcut_compiler::QueryCompiler;
use dbcut_core::{QueryExecutor, SourceIntrospector, Value};
use dbcut_dialect::DialectAdapter;
use dbcut_engine::{DetachedEntity, ExtractionEngine};
use dbcut_graph::RelationGraph;
use dbcut_load::LoadPipeline;
use dbcut_manifest::Manifest;
use dbcut_schema::{apply_dialect, emit_ddl, RelationshipDirection, Schema, SchemaReflector};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::error::RunError;
use crate::profile::{phase_name, RunProfile};
use crate::state::RunState;

/// Everything the orchestrator needs to talk to the source database. The
/// concrete driver behind `introspector`/`executor` is the out-of-scope
/// network collaborator named in the specification; this crate only holds
/// borrowed trait objects and the identifying strings the cache key and
/// cache directory layout need.
pub struct SourceHandle<'a> {
    pub introspector: &'a dyn SourceIntrospector,
    pub executor: &'a dyn QueryExecutor,
    pub adapter: &'a dyn DialectAdapter,
    /// Feeds the cache key (`dbcut-compiler::cache_key::compute`), never
    /// the query text itself.
    pub engine_url: String,
    pub host: String,
    pub database: String,
}

/// The destination session a run loads into. `executor` is assumed to be
/// an administrative connection capable of running
/// `database_exists`/`create_database` statements in addition to DML —
/// the driver collaborator's concern, not this crate's.
pub struct DestinationHandle<'a> {
    pub executor: &'a dyn QueryExecutor,
    pub adapter: &'a dyn DialectAdapter,
    pub database: String,
}

/// Where `LOADING` sends rows. `Destination` is the default `dbcut load`
/// path; the other two back the `dumpjson`/`dumpsql` subcommands, which
/// bypass the destination transaction entirely and write one file per
/// query into the given directory, named `<table>-<cache_key>` the same
/// way the on-disk cache keys its entries.
pub enum LoadSink {
    Destination,
    ExportJson(PathBuf),
    DumpSql(PathBuf),
}

pub struct RunOptions {
    pub no_cache: bool,
    pub force_refresh: bool,
    /// `--last-only`: run only the final manifest entry.
    pub last_only: bool,
    pub sink: LoadSink,
    /// `None` keeps `LoadPipeline`'s own default chunk size.
    pub chunk_size: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            no_cache: false,
            force_refresh: false,
            last_only: false,
            sink: LoadSink::Destination,
            chunk_size: None,
        }
    }
}

/// One table's row count on each side, as surfaced by `dbcut inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCountDiff {
    pub table: String,
    pub source_count: u64,
    pub destination_count: u64,
}

impl TableCountDiff {
    pub fn diff(&self) -> i64 {
        self.destination_count as i64 - self.source_count as i64
    }
}

/// Drives one run or inspection. The cache directory lives on `Manifest`
/// (§6's top-level `cache` key), so it's threaded through `run`/`inspect`
/// per call rather than pinned at construction time.
pub struct Orchestrator<'a> {
    source: SourceHandle<'a>,
    destination: DestinationHandle<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(source: SourceHandle<'a>, destination: DestinationHandle<'a>) -> Self {
        Self { source, destination }
    }

    /// Drives the full state machine of §4.8 for every resolved entry in
    /// `manifest` (or just the last one, under `--last-only`), returning
    /// the accumulated phase timings.
    pub async fn run(&self, manifest: &Manifest, options: &RunOptions) -> Result<RunProfile, RunError> {
        let mut profile = RunProfile::new();
        let mut state = RunState::Init;

        state = self.advance(state, RunState::Reflecting, &mut profile)?;
        let schema = self.reflected_schema(manifest, options.force_refresh).await?;

        state = self.advance(state, RunState::SchemaReady, &mut profile)?;
        self.ensure_destination_schema(&schema).await?;

        let graph = RelationGraph::new(&schema);
        let cache = CacheStore::new(&manifest.cache);

        let mut entries = manifest.resolved_queries();
        if options.last_only {
            entries = entries.into_iter().last().into_iter().collect();
        }
        if entries.is_empty() {
            return Err(RunError::EmptyManifest);
        }

        for entry in &entries {
            state = self.advance(state, RunState::Compiling, &mut profile)?;
            let plan = QueryCompiler::compile(&schema, &graph, &self.source.engine_url, entry)?;

            let location = CacheLocation {
                dialect: self.source.adapter.dialect().as_str().to_string(),
                host: self.source.host.clone(),
                database: self.source.database.clone(),
                root_table: entry.from.clone(),
                cache_key: plan.cache_key.clone(),
            };

            let use_cache = !options.no_cache && !options.force_refresh && cache.is_cached(&location);

            let entities: Vec<DetachedEntity> = if use_cache {
                state = self.advance(state, RunState::CacheHit, &mut profile)?;
                let cached = cache
                    .load(&location)?
                    .expect("is_cached just confirmed this entry's sidecars exist");
                serde_json::from_value(cached.rows)?
            } else {
                state = self.advance(state, RunState::Extracting, &mut profile)?;
                let result = ExtractionEngine::extract(
                    self.source.executor,
                    &schema,
                    &graph,
                    self.source.adapter,
                    &plan,
                )
                .await?;

                if !options.no_cache {
                    state = self.advance(state, RunState::Caching, &mut profile)?;
                    let rows_json = serde_json::to_value(&result.entities)?;
                    cache.save(&location, &rows_json, result.count)?;
                }

                result.entities
            };

            state = self.advance(state, RunState::Loading, &mut profile)?;
            self.load(&entities, options, &schema, &entry.from, &plan.cache_key).await?;

            info!(table = %entry.from, rows = entities.len(), "plan complete");
        }

        self.advance(state, RunState::Done, &mut profile)?;
        profile.finish(Instant::now());
        Ok(profile)
    }

    /// Per-table row count diff between source and destination, the
    /// engine-level half of `dbcut inspect`. `estimate` selects
    /// `DialectAdapter::estimated_row_count_query` over an exact
    /// `COUNT(*)`, matching the CLI's `--estimate` flag.
    pub async fn inspect(&self, manifest: &Manifest, estimate: bool) -> Result<Vec<TableCountDiff>, RunError> {
        let raw_schema = SchemaReflector::reflect(self.source.introspector).await?;
        let schema = apply_dialect(&raw_schema, self.destination.adapter)?;

        let mut diffs = Vec::new();
        for table in schema.table_names() {
            let source_count = self.row_count(self.source.executor, self.source.adapter, table, &self.source.database, estimate).await?;
            let destination_count = self
                .row_count(self.destination.executor, self.destination.adapter, table, &self.destination.database, estimate)
                .await?;
            diffs.push(TableCountDiff {
                table: table.to_string(),
                source_count,
                destination_count,
            });
        }
        diffs.sort_by(|a, b| a.table.cmp(&b.table));
        Ok(diffs)
    }

    async fn row_count(
        &self,
        executor: &dyn QueryExecutor,
        adapter: &dyn DialectAdapter,
        table: &str,
        database: &str,
        estimate: bool,
    ) -> Result<u64, RunError> {
        if estimate {
            let sql = adapter.estimated_row_count_query(table, database);
            let rows = executor.query(&sql, &[]).await?;
            let count = rows.first().and_then(|row| row.get(0)).and_then(Value::as_i64).unwrap_or(0);
            // MySQL's table_rows estimate is absent or stale-zero for tables
            // ANALYZE hasn't touched yet; fall back to an exact count rather
            // than reporting a table as empty when it isn't.
            if count > 0 {
                return Ok(count as u64);
            }
        }
        let sql = format!("SELECT COUNT(*) AS n FROM {}", adapter.quote_identifier(table));
        let rows = executor.query(&sql, &[]).await?;
        let count = rows
            .first()
            .and_then(|row| row.get(0))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    /// Reads `metadata.cache` for the source's reflected schema unless
    /// `force_refresh`, else reflects and applies the destination dialect
    /// fresh and persists the result for next time.
    async fn reflected_schema(&self, manifest: &Manifest, force_refresh: bool) -> Result<dbcut_schema::Schema, RunError> {
        let schema_dir = self.schema_cache_dir(manifest);

        if !force_refresh {
            if let Some(cached) = dbcut_schema::load_cached_schema(&schema_dir)? {
                return Ok(cached);
            }
        }

        let raw_schema = SchemaReflector::reflect(self.source.introspector).await?;
        let schema = apply_dialect(&raw_schema, self.destination.adapter)?;
        dbcut_schema::cache_schema(&schema, &schema_dir)?;
        Ok(schema)
    }

    fn schema_cache_dir(&self, manifest: &Manifest) -> PathBuf {
        PathBuf::from(&manifest.cache)
            .join(self.source.adapter.dialect().as_str())
            .join(&self.source.host)
            .join(&self.source.database)
    }

    async fn ensure_destination_schema(&self, schema: &dbcut_schema::Schema) -> Result<(), RunError> {
        // SQLite's "database" is a file on disk; `database_exists`/
        // `create_database` degrade to the bare path for that dialect
        // rather than SQL text (see `SqliteAdapter::database_exists_statement`),
        // and a SQLite connection string already names the file the driver
        // will create on first connect. Nothing to execute here.
        if self.destination.adapter.dialect() != dbcut_core::Dialect::Sqlite {
            let exists_probe = self.destination.adapter.database_exists_statement(&self.destination.database);
            let rows = self.destination.executor.query(&exists_probe, &[]).await?;
            if rows.is_empty() {
                let create = self.destination.adapter.create_database_statement(&self.destination.database);
                self.destination.executor.execute(&create, &[]).await?;
            }
        }

        for statement in emit_ddl(schema, self.destination.adapter) {
            self.destination.executor.execute(&statement, &[]).await?;
        }
        Ok(())
    }

    async fn load(
        &self,
        entities: &[DetachedEntity],
        options: &RunOptions,
        schema: &Schema,
        table: &str,
        cache_key: &str,
    ) -> Result<(), RunError> {
        match &options.sink {
            LoadSink::Destination => {
                let mut pipeline = LoadPipeline::new(self.destination.executor, self.destination.adapter);
                if let Some(chunk_size) = options.chunk_size {
                    pipeline = pipeline.with_chunk_size(chunk_size);
                }
                pipeline.load(entities).await?;
            }
            LoadSink::ExportJson(dir) => {
                let rows: Vec<JsonValue> = entities.iter().map(|e| entity_to_json(e, schema)).collect();
                let path = dir.join(format!("{table}-{cache_key}.json"));
                std::fs::write(path, serde_json::to_vec_pretty(&rows)?)?;
            }
            LoadSink::DumpSql(dir) => {
                let mut script = String::new();
                for (flat_table, row) in dbcut_load::flatten(entities) {
                    let columns: Vec<String> = row.columns().iter().map(|c| self.destination.adapter.quote_identifier(c)).collect();
                    let literals: Vec<String> = row.values().iter().map(sql_literal).collect();
                    let statement = self.destination.adapter.render_insert_ignore(
                        &self.destination.adapter.quote_identifier(&flat_table),
                        &columns,
                        &literals,
                    );
                    script.push_str(&statement);
                    script.push_str(";\n");
                }
                let path = dir.join(format!("{table}-{cache_key}.sql"));
                std::fs::write(path, script)?;
            }
        }
        Ok(())
    }

    /// Validates `from -> to`, opens `to`'s timing window, and returns
    /// `to` so callers can thread the running state through in one line.
    fn advance(&self, from: RunState, to: RunState, profile: &mut RunProfile) -> Result<RunState, RunError> {
        if !from.can_transition_to(to) {
            return Err(RunError::InvalidTransition { from, to });
        }
        profile.enter(phase_name(to), Instant::now());
        Ok(to)
    }
}

/// Renders a `Value` as SQL literal text for `--dump-sql`, which has no
/// live parameter binding to hand values to.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int64(n) => n.to_string(),
        Value::Float64(n) => n.to_string(),
        Value::Decimal(s) => s.clone(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bytes(bytes) => format!("X'{}'", hex::encode(bytes)),
        Value::Uuid(u) => format!("'{u}'"),
        Value::Date(d) => format!("'{d}'"),
        Value::Time(t) => format!("'{t}'"),
        Value::Timestamp(t) => format!("'{t}'"),
        Value::TimestampTz(t) => format!("'{}'", t.to_rfc3339()),
        Value::Json(j) => format!("'{}'", j.to_string().replace('\'', "''")),
    }
}

/// Renders an entity tree into the `--export-json` shape: scalar columns
/// flattened onto the object (`null` kept where the column is null),
/// `ManyToOne` relations nested as a single object, every other direction
/// as an array — and a relation with no loaded children is omitted from
/// the object entirely rather than written out as `null` or `[]`.
pub(crate) fn entity_to_json(entity: &DetachedEntity, schema: &Schema) -> JsonValue {
    let mut object = serde_json::Map::new();
    for (column, value) in entity.row.columns().iter().zip(entity.row.values()) {
        object.insert(column.clone(), value_to_json(value));
    }

    for (relationship, children) in &entity.children {
        if children.is_empty() {
            continue;
        }
        let direction = schema
            .relationships_from(&entity.table)
            .find(|r| &r.name == relationship)
            .map(|r| r.direction);
        let rendered = if direction == Some(RelationshipDirection::ManyToOne) {
            entity_to_json(&children[0], schema)
        } else {
            JsonValue::Array(children.iter().map(|c| entity_to_json(c, schema)).collect())
        };
        object.insert(relationship.clone(), rendered);
    }

    JsonValue::Object(object)
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int64(n) => JsonValue::from(*n),
        Value::Float64(n) => serde_json::Number::from_f64(*n).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::Decimal(s) => JsonValue::String(s.clone()),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Bytes(bytes) => JsonValue::String(hex::encode(bytes)),
        Value::Uuid(u) => JsonValue::String(u.to_string()),
        Value::Date(d) => JsonValue::String(d.to_string()),
        Value::Time(t) => JsonValue::String(t.to_string()),
        Value::Timestamp(t) => JsonValue::String(t.to_string()),
        // ISO 8601 with a `Z` suffix rather than `+00:00`, matching the
        // documented dump format.
        Value::TimestampTz(t) => JsonValue::String(t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
        Value::Json(j) => j.clone(),
    }
}
