use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbcut_core::{
    CoreError, QueryExecutor, RawColumn, RawTable, Row, SourceIntrospector, Transaction, Value,
};
use dbcut_dialect::SqliteAdapter;
use dbcut_engine::DetachedEntity;
use dbcut_manifest::{DatabaseUrls, Manifest, ManifestEntry};

use crate::orchestrator::entity_to_json;

use super::*;

struct FakeIntrospector {
    table: RawTable,
}

impl FakeIntrospector {
    fn widgets() -> Self {
        Self {
            table: RawTable {
                name: "widgets".to_string(),
                columns: vec![
                    RawColumn {
                        name: "id".to_string(),
                        ordinal: 0,
                        data_type: "INTEGER".to_string(),
                        nullable: false,
                        default_value: None,
                        max_length: None,
                        precision: None,
                        scale: None,
                        is_auto_increment: true,
                    },
                    RawColumn {
                        name: "name".to_string(),
                        ordinal: 1,
                        data_type: "TEXT".to_string(),
                        nullable: false,
                        default_value: None,
                        max_length: None,
                        precision: None,
                        scale: None,
                        is_auto_increment: false,
                    },
                ],
                primary_key: vec!["id".to_string()],
                foreign_keys: Vec::new(),
                indexes: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl SourceIntrospector for FakeIntrospector {
    async fn list_tables(&self) -> Result<Vec<String>, CoreError> {
        Ok(vec![self.table.name.clone()])
    }

    async fn table(&self, _name: &str) -> Result<RawTable, CoreError> {
        Ok(self.table.clone())
    }
}

#[derive(Default)]
struct ExecutorLog {
    queries: Vec<String>,
    executed: Vec<String>,
}

struct FakeTransaction {
    log: Arc<Mutex<ExecutorLog>>,
}

#[async_trait]
impl Transaction for FakeTransaction {
    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>, CoreError> {
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64, CoreError> {
        self.log.lock().unwrap().executed.push(sql.to_string());
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Returns `rows` for every query regardless of SQL text, and records what
/// it was asked to run so tests can assert on call shape without parsing
/// SQL.
struct FakeExecutor {
    rows: Vec<Row>,
    log: Arc<Mutex<ExecutorLog>>,
}

impl FakeExecutor {
    fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            log: Arc::new(Mutex::new(ExecutorLog::default())),
        }
    }

    fn query_count(&self) -> usize {
        self.log.lock().unwrap().queries.len()
    }

    fn executed_statements(&self) -> Vec<String> {
        self.log.lock().unwrap().executed.clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>, CoreError> {
        self.log.lock().unwrap().queries.push(sql.to_string());
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64, CoreError> {
        self.log.lock().unwrap().executed.push(sql.to_string());
        Ok(0)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, CoreError> {
        Ok(Box::new(FakeTransaction { log: self.log.clone() }))
    }
}

fn widget_row(id: i64, name: &str) -> Row {
    Row::new(
        vec!["id".to_string(), "name".to_string()],
        vec![Value::Int64(id), Value::Text(name.to_string())],
    )
}

fn manifest(cache_dir: &std::path::Path) -> Manifest {
    Manifest {
        databases: DatabaseUrls {
            source_uri: "sqlite://source.db".to_string(),
            destination_uri: "sqlite://dest.db".to_string(),
        },
        cache: cache_dir.to_string_lossy().to_string(),
        default_limit: Some(10),
        default_backref_limit: None,
        default_backref_depth: None,
        default_join_depth: None,
        global_exclude: Vec::new(),
        queries: vec![ManifestEntry {
            from: "widgets".to_string(),
            filter: None,
            order_by: Vec::new(),
            offset: None,
            limit: None,
            join_depth: None,
            backref_depth: None,
            backref_limit: None,
            exclude: Vec::new(),
            include: Vec::new(),
        }],
    }
}

#[tokio::test]
async fn run_extracts_caches_and_loads_on_a_cold_cache() {
    let cache_dir = tempfile::tempdir().unwrap();
    let manifest = manifest(cache_dir.path());

    let introspector = FakeIntrospector::widgets();
    let source_executor = FakeExecutor::returning(vec![widget_row(1, "Widget")]);
    let destination_executor = FakeExecutor::returning(Vec::new());
    let source_adapter = SqliteAdapter;
    let destination_adapter = SqliteAdapter;

    let source = SourceHandle {
        introspector: &introspector,
        executor: &source_executor,
        adapter: &source_adapter,
        engine_url: "sqlite://source.db".to_string(),
        host: String::new(),
        database: "source.db".to_string(),
    };
    let destination = DestinationHandle {
        executor: &destination_executor,
        adapter: &destination_adapter,
        database: "dest.db".to_string(),
    };

    let orchestrator = Orchestrator::new(source, destination);
    let profile = orchestrator.run(&manifest, &RunOptions::default()).await.unwrap();

    assert!(profile.elapsed("extracting").is_some());
    assert!(profile.elapsed("caching").is_some());
    assert!(profile.elapsed("loading").is_some());
    assert!(profile.elapsed("cache_hit").is_none());

    let loaded = destination_executor.executed_statements();
    assert!(loaded.iter().any(|s| s.starts_with("INSERT OR IGNORE INTO")));
    assert!(loaded.iter().any(|s| s == "PRAGMA foreign_keys = OFF"));
    assert!(loaded.iter().any(|s| s == "PRAGMA foreign_keys = ON"));
}

#[tokio::test]
async fn run_hits_the_cache_on_a_second_run_and_skips_extraction() {
    let cache_dir = tempfile::tempdir().unwrap();
    let manifest = manifest(cache_dir.path());
    let source_adapter = SqliteAdapter;
    let destination_adapter = SqliteAdapter;

    {
        let introspector = FakeIntrospector::widgets();
        let source_executor = FakeExecutor::returning(vec![widget_row(1, "Widget")]);
        let destination_executor = FakeExecutor::returning(Vec::new());
        let source = SourceHandle {
            introspector: &introspector,
            executor: &source_executor,
            adapter: &source_adapter,
            engine_url: "sqlite://source.db".to_string(),
            host: String::new(),
            database: "source.db".to_string(),
        };
        let destination = DestinationHandle {
            executor: &destination_executor,
            adapter: &destination_adapter,
            database: "dest.db".to_string(),
        };
        let orchestrator = Orchestrator::new(source, destination);
        orchestrator.run(&manifest, &RunOptions::default()).await.unwrap();
    }

    let introspector = FakeIntrospector::widgets();
    let source_executor = FakeExecutor::returning(vec![widget_row(1, "Widget")]);
    let destination_executor = FakeExecutor::returning(Vec::new());
    let source = SourceHandle {
        introspector: &introspector,
        executor: &source_executor,
        adapter: &source_adapter,
        engine_url: "sqlite://source.db".to_string(),
        host: String::new(),
        database: "source.db".to_string(),
    };
    let destination = DestinationHandle {
        executor: &destination_executor,
        adapter: &destination_adapter,
        database: "dest.db".to_string(),
    };
    let orchestrator = Orchestrator::new(source, destination);
    let profile = orchestrator.run(&manifest, &RunOptions::default()).await.unwrap();

    assert!(profile.elapsed("cache_hit").is_some());
    assert!(profile.elapsed("extracting").is_none());
    assert_eq!(source_executor.query_count(), 0);
}

#[tokio::test]
async fn run_respects_force_refresh_even_with_a_warm_cache() {
    let cache_dir = tempfile::tempdir().unwrap();
    let manifest = manifest(cache_dir.path());
    let source_adapter = SqliteAdapter;
    let destination_adapter = SqliteAdapter;

    {
        let introspector = FakeIntrospector::widgets();
        let source_executor = FakeExecutor::returning(vec![widget_row(1, "Widget")]);
        let destination_executor = FakeExecutor::returning(Vec::new());
        let source = SourceHandle {
            introspector: &introspector,
            executor: &source_executor,
            adapter: &source_adapter,
            engine_url: "sqlite://source.db".to_string(),
            host: String::new(),
            database: "source.db".to_string(),
        };
        let destination = DestinationHandle {
            executor: &destination_executor,
            adapter: &destination_adapter,
            database: "dest.db".to_string(),
        };
        let orchestrator = Orchestrator::new(source, destination);
        orchestrator.run(&manifest, &RunOptions::default()).await.unwrap();
    }

    let introspector = FakeIntrospector::widgets();
    let source_executor = FakeExecutor::returning(vec![widget_row(1, "Widget"), widget_row(2, "Gadget")]);
    let destination_executor = FakeExecutor::returning(Vec::new());
    let source = SourceHandle {
        introspector: &introspector,
        executor: &source_executor,
        adapter: &source_adapter,
        engine_url: "sqlite://source.db".to_string(),
        host: String::new(),
        database: "source.db".to_string(),
    };
    let destination = DestinationHandle {
        executor: &destination_executor,
        adapter: &destination_adapter,
        database: "dest.db".to_string(),
    };
    let orchestrator = Orchestrator::new(source, destination);
    let options = RunOptions {
        force_refresh: true,
        ..RunOptions::default()
    };
    let profile = orchestrator.run(&manifest, &options).await.unwrap();

    assert!(profile.elapsed("extracting").is_some());
    assert!(source_executor.query_count() > 0);
}

#[tokio::test]
async fn inspect_diffs_row_counts_between_source_and_destination() {
    let cache_dir = tempfile::tempdir().unwrap();
    let manifest = manifest(cache_dir.path());
    let source_adapter = SqliteAdapter;
    let destination_adapter = SqliteAdapter;

    let introspector = FakeIntrospector::widgets();
    let source_executor = FakeExecutor::returning(vec![Row::new(vec!["n".to_string()], vec![Value::Int64(5)])]);
    let destination_executor = FakeExecutor::returning(vec![Row::new(vec!["n".to_string()], vec![Value::Int64(3)])]);
    let source = SourceHandle {
        introspector: &introspector,
        executor: &source_executor,
        adapter: &source_adapter,
        engine_url: "sqlite://source.db".to_string(),
        host: String::new(),
        database: "source.db".to_string(),
    };
    let destination = DestinationHandle {
        executor: &destination_executor,
        adapter: &destination_adapter,
        database: "dest.db".to_string(),
    };
    let orchestrator = Orchestrator::new(source, destination);

    let diffs = orchestrator.inspect(&manifest, false).await.unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].table, "widgets");
    assert_eq!(diffs[0].source_count, 5);
    assert_eq!(diffs[0].destination_count, 3);
    assert_eq!(diffs[0].diff(), -2);
}

#[tokio::test]
async fn run_writes_one_export_json_file_per_plan_using_table_and_cache_key() {
    let cache_dir = tempfile::tempdir().unwrap();
    let export_dir = tempfile::tempdir().unwrap();
    let manifest = manifest(cache_dir.path());

    let introspector = FakeIntrospector::widgets();
    let source_executor = FakeExecutor::returning(vec![widget_row(1, "Widget")]);
    let destination_executor = FakeExecutor::returning(Vec::new());
    let source_adapter = SqliteAdapter;
    let destination_adapter = SqliteAdapter;

    let source = SourceHandle {
        introspector: &introspector,
        executor: &source_executor,
        adapter: &source_adapter,
        engine_url: "sqlite://source.db".to_string(),
        host: String::new(),
        database: "source.db".to_string(),
    };
    let destination = DestinationHandle {
        executor: &destination_executor,
        adapter: &destination_adapter,
        database: "dest.db".to_string(),
    };

    let orchestrator = Orchestrator::new(source, destination);
    let options = RunOptions {
        sink: LoadSink::ExportJson(export_dir.path().to_path_buf()),
        ..RunOptions::default()
    };
    orchestrator.run(&manifest, &options).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(export_dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(files.len(), 1);
    let name = files[0].to_string_lossy().into_owned();
    assert!(name.starts_with("widgets-"));
    assert!(name.ends_with(".json"));

    let contents = std::fs::read_to_string(export_dir.path().join(&name)).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&contents).unwrap();
    assert_eq!(rows, vec![serde_json::json!({"id": 1, "name": "Widget"})]);
}

fn books_authors_schema() -> dbcut_schema::Schema {
    use dbcut_schema::{Relationship, RelationshipDirection, Table};

    let mut schema = dbcut_schema::Schema::new();
    schema.insert_table(Table {
        name: "authors".to_string(),
        columns: Vec::new(),
        primary_key: vec!["id".to_string()],
        unique_constraints: Vec::new(),
        indexes: Vec::new(),
        foreign_keys: Vec::new(),
    });
    schema.insert_table(Table {
        name: "books".to_string(),
        columns: Vec::new(),
        primary_key: vec!["id".to_string()],
        unique_constraints: Vec::new(),
        indexes: Vec::new(),
        foreign_keys: Vec::new(),
    });
    schema.relationships = vec![
        Relationship {
            name: "author".to_string(),
            direction: RelationshipDirection::ManyToOne,
            local_table: "books".to_string(),
            local_columns: Vec::new(),
            remote_table: "authors".to_string(),
            remote_columns: Vec::new(),
            back_populates: Some("books".to_string()),
            association_table: None,
        },
        Relationship {
            name: "books".to_string(),
            direction: RelationshipDirection::OneToMany,
            local_table: "authors".to_string(),
            local_columns: Vec::new(),
            remote_table: "books".to_string(),
            remote_columns: Vec::new(),
            back_populates: Some("author".to_string()),
            association_table: None,
        },
    ];
    schema
}

fn author_row(id: i64, name: &str) -> Row {
    Row::new(vec!["id".to_string(), "name".to_string()], vec![Value::Int64(id), Value::Text(name.to_string())])
}

fn book_row(id: i64, title: &str) -> Row {
    Row::new(vec!["id".to_string(), "title".to_string()], vec![Value::Int64(id), Value::Text(title.to_string())])
}

#[test]
fn export_json_omits_a_relationship_field_with_no_loaded_children() {
    let schema = books_authors_schema();
    let author = DetachedEntity::new("authors", author_row(1, "Jane"));

    let rendered = entity_to_json(&author, &schema);
    let object = rendered.as_object().unwrap();
    assert!(!object.contains_key("books"));
    assert_eq!(object.get("name").unwrap(), &serde_json::json!("Jane"));
}

#[test]
fn export_json_nests_a_many_to_one_relationship_as_a_single_object() {
    let schema = books_authors_schema();
    let author = DetachedEntity::new("authors", author_row(1, "Jane"));
    let mut book = DetachedEntity::new("books", book_row(10, "Title"));
    book.attach("author", author);

    let rendered = entity_to_json(&book, &schema);
    let author_field = rendered.get("author").unwrap();
    assert!(author_field.is_object());
    assert_eq!(author_field.get("name").unwrap(), &serde_json::json!("Jane"));
}

#[test]
fn export_json_nests_a_one_to_many_relationship_as_an_array() {
    let schema = books_authors_schema();
    let mut author = DetachedEntity::new("authors", author_row(1, "Jane"));
    author.attach("books", DetachedEntity::new("books", book_row(10, "Title")));

    let rendered = entity_to_json(&author, &schema);
    let books_field = rendered.get("books").unwrap();
    assert!(books_field.is_array());
    assert_eq!(books_field.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn run_writes_one_dump_sql_file_per_plan_using_table_and_cache_key() {
    let cache_dir = tempfile::tempdir().unwrap();
    let dump_dir = tempfile::tempdir().unwrap();
    let manifest = manifest(cache_dir.path());

    let introspector = FakeIntrospector::widgets();
    let source_executor = FakeExecutor::returning(vec![widget_row(1, "Widget")]);
    let destination_executor = FakeExecutor::returning(Vec::new());
    let source_adapter = SqliteAdapter;
    let destination_adapter = SqliteAdapter;

    let source = SourceHandle {
        introspector: &introspector,
        executor: &source_executor,
        adapter: &source_adapter,
        engine_url: "sqlite://source.db".to_string(),
        host: String::new(),
        database: "source.db".to_string(),
    };
    let destination = DestinationHandle {
        executor: &destination_executor,
        adapter: &destination_adapter,
        database: "dest.db".to_string(),
    };

    let orchestrator = Orchestrator::new(source, destination);
    let options = RunOptions {
        sink: LoadSink::DumpSql(dump_dir.path().to_path_buf()),
        ..RunOptions::default()
    };
    orchestrator.run(&manifest, &options).await.unwrap();

    // the destination still gets its schema created, but no row ever goes
    // through a live INSERT for this sink.
    assert!(!destination_executor.executed_statements().iter().any(|s| s.starts_with("INSERT")));

    let files: Vec<_> = std::fs::read_dir(dump_dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(files.len(), 1);
    let name = files[0].to_string_lossy().into_owned();
    assert!(name.starts_with("widgets-"));
    assert!(name.ends_with(".sql"));

    let script = std::fs::read_to_string(dump_dir.path().join(&name)).unwrap();
    assert!(script.starts_with("INSERT OR IGNORE INTO"));
    assert!(script.contains("'Widget'"));
}

#[test]
fn run_state_allows_the_documented_edges_only() {
    assert!(RunState::Init.can_transition_to(RunState::Reflecting));
    assert!(RunState::Reflecting.can_transition_to(RunState::SchemaReady));
    assert!(RunState::SchemaReady.can_transition_to(RunState::Compiling));
    assert!(RunState::Compiling.can_transition_to(RunState::CacheHit));
    assert!(RunState::Compiling.can_transition_to(RunState::Extracting));
    assert!(RunState::Extracting.can_transition_to(RunState::Caching));
    assert!(RunState::CacheHit.can_transition_to(RunState::Loading));
    assert!(RunState::Caching.can_transition_to(RunState::Loading));
    assert!(RunState::Loading.can_transition_to(RunState::Compiling));
    assert!(RunState::Loading.can_transition_to(RunState::Done));

    assert!(!RunState::Init.can_transition_to(RunState::Compiling));
    assert!(!RunState::Done.can_transition_to(RunState::Reflecting));
    assert!(!RunState::CacheHit.can_transition_to(RunState::Extracting));
}

#[test]
fn run_state_reaches_error_from_anywhere() {
    for state in [
        RunState::Init,
        RunState::Reflecting,
        RunState::SchemaReady,
        RunState::Compiling,
        RunState::CacheHit,
        RunState::Extracting,
        RunState::Caching,
        RunState::Loading,
        RunState::Done,
    ] {
        assert!(state.can_transition_to(RunState::Error));
    }
}
