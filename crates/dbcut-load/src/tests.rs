use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbcut_core::{CoreError, QueryExecutor, Row, Transaction, Value};
use dbcut_dialect::{MySqlAdapter, PostgresAdapter};
use dbcut_engine::DetachedEntity;

use super::*;

#[derive(Default)]
struct RecordingState {
    executed: Vec<(String, Vec<Value>)>,
    attempts: usize,
    committed: bool,
    rolled_back: bool,
}

struct FakeTransaction {
    state: Arc<Mutex<RecordingState>>,
    /// Call index (0-based, across every `execute` call on this
    /// transaction) that fails exactly once; every other call succeeds.
    fail_at: Option<usize>,
}

#[async_trait]
impl Transaction for FakeTransaction {
    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>, CoreError> {
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, CoreError> {
        let mut state = self.state.lock().unwrap();
        let index = state.attempts;
        state.attempts += 1;
        if Some(index) == self.fail_at {
            return Err(CoreError::Query("simulated destination failure".to_string()));
        }
        state.executed.push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        self.state.lock().unwrap().committed = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        self.state.lock().unwrap().rolled_back = true;
        Ok(())
    }
}

struct FakeExecutor {
    state: Arc<Mutex<RecordingState>>,
    fail_at: Option<usize>,
}

impl FakeExecutor {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RecordingState::default())),
            fail_at: None,
        }
    }

    fn failing_at_call(n: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecordingState::default())),
            fail_at: Some(n),
        }
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>, CoreError> {
        Ok(Vec::new())
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64, CoreError> {
        Ok(0)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, CoreError> {
        Ok(Box::new(FakeTransaction {
            state: self.state.clone(),
            fail_at: self.fail_at,
        }))
    }
}

fn author(id: i64, name: &str) -> DetachedEntity {
    DetachedEntity::new(
        "authors",
        Row::new(
            vec!["id".to_string(), "name".to_string()],
            vec![Value::Int64(id), Value::Text(name.to_string())],
        ),
    )
}

fn book_with_author(book_id: i64, title: &str, author_id: i64, author_name: &str) -> DetachedEntity {
    let mut book = DetachedEntity::new(
        "books",
        Row::new(
            vec!["id".to_string(), "author_id".to_string(), "title".to_string()],
            vec![Value::Int64(book_id), Value::Int64(author_id), Value::Text(title.to_string())],
        ),
    );
    book.attach("author", author(author_id, author_name));
    book
}

#[tokio::test]
async fn load_disables_and_re_enables_fk_checks_around_a_bulk_insert() {
    let executor = FakeExecutor::new();
    let adapter = MySqlAdapter;
    let pipeline = LoadPipeline::new(&executor, &adapter);

    let entities = vec![book_with_author(1, "Shogun", 7, "James Clavell")];
    let report = pipeline.load(&entities).await.unwrap();

    assert_eq!(report.rows_loaded, 2);
    assert!(report.tables_touched.contains("books"));
    assert!(report.tables_touched.contains("authors"));

    let state = executor.state.lock().unwrap();
    assert!(state.committed);
    assert!(!state.rolled_back);
    let statements: Vec<&str> = state.executed.iter().map(|(sql, _)| sql.as_str()).collect();
    assert_eq!(statements.first(), Some(&"SET FOREIGN_KEY_CHECKS = 0"));
    assert_eq!(statements.last(), Some(&"SET FOREIGN_KEY_CHECKS = 1"));
}

#[tokio::test]
async fn load_scopes_postgres_fk_guard_per_touched_table() {
    let executor = FakeExecutor::new();
    let adapter = PostgresAdapter;
    let pipeline = LoadPipeline::new(&executor, &adapter);

    let entities = vec![book_with_author(1, "Shogun", 7, "James Clavell")];
    pipeline.load(&entities).await.unwrap();

    let state = executor.state.lock().unwrap();
    let disable_statements: Vec<&str> = state
        .executed
        .iter()
        .map(|(sql, _)| sql.as_str())
        .filter(|sql| sql.contains("DISABLE TRIGGER"))
        .collect();
    assert_eq!(disable_statements.len(), 2);
}

#[tokio::test]
async fn load_uses_a_duplicate_tolerant_insert_statement_per_dialect() {
    let executor = FakeExecutor::new();
    let adapter = MySqlAdapter;
    let pipeline = LoadPipeline::new(&executor, &adapter);

    pipeline.load(&[author(7, "James Clavell")]).await.unwrap();

    let state = executor.state.lock().unwrap();
    assert!(state
        .executed
        .iter()
        .any(|(sql, _)| sql.starts_with("INSERT IGNORE INTO")));
}

#[tokio::test]
async fn load_rolls_back_and_re_enables_fk_checks_when_a_chunk_fails() {
    let executor = FakeExecutor::failing_at_call(1);
    let adapter = MySqlAdapter;
    let pipeline = LoadPipeline::new(&executor, &adapter).with_chunk_size(1);

    let entities = vec![book_with_author(1, "Shogun", 7, "James Clavell")];
    let err = pipeline.load(&entities).await.unwrap_err();

    assert!(matches!(err, LoadError::FlushFailed { .. }));
    let state = executor.state.lock().unwrap();
    assert!(state.rolled_back);
    assert!(!state.committed);
    assert!(state.executed.iter().any(|(sql, _)| sql == "SET FOREIGN_KEY_CHECKS = 1"));
}

#[tokio::test]
async fn load_respects_chunk_size_without_losing_rows() {
    let executor = FakeExecutor::new();
    let adapter = MySqlAdapter;
    let pipeline = LoadPipeline::new(&executor, &adapter).with_chunk_size(1);

    let entities: Vec<DetachedEntity> = (0..5).map(|i| author(i, "author")).collect();
    let report = pipeline.load(&entities).await.unwrap();

    assert_eq!(report.rows_loaded, 5);
}
