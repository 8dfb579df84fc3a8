//! The async execution seam: compiled SQL and parameters flow through a
//! `SqlExecutor` implementation unchanged.

mod common;

use std::sync::Mutex;

use common::Person;
use sqlift_rs_core::{SqliftError, SqliftResult};
use sqlift_rs_query::ast::{field, lambda, lit};
use sqlift_rs_query::dialect::MssqlDialect;
use sqlift_rs_query::executor::{
    execute_statement, fetch_all, fetch_count, fetch_one, Row, SqlExecutor,
};
use sqlift_rs_query::query::{Delete, ParameterMap, Select};
use sqlift_rs_query::value::Value;

/// Records every statement it is asked to run and replays canned rows.
struct RecordingExecutor {
    statements: Mutex<Vec<(String, Vec<(String, Value)>)>>,
    rows: Vec<Row>,
}

impl RecordingExecutor {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            rows,
        }
    }

    fn record(&self, sql: &str, parameters: &ParameterMap) {
        let params = parameters
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        self.statements
            .lock()
            .expect("statement log poisoned")
            .push((sql.to_string(), params));
    }

    fn last_statement(&self) -> (String, Vec<(String, Value)>) {
        self.statements
            .lock()
            .expect("statement log poisoned")
            .last()
            .cloned()
            .expect("no statement recorded")
    }
}

#[async_trait::async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str, parameters: &ParameterMap) -> SqliftResult<u64> {
        self.record(sql, parameters);
        Ok(1)
    }

    async fn fetch(&self, sql: &str, parameters: &ParameterMap) -> SqliftResult<Vec<Row>> {
        self.record(sql, parameters);
        Ok(self.rows.clone())
    }
}

fn person_row(id: i64, name: &str) -> Row {
    Row::new(
        vec!["ID".to_string(), "FirstName".to_string()],
        vec![Value::Int(id), Value::String(name.to_string())],
    )
}

#[tokio::test]
async fn fetch_all_runs_the_compiled_statement() {
    let db = RecordingExecutor::new(vec![person_row(1, "Chris"), person_row(2, "Kate")]);
    let query = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "Age").ge(lit(18))));

    let rows = fetch_all(&query, &db).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get::<String>("FirstName").unwrap(), "Chris");

    let (sql, params) = db.last_statement();
    assert!(sql.contains("WHERE [Age] >= @sqlift_1"));
    assert_eq!(params, vec![("@sqlift_1".to_string(), Value::Int(18))]);
}

#[tokio::test]
async fn fetch_one_requires_exactly_one_row() {
    let db = RecordingExecutor::new(vec![person_row(1, "Chris")]);
    let query = Select::<Person>::new(MssqlDialect::new());
    let row = fetch_one(&query, &db).await.unwrap();
    assert_eq!(row.get::<i64>("ID").unwrap(), 1);

    let empty = RecordingExecutor::new(Vec::new());
    let query = Select::<Person>::new(MssqlDialect::new());
    let err = fetch_one(&query, &empty).await.unwrap_err();
    assert!(matches!(err, SqliftError::DatabaseError(_)));

    let two = RecordingExecutor::new(vec![person_row(1, "a"), person_row(2, "b")]);
    let query = Select::<Person>::new(MssqlDialect::new());
    assert!(fetch_one(&query, &two).await.is_err());
}

#[tokio::test]
async fn fetch_count_reads_the_first_column() {
    let db = RecordingExecutor::new(vec![Row::new(
        vec!["count".to_string()],
        vec![Value::Int(42)],
    )]);
    let query = Select::<Person>::new(MssqlDialect::new()).count();
    let count = fetch_count(&query, &db).await.unwrap();
    assert_eq!(count, 42);

    let (sql, _) = db.last_statement();
    assert_eq!(sql, "SELECT COUNT(*) FROM [Person]");
}

#[tokio::test]
async fn statements_execute_with_their_parameters() {
    let db = RecordingExecutor::new(Vec::new());
    let statement = Delete::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "ID").eq(lit(3))))
        .to_sql()
        .unwrap();
    let affected = execute_statement(&statement, &db).await.unwrap();
    assert_eq!(affected, 1);

    let (sql, params) = db.last_statement();
    assert_eq!(sql, "DELETE FROM [Person] WHERE [ID] = @sqlift_1");
    assert_eq!(params, vec![("@sqlift_1".to_string(), Value::Int(3))]);
}
