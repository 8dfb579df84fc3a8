//! The execution seam.
//!
//! Compilation stops at a SQL string plus a parameter map; issuing it and
//! materializing rows belongs to the data-access layer. [`SqlExecutor`] is
//! the minimal async contract that layer implements, and [`Row`] /
//! [`FromValue`] give typed access to whatever it returns. The free
//! functions compile a builder and delegate in one step.
//!
//! No driver lives in this crate.

use sqlift_rs_core::{SqliftError, SqliftResult};

use crate::query::builder::{CountQuery, Select};
use crate::query::result::{ParameterMap, StatementResult};
use crate::schema::Schema;
use crate::value::Value;

/// Minimal async database executor contract.
///
/// Implementations bind the named parameter map to a prepared statement
/// and run it; parameter names already include the dialect's prefix and
/// values have been through the dialect's conversion hook. Sequence
/// values ([`Value::List`]) may require driver-level array expansion.
#[async_trait::async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Runs a statement that returns no rows; yields the affected count.
    async fn execute(&self, sql: &str, parameters: &ParameterMap) -> SqliftResult<u64>;

    /// Runs a query and returns all result rows.
    async fn fetch(&self, sql: &str, parameters: &ParameterMap) -> SqliftResult<Vec<Row>>;

    /// Runs a query and returns exactly one row.
    async fn fetch_one(&self, sql: &str, parameters: &ParameterMap) -> SqliftResult<Row> {
        let mut rows = self.fetch(sql, parameters).await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(SqliftError::DatabaseError(
                "query returned no rows".to_string(),
            )),
            n => Err(SqliftError::DatabaseError(format!(
                "query returned {n} rows where one was expected"
            ))),
        }
    }
}

/// Compiles a select query and fetches all rows.
pub async fn fetch_all<T: Schema>(
    query: &Select<T>,
    db: &dyn SqlExecutor,
) -> SqliftResult<Vec<Row>> {
    let result = query.to_sql()?;
    db.fetch(&result.to_query(), &result.parameters).await
}

/// Compiles a select query and fetches exactly one row.
pub async fn fetch_one<T: Schema>(query: &Select<T>, db: &dyn SqlExecutor) -> SqliftResult<Row> {
    let result = query.to_sql()?;
    db.fetch_one(&result.to_query(), &result.parameters).await
}

/// Compiles a count query and fetches the count.
pub async fn fetch_count<T: Schema>(
    query: &CountQuery<T>,
    db: &dyn SqlExecutor,
) -> SqliftResult<i64> {
    let result = query.to_sql()?;
    let row = db.fetch_one(&result.to_query(), &result.parameters).await?;
    row.get_by_index::<i64>(0)
}

/// Runs a compiled INSERT/UPDATE/DELETE statement.
pub async fn execute_statement(
    statement: &StatementResult,
    db: &dyn SqlExecutor,
) -> SqliftResult<u64> {
    db.execute(&statement.sql, &statement.parameters).await
}

/// A generic result row: column names and values in select-list order.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the column and value counts differ.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot
    /// be converted to the requested type.
    pub fn get<V: FromValue>(&self, column: &str) -> SqliftResult<V> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                SqliftError::DatabaseError(format!("column '{column}' not found in row"))
            })?;
        V::from_value(&self.values[idx])
    }

    /// Gets a typed value by column index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or the value cannot
    /// be converted to the requested type.
    pub fn get_by_index<V: FromValue>(&self, idx: usize) -> SqliftResult<V> {
        if idx >= self.values.len() {
            return Err(SqliftError::DatabaseError(format!(
                "column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            )));
        }
        V::from_value(&self.values[idx])
    }
}

/// Conversion from a raw [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts the conversion.
    fn from_value(value: &Value) -> SqliftResult<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(SqliftError::DatabaseError(format!(
                "expected Int, got {value:?}"
            ))),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        match value {
            Value::Int(i) => Self::try_from(*i).map_err(|e| {
                SqliftError::DatabaseError(format!("Int value out of i32 range: {e}"))
            }),
            _ => Err(SqliftError::DatabaseError(format!(
                "expected Int, got {value:?}"
            ))),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as Self),
            _ => Err(SqliftError::DatabaseError(format!(
                "expected Float, got {value:?}"
            ))),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(SqliftError::DatabaseError(format!(
                "expected Bool, got {value:?}"
            ))),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(SqliftError::DatabaseError(format!(
                "expected String, got {value:?}"
            ))),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            _ => Err(SqliftError::DatabaseError(format!(
                "expected Uuid, got {value:?}"
            ))),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        Ok(value.clone())
    }
}

impl<V: FromValue> FromValue for Option<V> {
    fn from_value(value: &Value) -> SqliftResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => V::from_value(value).map(Some),
        }
    }
}
