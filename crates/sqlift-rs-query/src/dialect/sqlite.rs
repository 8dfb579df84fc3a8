//! SQLite dialect.
//!
//! Double-quoted identifiers, `@`-prefixed parameters, `LIMIT`/`OFFSET`
//! paging. Booleans and UUIDs are converted to the representations the
//! SQLite drivers expect.

use super::{bind_default_parameter, body_clauses, order_clause, SqlDialect};
use crate::query::result::{ParameterMap, SelectResult};
use crate::value::Value;

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates the dialect.
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    fn quote_column(&self, name: &str) -> String {
        if name.starts_with('"') {
            name.to_string()
        } else {
            format!("\"{name}\"")
        }
    }

    fn quote_table(&self, name: &str, alias: Option<&str>) -> String {
        let base = if name.starts_with('"') || name.starts_with('(') {
            name.to_string()
        } else {
            format!("\"{name}\"")
        };
        match alias {
            Some(a) => format!("{base} AS \"{a}\""),
            None => base,
        }
    }

    fn convert_parameter_value(&self, value: Value) -> Value {
        match value {
            Value::Bool(b) => Value::Int(i64::from(b)),
            Value::Uuid(u) => Value::String(u.to_string()),
            other => other,
        }
    }

    fn coalesce_null(
        &self,
        column: &str,
        default: Value,
        parameters: &mut ParameterMap,
    ) -> String {
        let name = bind_default_parameter(self, default, parameters);
        format!("IFNULL({column}, {name})")
    }

    fn to_query(&self, result: &SelectResult) -> String {
        let distinct = if result.distinct { "DISTINCT " } else { "" };
        let mut sql = format!(
            "SELECT {distinct}{}{}{}",
            result.select.join(", "),
            body_clauses(result),
            order_clause(result)
        );
        match (result.take, result.skip) {
            (Some(take), Some(skip)) => {
                sql.push_str(&format!(" LIMIT {take} OFFSET {skip}"));
            }
            (Some(take), None) => sql.push_str(&format!(" LIMIT {take}")),
            // SQLite requires a LIMIT before OFFSET; -1 means unbounded.
            (None, Some(skip)) => sql.push_str(&format!(" LIMIT -1 OFFSET {skip}")),
            (None, None) => {}
        }
        sql
    }
}
