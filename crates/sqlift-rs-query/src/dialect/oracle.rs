//! Oracle dialect.
//!
//! Double-quoted identifiers, `:`-prefixed parameters,
//! `OFFSET ... ROWS FETCH NEXT ... ROWS ONLY` paging, `NVL` null handling.

use super::{bind_default_parameter, body_clauses, order_clause, SqlDialect};
use crate::query::result::{ParameterMap, SelectResult};
use crate::value::Value;

/// Oracle dialect (12c+ row-limiting syntax).
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Creates the dialect.
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn parameter_prefix(&self) -> &'static str {
        ":"
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
            Some(a) => format!("{base} \"{a}\""),
            None => base,
        }
    }

    fn convert_parameter_value(&self, value: Value) -> Value {
        match value {
            Value::Bool(b) => Value::Int(i64::from(b)),
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
        format!("NVL({column}, {name})")
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
            (Some(take), Some(skip)) => sql.push_str(&format!(
                " OFFSET {skip} ROWS FETCH NEXT {take} ROWS ONLY"
            )),
            (Some(take), None) => {
                sql.push_str(&format!(" FETCH FIRST {take} ROWS ONLY"));
            }
            (None, Some(skip)) => sql.push_str(&format!(" OFFSET {skip} ROWS")),
            (None, None) => {}
        }
        sql
    }
}
