//! PostgreSQL dialect.
//!
//! Double-quoted identifiers, `@`-prefixed named parameters,
//! `LIMIT`/`OFFSET` paging, `COALESCE` null handling.

use super::{bind_default_parameter, body_clauses, order_clause, SqlDialect};
use crate::query::result::{ParameterMap, SelectResult};
use crate::value::Value;

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates the dialect.
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
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

    fn coalesce_null(
        &self,
        column: &str,
        default: Value,
        parameters: &mut ParameterMap,
    ) -> String {
        let name = bind_default_parameter(self, default, parameters);
        format!("COALESCE({column}, {name})")
    }

    fn to_query(&self, result: &SelectResult) -> String {
        let distinct = if result.distinct { "DISTINCT " } else { "" };
        let mut sql = format!(
            "SELECT {distinct}{}{}{}",
            result.select.join(", "),
            body_clauses(result),
            order_clause(result)
        );
        if let Some(take) = result.take {
            sql.push_str(&format!(" LIMIT {take}"));
        }
        if let Some(skip) = result.skip {
            sql.push_str(&format!(" OFFSET {skip}"));
        }
        sql
    }
}
