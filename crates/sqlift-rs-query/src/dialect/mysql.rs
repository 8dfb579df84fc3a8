//! MySQL dialect.
//!
//! Backtick-quoted identifiers, `@`-prefixed parameters, `LIMIT`/`OFFSET`
//! paging, `IFNULL` null handling.

use super::{bind_default_parameter, body_clauses, order_clause, SqlDialect};
use crate::query::result::{ParameterMap, SelectResult};
use crate::value::Value;

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates the dialect.
    pub const fn new() -> Self {
        Self
    }
}

// MySQL has no unbounded LIMIT keyword; the documented idiom is a very
// large row count.
const UNBOUNDED_LIMIT: &str = "18446744073709551615";

impl SqlDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    fn quote_column(&self, name: &str) -> String {
        if name.starts_with('`') {
            name.to_string()
        } else {
            format!("`{name}`")
        }
    }

    fn quote_table(&self, name: &str, alias: Option<&str>) -> String {
        let base = if name.starts_with('`') || name.starts_with('(') {
            name.to_string()
        } else {
            format!("`{name}`")
        };
        match alias {
            Some(a) => format!("{base} AS `{a}`"),
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
            (None, Some(skip)) => {
                sql.push_str(&format!(" LIMIT {UNBOUNDED_LIMIT} OFFSET {skip}"));
            }
            (None, None) => {}
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        let d = MysqlDialect::new();
        assert_eq!(d.quote_column("name"), "`name`");
        assert_eq!(d.quote_table("users", Some("u")), "`users` AS `u`");
    }

    #[test]
    fn test_bool_conversion() {
        let d = MysqlDialect::new();
        assert_eq!(d.convert_parameter_value(Value::Bool(false)), Value::Int(0));
    }
}
