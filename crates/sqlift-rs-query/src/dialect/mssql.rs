//! Microsoft SQL Server dialect.
//!
//! Bracket-quoted identifiers, `@`-prefixed parameters, `TOP n` for
//! take-only paging, and a CTE + `ROW_NUMBER()` rewrite for skip paging.

use super::{bind_default_parameter, body_clauses, order_clause, SqlDialect};
use crate::query::result::{ParameterMap, SelectResult};
use crate::value::Value;

/// SQL Server dialect. This is the reference dialect: the compiler's SQL
/// shapes in tests are written against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Creates the dialect.
    pub const fn new() -> Self {
        Self
    }
}

/// The row-number column added by the skip-paging rewrite.
const ROW_NUMBER_COLUMN: &str = "[sqlift_row_number]";
/// The CTE name used by the skip-paging rewrite.
const DATA_SET_NAME: &str = "sqlift_data_set";

impl SqlDialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    fn quote_column(&self, name: &str) -> String {
        if name.starts_with('[') {
            name.to_string()
        } else {
            format!("[{name}]")
        }
    }

    fn quote_table(&self, name: &str, alias: Option<&str>) -> String {
        let base = if name.starts_with('[') || name.starts_with('(') {
            name.to_string()
        } else {
            format!("[{name}]")
        };
        match alias {
            Some(a) => format!("{base} AS [{a}]"),
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
        format!("ISNULL({column}, {name})")
    }

    fn to_query(&self, result: &SelectResult) -> String {
        let distinct = if result.distinct { "DISTINCT " } else { "" };

        if let Some(skip) = result.skip {
            // Rewrite the whole statement: the inner select gains a window
            // row-number column ordered by the requested ORDER BY, and the
            // outer select filters on the row-number range.
            let mut select = result.select.join(", ");
            select.push_str(&format!(
                ", ROW_NUMBER() OVER (ORDER BY {}) AS {ROW_NUMBER_COLUMN}",
                result.order_by.join(", ")
            ));
            let inner = format!("SELECT {distinct}{select}{}", body_clauses(result));
            let range = match result.take {
                Some(take) => format!(
                    "{ROW_NUMBER_COLUMN} BETWEEN {} AND {}",
                    skip + 1,
                    skip + take
                ),
                None => format!("{ROW_NUMBER_COLUMN} >= {}", skip + 1),
            };
            return format!(
                "WITH {DATA_SET_NAME} AS ({inner}) SELECT * FROM {DATA_SET_NAME} WHERE {range}"
            );
        }

        let top = result
            .take
            .map_or_else(String::new, |n| format!("TOP {n} "));
        format!(
            "SELECT {distinct}{top}{}{}{}",
            result.select.join(", "),
            body_clauses(result),
            order_clause(result)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_column() {
        let d = MssqlDialect::new();
        assert_eq!(d.quote_column("FirstName"), "[FirstName]");
        assert_eq!(d.quote_column("[FirstName]"), "[FirstName]");
        assert_eq!(d.quote_column("Column With Spaces"), "[Column With Spaces]");
    }

    #[test]
    fn test_quote_table_with_alias() {
        let d = MssqlDialect::new();
        assert_eq!(d.quote_table("Person", None), "[Person]");
        assert_eq!(d.quote_table("Person", Some("p")), "[Person] AS [p]");
        // Pre-formatted text passes through.
        assert_eq!(d.quote_table("[Person] AS [p]", None), "[Person] AS [p]");
        assert_eq!(
            d.quote_table("(SELECT * FROM [Person]) AS d", None),
            "(SELECT * FROM [Person]) AS d"
        );
    }

    #[test]
    fn test_coalesce_null() {
        let d = MssqlDialect::new();
        let mut params = ParameterMap::new();
        let sql = d.coalesce_null("[Age]", Value::Int(0), &mut params);
        assert_eq!(sql, "ISNULL([Age], @sqlift_default_1)");
        assert_eq!(params.get("@sqlift_default_1"), Some(&Value::Int(0)));
    }
}
