//! SQL dialects.
//!
//! A [`SqlDialect`] is the pluggable strategy a query builder is created
//! with: parameter prefix, identifier quoting, value conversion, paging
//! legality and paging SQL shape, null-coalescing templates, and final
//! clause assembly. The compiler itself is dialect-agnostic; everything
//! engine-specific funnels through this trait.
//!
//! Implementations: [`MssqlDialect`] (`TOP` / CTE + `ROW_NUMBER()`),
//! [`SqliteDialect`], [`PostgresDialect`], [`MysqlDialect`]
//! (`LIMIT`/`OFFSET` family), and [`OracleDialect`]
//! (`OFFSET ... ROWS FETCH NEXT ... ROWS ONLY`).

mod mssql;
mod mysql;
mod oracle;
mod postgresql;
mod sqlite;

pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgresql::PostgresDialect;
pub use sqlite::SqliteDialect;

use sqlift_rs_core::{SqliftError, SqliftResult};

use crate::query::result::{ParameterMap, SelectResult};
use crate::value::Value;

/// Strategy object for one target SQL engine.
pub trait SqlDialect: Send + Sync {
    /// A short name for diagnostics (e.g. "mssql").
    fn name(&self) -> &'static str;

    /// The character prepended to parameter names (e.g. `@`, `:`).
    fn parameter_prefix(&self) -> &'static str;

    /// Quotes a column identifier.
    fn quote_column(&self, name: &str) -> String;

    /// Quotes a table identifier, optionally aliased. Pre-formatted input
    /// (already quoted, or a parenthesized derived table) passes through.
    fn quote_table(&self, name: &str, alias: Option<&str>) -> String;

    /// Converts a parameter value into what the engine's driver expects
    /// (e.g. booleans to integers). The default is the identity.
    fn convert_parameter_value(&self, value: Value) -> Value {
        value
    }

    /// Asserts that a skip request is legal. Row skipping requires a
    /// deterministic ordering on every engine.
    fn assert_skip(&self, has_ordering: bool) -> SqliftResult<()> {
        if has_ordering {
            Ok(())
        } else {
            Err(SqliftError::InvalidPagingRequest(
                "skip requires an ordering to be specified first".to_string(),
            ))
        }
    }

    /// Renders a null-coalesced column access, binding `default` as a
    /// parameter.
    ///
    /// Default-value parameters are named from their own sequence
    /// (`<prefix>sqlift_default_<n>`), independent of the predicate
    /// parameter counter.
    fn coalesce_null(
        &self,
        column: &str,
        default: Value,
        parameters: &mut ParameterMap,
    ) -> String;

    /// Assembles the final SQL text for a compiled result, applying the
    /// dialect's paging strategy.
    fn to_query(&self, result: &SelectResult) -> String;
}

/// Mints the next default-value parameter name and binds `default`.
///
/// Shared by the dialect `coalesce_null` implementations: the counter is
/// the number of default-value parameters already bound, not the predicate
/// counter.
pub(crate) fn bind_default_parameter(
    dialect: &dyn SqlDialect,
    default: Value,
    parameters: &mut ParameterMap,
) -> String {
    let n = parameters
        .keys()
        .filter(|k| k.contains("sqlift_default_"))
        .count()
        + 1;
    let name = format!("{}sqlift_default_{n}", dialect.parameter_prefix());
    parameters.insert(name.clone(), dialect.convert_parameter_value(default));
    name
}

/// Renders ` FROM ... [joins] [WHERE ...] [GROUP BY ...]` for a result.
pub(crate) fn body_clauses(result: &SelectResult) -> String {
    let mut sql = format!(" FROM {}", result.table);
    for join in &result.joins {
        sql.push(' ');
        sql.push_str(join);
    }
    if let Some(ref where_clause) = result.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
    }
    if !result.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&result.group_by.join(", "));
    }
    sql
}

/// Renders ` ORDER BY ...`, or nothing when no ordering was requested.
pub(crate) fn order_clause(result: &SelectResult) -> String {
    if result.order_by.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", result.order_by.join(", "))
    }
}
