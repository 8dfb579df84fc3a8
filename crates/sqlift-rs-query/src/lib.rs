//! # sqlift-rs-query
//!
//! A strongly-typed query expression to SQL compiler. A [`Select`](query::Select)
//! builder accumulates filters, projections, ordering, grouping, joins, and
//! paging through fluent calls; compiling walks the builder chain, turns each
//! expression tree into SQL fragments with freshly-named parameters, and
//! assembles a dialect-specific statement plus a named parameter map.
//!
//! ## Architecture
//!
//! Compilation is lazy and pure: builders only record state, and
//! [`Select::to_sql`](query::Select::to_sql) produces an immutable
//! [`SelectResult`](query::SelectResult) without touching a database. The
//! execution layer behind the [`SqlExecutor`](executor::SqlExecutor) seam
//! binds the parameter map and runs the statement.
//!
//! ## Module Overview
//!
//! - [`value`] - the backend-agnostic [`Value`](value::Value) enum
//! - [`schema`] - the [`Schema`](schema::Schema) trait and column metadata
//! - [`ast`] - the expression tree and the embedded expression builder
//! - [`query`] - builders, the expression compiler, and compiled results
//! - [`dialect`] - per-engine quoting, paging, and clause assembly
//! - [`executor`] - the async execution seam

// These clippy lints are intentionally allowed for this crate:
// - too_many_lines: the expression walker is inherently large due to many
//   match arms
// - result_large_err: SqliftError is the library error type and is used
//   consistently
// - format_push_string: format! with push_str is clearer than write! for
//   SQL assembly
// - doc_markdown: backtick requirements for documentation items are too
//   strict
#![allow(clippy::too_many_lines)]
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]

pub mod ast;
pub mod dialect;
pub mod executor;
pub mod query;
pub mod schema;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use ast::{
    column_format, count_all, field, group_key, group_key_member, lambda, lit, null, param,
    projection, BinaryOp, CallExpr, Expr, MemberExpr, SubqueryExpr, TypeTag,
};
pub use dialect::{
    MssqlDialect, MysqlDialect, OracleDialect, PostgresDialect, SqlDialect, SqliteDialect,
};
pub use executor::{
    execute_statement, fetch_all, fetch_count, fetch_one, FromValue, Row, SqlExecutor,
};
pub use query::{
    register_call_handler, CallHandler, CountQuery, Delete, ExpressionCompiler,
    GroupByExpression, Insert, JoinExpression, JoinResult, OrderByExpression, ParameterMap,
    QueryNode, Select, SelectResult, StatementResult, Update,
};
pub use schema::{ColumnDef, ColumnType, Schema};
pub use value::Value;
