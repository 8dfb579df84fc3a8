//! Query building and compilation.
//!
//! - [`builder`] - the fluent [`Select`](builder::Select) accumulator and
//!   its hoisting compile
//! - [`compiler`] - the expression-to-SQL walker
//! - [`handlers`] - the pluggable method-call handler chain
//! - [`join`] - join descriptors and compiled join clauses
//! - [`group`] - group descriptors and key re-mapping
//! - [`result`] - compiled results and the parameter map
//! - [`dml`] - INSERT/UPDATE/DELETE builders

pub mod builder;
pub mod compiler;
pub mod dml;
pub mod group;
pub mod handlers;
pub mod join;
pub mod result;

pub use builder::{CountQuery, OrderByExpression, QueryNode, Select};
pub use compiler::ExpressionCompiler;
pub use dml::{Delete, Insert, Update};
pub use group::GroupByExpression;
pub use handlers::{register_call_handler, CallHandler};
pub use join::{JoinExpression, JoinResult};
pub use result::{ParameterMap, SelectResult, StatementResult};
