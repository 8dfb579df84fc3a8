//! Join descriptors and compiled join clauses.
//!
//! A [`JoinExpression`] couples an inner query with outer/inner key
//! selectors and a result selector. Processing one yields a
//! [`JoinResult`]: the aliased inner table text, both compiled key
//! fragments, and the compiled result-selector fragments (used to derive
//! the select list when the query has no explicit projection).
//!
//! Table aliases come from the key-selector lambda parameters: the outer
//! alias is the outer key selector's first parameter name, the inner alias
//! likewise. The first join descriptor of a compile fixes the naming for
//! every table reference.

use std::fmt;

use sqlift_rs_core::{SqliftError, SqliftResult};

use crate::ast::Expr;
use crate::dialect::SqlDialect;
use crate::query::builder::QueryNode;
use crate::query::compiler::ExpressionCompiler;
use crate::query::result::ParameterMap;

/// A join attached to a query builder.
pub struct JoinExpression {
    inner: Box<dyn QueryNode>,
    outer_key: Expr,
    inner_key: Expr,
    result_selector: Expr,
}

impl fmt::Debug for JoinExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinExpression")
            .field("inner", &self.inner.base_table_name())
            .field("outer_key", &self.outer_key)
            .field("inner_key", &self.inner_key)
            .finish_non_exhaustive()
    }
}

/// The first parameter name of a lambda, if the expression is one.
fn first_lambda_parameter(e: &Expr) -> Option<&str> {
    match e {
        Expr::Lambda { params, .. } => params.first().map(String::as_str),
        Expr::Quote(inner) => first_lambda_parameter(inner),
        _ => None,
    }
}

impl JoinExpression {
    /// Creates a join descriptor. The inner builder is owned by the
    /// descriptor; its filters are not hoisted, so predicates belong on
    /// the outer or derived builder.
    pub fn new(
        inner: Box<dyn QueryNode>,
        outer_key: Expr,
        inner_key: Expr,
        result_selector: Expr,
    ) -> Self {
        Self {
            inner,
            outer_key,
            inner_key,
            result_selector,
        }
    }

    /// The outer table alias (outer key selector's parameter name).
    pub fn outer_alias(&self) -> Option<&str> {
        first_lambda_parameter(&self.outer_key)
    }

    /// The inner table alias (inner key selector's parameter name).
    pub fn inner_alias(&self) -> Option<&str> {
        first_lambda_parameter(&self.inner_key)
    }

    /// The result selector lambda.
    pub fn result_selector(&self) -> &Expr {
        &self.result_selector
    }

    /// Compiles the descriptor into a [`JoinResult`], appending any
    /// parameters the selectors bind.
    pub(crate) fn process(
        &self,
        compiler: &mut ExpressionCompiler<'_>,
        parameters: &mut ParameterMap,
        dialect: &dyn SqlDialect,
    ) -> SqliftResult<JoinResult> {
        let inner_name = self
            .inner
            .table_override()
            .map_or_else(|| self.inner.base_table_name().to_string(), String::from);
        let alias = self.inner_alias().filter(|a| *a != inner_name);
        let inner_table = dialect.quote_table(&inner_name, alias);

        let single = |fragments: Vec<String>, side: &str| {
            fragments.into_iter().next().ok_or_else(|| {
                SqliftError::UnsupportedConstruct(format!(
                    "join {side} key selector produced no column"
                ))
            })
        };

        let inner_key = single(
            compiler.compile_selector(&self.inner_key, parameters, true, true)?,
            "inner",
        )?;
        let outer_key = single(
            compiler.compile_selector(&self.outer_key, parameters, true, true)?,
            "outer",
        )?;
        let result_fragments =
            compiler.compile_selector(&self.result_selector, parameters, true, true)?;

        Ok(JoinResult {
            inner_table,
            outer_key,
            inner_key,
            result_fragments,
        })
    }
}

/// A compiled join clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinResult {
    /// The aliased inner table text (e.g. `[ParentPerson] AS [parent]`).
    pub inner_table: String,
    /// The alias-qualified outer key fragment.
    pub outer_key: String,
    /// The alias-qualified inner key fragment.
    pub inner_key: String,
    /// Compiled result-selector fragments.
    pub result_fragments: Vec<String>,
}

impl JoinResult {
    /// Renders the join clause.
    pub fn to_query(&self) -> String {
        format!(
            "JOIN {} ON {} = {}",
            self.inner_table, self.outer_key, self.inner_key
        )
    }
}
