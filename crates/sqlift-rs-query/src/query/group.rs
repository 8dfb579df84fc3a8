//! Group descriptors and key re-mapping.
//!
//! A [`GroupByExpression`] carries the grouping key selector (and, for
//! element-selector grouping, a second lambda). Besides contributing
//! GROUP BY fragments, a descriptor re-maps projections and orderings
//! written against the grouped shape: a `Key` reference is rewritten to
//! the key selector's body, and a member of a composite key (`g.Key.Make`)
//! resolves back to the corresponding per-row column expression.

use sqlift_rs_core::{SqliftError, SqliftResult};

use crate::ast::{CallExpr, Expr, MemberExpr};
use crate::query::compiler::ExpressionCompiler;
use crate::query::result::ParameterMap;

/// A grouping attached to a query builder.
#[derive(Debug, Clone)]
pub struct GroupByExpression {
    key_selector: Expr,
    element_selector: Option<Expr>,
}

impl GroupByExpression {
    /// Creates a descriptor from a key selector lambda.
    pub fn new(key_selector: Expr) -> Self {
        Self {
            key_selector,
            element_selector: None,
        }
    }

    /// Creates a descriptor with an element selector.
    pub fn with_element(key_selector: Expr, element_selector: Expr) -> Self {
        Self {
            key_selector,
            element_selector: Some(element_selector),
        }
    }

    /// The key selector lambda.
    pub fn key_selector(&self) -> &Expr {
        &self.key_selector
    }

    /// The element selector lambda, if any.
    pub fn element_selector(&self) -> Option<&Expr> {
        self.element_selector.as_ref()
    }

    /// Compiles the key selector into GROUP BY fragments (no `AS`
    /// renames; one fragment per composite-key member).
    pub(crate) fn key_fragments(
        &self,
        compiler: &mut ExpressionCompiler<'_>,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<Vec<String>> {
        compiler.compile_selector(&self.key_selector, parameters, alias_required, false)
    }

    /// Rewrites `Key` references in `expr` in terms of the original
    /// per-row columns. The result is bound to the key selector's lambda
    /// parameters so alias qualification keeps working.
    pub fn remap(&self, expr: &Expr) -> SqliftResult<Expr> {
        let (key_params, key_body) = match &self.key_selector {
            Expr::Lambda { params, body } => (params.clone(), body.as_ref()),
            other => (Vec::new(), other),
        };

        let (was_lambda, source) = match expr {
            Expr::Lambda { body, .. } => (true, body.as_ref()),
            other => (false, other),
        };

        let body = Self::rewrite(source, key_body)?;
        if was_lambda {
            Ok(Expr::Lambda {
                params: key_params,
                body: Box::new(body),
            })
        } else {
            Ok(body)
        }
    }

    /// Whether `e` is exactly a `Key` access on a lambda parameter.
    fn is_key_access(e: &Expr) -> bool {
        matches!(
            e,
            Expr::Member(MemberExpr { target, name, .. })
                if name == "Key" && matches!(target.as_ref(), Expr::Parameter(_))
        )
    }

    fn rewrite(e: &Expr, key_body: &Expr) -> SqliftResult<Expr> {
        // g.Key => the whole key selector body.
        if Self::is_key_access(e) {
            return Ok(key_body.clone());
        }

        match e {
            // g.Key.M => the matching member of a composite key.
            Expr::Member(m) if Self::is_key_access(&m.target) => match key_body {
                Expr::New(members) => members
                    .iter()
                    .find(|(alias, _)| *alias == m.name)
                    .map(|(_, key_expr)| key_expr.clone())
                    .ok_or_else(|| {
                        SqliftError::MissingMember(format!(
                            "`{}` is not a member of the grouping key",
                            m.name
                        ))
                    }),
                _ => Err(SqliftError::MissingMember(format!(
                    "`{}` accessed on a non-composite grouping key",
                    m.name
                ))),
            },
            Expr::Member(m) => Ok(Expr::Member(MemberExpr {
                target: Box::new(Self::rewrite(&m.target, key_body)?),
                name: m.name.clone(),
                def: m.def,
            })),
            Expr::Binary { op, left, right } => Ok(Expr::Binary {
                op: *op,
                left: Box::new(Self::rewrite(left, key_body)?),
                right: Box::new(Self::rewrite(right, key_body)?),
            }),
            Expr::Call(call) => Ok(Expr::Call(CallExpr {
                target: call
                    .target
                    .as_ref()
                    .map(|t| Self::rewrite(t, key_body).map(Box::new))
                    .transpose()?,
                method: call.method.clone(),
                declaring: call.declaring,
                args: call
                    .args
                    .iter()
                    .map(|a| Self::rewrite(a, key_body))
                    .collect::<SqliftResult<_>>()?,
            })),
            Expr::Lambda { params, body } => Ok(Expr::Lambda {
                params: params.clone(),
                body: Box::new(Self::rewrite(body, key_body)?),
            }),
            Expr::New(members) => Ok(Expr::New(
                members
                    .iter()
                    .map(|(alias, e)| Ok((alias.clone(), Self::rewrite(e, key_body)?)))
                    .collect::<SqliftResult<_>>()?,
            )),
            Expr::Quote(inner) => Ok(Expr::Quote(Box::new(Self::rewrite(inner, key_body)?))),
            Expr::Convert(inner) => {
                Ok(Expr::Convert(Box::new(Self::rewrite(inner, key_body)?)))
            }
            Expr::Constant(_) | Expr::Parameter(_) | Expr::Subquery(_) => Ok(e.clone()),
        }
    }
}
