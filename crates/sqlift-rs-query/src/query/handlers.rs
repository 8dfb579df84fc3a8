//! Pluggable method-call handlers.
//!
//! Before the compiler raises an unsupported-method error for a call with
//! no built-in translation, it consults an ordered registry of
//! [`CallHandler`]s: each declares a predicate over the call node and a
//! translation; the first match wins.
//!
//! Three handlers are registered by default: sequence count (`COUNT(*)`),
//! free-form column templating, and nullable default coalescing. Further
//! handlers can be added with [`register_call_handler`].

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use sqlift_rs_core::{SqliftError, SqliftResult};

use crate::ast::{CallExpr, Expr, TypeTag};
use crate::query::compiler::ExpressionCompiler;
use crate::query::result::ParameterMap;
use crate::value::Value;

/// A pluggable translation rule for method calls.
pub trait CallHandler: Send + Sync {
    /// Whether this handler translates the given call.
    fn can_handle(&self, call: &CallExpr) -> bool;

    /// Translates the call into a SQL fragment.
    fn translate(
        &self,
        compiler: &mut ExpressionCompiler<'_>,
        call: &CallExpr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String>;
}

static REGISTRY: Lazy<RwLock<Vec<Arc<dyn CallHandler>>>> = Lazy::new(|| {
    RwLock::new(vec![
        Arc::new(SequenceCountHandler),
        Arc::new(ColumnTemplateHandler),
        Arc::new(CoalesceDefaultHandler),
    ])
});

/// Appends a handler to the registry. Handlers are consulted in
/// registration order, after the built-ins.
pub fn register_call_handler(handler: Arc<dyn CallHandler>) {
    REGISTRY
        .write()
        .expect("call handler registry poisoned")
        .push(handler);
}

/// Runs the first matching handler, or returns `None` when no handler
/// claims the call.
pub(crate) fn dispatch(
    compiler: &mut ExpressionCompiler<'_>,
    call: &CallExpr,
    parameters: &mut ParameterMap,
    alias_required: bool,
) -> SqliftResult<Option<String>> {
    let handlers: Vec<Arc<dyn CallHandler>> = REGISTRY
        .read()
        .expect("call handler registry poisoned")
        .clone();
    for handler in handlers {
        if handler.can_handle(call) {
            return handler
                .translate(compiler, call, parameters, alias_required)
                .map(Some);
        }
    }
    Ok(None)
}

/// Translates a sequence `count` call to `COUNT(*)`.
struct SequenceCountHandler;

impl CallHandler for SequenceCountHandler {
    fn can_handle(&self, call: &CallExpr) -> bool {
        call.declaring == TypeTag::Sequence && call.method == "count"
    }

    fn translate(
        &self,
        _compiler: &mut ExpressionCompiler<'_>,
        _call: &CallExpr,
        _parameters: &mut ParameterMap,
        _alias_required: bool,
    ) -> SqliftResult<String> {
        Ok("COUNT(*)".to_string())
    }
}

/// Renders a free-form column template: the call's first argument is the
/// template text, the second is the column reference substituted for
/// `{0}`.
struct ColumnTemplateHandler;

impl CallHandler for ColumnTemplateHandler {
    fn can_handle(&self, call: &CallExpr) -> bool {
        call.declaring == TypeTag::Template
    }

    fn translate(
        &self,
        compiler: &mut ExpressionCompiler<'_>,
        call: &CallExpr,
        _parameters: &mut ParameterMap,
        _alias_required: bool,
    ) -> SqliftResult<String> {
        let template = match call.args.first() {
            Some(Expr::Constant(Value::String(t))) => t,
            _ => {
                return Err(SqliftError::UnsupportedConstruct(
                    "column template without a template literal".to_string(),
                ))
            }
        };
        let column = call.args.get(1).ok_or_else(|| {
            SqliftError::UnsupportedConstruct(
                "column template without a column argument".to_string(),
            )
        })?;
        let column_sql = compiler.quoted_member_name(column)?;
        Ok(template.replace("{0}", &column_sql))
    }
}

/// Translates `value_or_default` on a nullable column through the
/// dialect's null-coalescing template, binding a type-derived default.
struct CoalesceDefaultHandler;

impl CallHandler for CoalesceDefaultHandler {
    fn can_handle(&self, call: &CallExpr) -> bool {
        call.declaring == TypeTag::Nullable && call.method == "value_or_default"
    }

    fn translate(
        &self,
        compiler: &mut ExpressionCompiler<'_>,
        call: &CallExpr,
        parameters: &mut ParameterMap,
        _alias_required: bool,
    ) -> SqliftResult<String> {
        let target = call.target.as_deref().ok_or_else(|| {
            SqliftError::UnsupportedConstruct(
                "`value_or_default` without a target column".to_string(),
            )
        })?;
        let Expr::Member(member) = target else {
            return Err(SqliftError::UnsupportedConstruct(
                "`value_or_default` on a non-column target".to_string(),
            ));
        };
        let def = member.def.ok_or_else(|| {
            SqliftError::MissingMember(format!(
                "`{}` does not resolve to a column of the element type",
                member.name
            ))
        })?;
        let column = compiler.quoted_member_name(target)?;
        Ok(compiler
            .dialect()
            .coalesce_null(&column, def.ty.default_value(), parameters))
    }
}
