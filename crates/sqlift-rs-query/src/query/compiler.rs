//! The expression-to-SQL compiler.
//!
//! [`ExpressionCompiler`] walks an [`Expr`] tree and produces a SQL
//! fragment, appending freshly-named parameters to a [`ParameterMap`].
//! Compilation is a pure function of the tree, the dialect, the parameter
//! offset, and the name prefix: compiling the same tree twice with the
//! same offset yields identical SQL and identical parameters, and the
//! counter is threaded explicitly through recursive calls (never global),
//! so independent compilations are safe on independent threads.
//!
//! Every node kind the walker does not recognize is a hard error naming
//! the construct; a silently wrong fragment is never produced.

use sqlift_rs_core::{SqliftError, SqliftResult};

use crate::ast::{BinaryOp, CallExpr, Expr, MemberExpr, SubqueryExpr, TypeTag};
use crate::dialect::SqlDialect;
use crate::query::handlers;
use crate::query::result::ParameterMap;
use crate::schema::ColumnType;
use crate::value::Value;

/// A human-readable name for a node kind, for error messages.
fn describe(e: &Expr) -> &'static str {
    match e {
        Expr::Constant(_) => "constant",
        Expr::Parameter(_) => "parameter",
        Expr::Member(_) => "member access",
        Expr::Binary { .. } => "binary operation",
        Expr::Call(_) => "method call",
        Expr::Lambda { .. } => "lambda",
        Expr::New(_) => "anonymous projection",
        Expr::Quote(_) => "quote",
        Expr::Convert(_) => "conversion",
        Expr::Subquery(_) => "subquery",
    }
}

/// Recursive expression walker producing SQL fragments and parameters.
pub struct ExpressionCompiler<'a> {
    dialect: &'a dyn SqlDialect,
    prefix: &'a str,
    count: usize,
}

impl<'a> ExpressionCompiler<'a> {
    /// Creates a compiler that numbers parameters starting from
    /// `existing_parameter_count + 1`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when the parameter-name prefix is
    /// blank.
    pub fn new(
        dialect: &'a dyn SqlDialect,
        existing_parameter_count: usize,
        parameter_name_prefix: &'a str,
    ) -> SqliftResult<Self> {
        if parameter_name_prefix.trim().is_empty() {
            return Err(SqliftError::ConfigurationError(
                "parameter name prefix must not be blank".to_string(),
            ));
        }
        Ok(Self {
            dialect,
            prefix: parameter_name_prefix,
            count: existing_parameter_count,
        })
    }

    /// The dialect this compiler renders for.
    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect
    }

    /// The number of parameters accounted for so far (offset included).
    pub const fn parameter_count(&self) -> usize {
        self.count
    }

    /// Advances the counter past parameters minted elsewhere (e.g. by an
    /// inlined subquery compilation).
    pub fn advance(&mut self, n: usize) {
        self.count += n;
    }

    fn next_parameter_name(&mut self) -> String {
        self.count += 1;
        format!(
            "{}{}{}",
            self.dialect.parameter_prefix(),
            self.prefix,
            self.count
        )
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Compiles a list of predicate expressions, AND-joined.
    pub fn compile(
        &mut self,
        exprs: &[Expr],
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        let mut sql = String::new();
        for e in exprs {
            if !sql.is_empty() {
                sql.push_str(" AND ");
            }
            sql.push_str(&self.process_expression(e, parameters, alias_required)?);
        }
        Ok(sql)
    }

    /// Compiles a single predicate expression.
    pub fn compile_one(
        &mut self,
        expr: &Expr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        self.process_expression(expr, parameters, alias_required)
    }

    /// Compiles a selector expression (projection, ordering, or key
    /// selector) into select-list fragments.
    ///
    /// `with_as` controls whether projection members that rename a column
    /// get an `AS` alias.
    pub fn compile_selector(
        &mut self,
        expr: &Expr,
        parameters: &mut ParameterMap,
        alias_required: bool,
        with_as: bool,
    ) -> SqliftResult<Vec<String>> {
        let mut fragments = Vec::new();
        self.process_selector(expr, &mut fragments, parameters, alias_required, with_as)?;
        Ok(fragments)
    }

    // ── Selector walking ─────────────────────────────────────────────

    fn process_selector(
        &mut self,
        e: &Expr,
        fragments: &mut Vec<String>,
        parameters: &mut ParameterMap,
        alias_required: bool,
        with_as: bool,
    ) -> SqliftResult<()> {
        match e {
            Expr::Lambda { body, .. } | Expr::Quote(body) => {
                self.process_selector(body, fragments, parameters, alias_required, with_as)
            }
            Expr::New(members) => {
                for (alias_name, arg) in members {
                    let field = match arg {
                        Expr::Parameter(p) => self.dialect.quote_column(p),
                        _ => self.process_expression(arg, parameters, alias_required)?,
                    };
                    let as_name = self.dialect.quote_column(alias_name);
                    if field == as_name || !with_as {
                        fragments.push(field);
                    } else {
                        fragments.push(format!("{field} AS {as_name}"));
                    }
                }
                Ok(())
            }
            Expr::Convert(inner) => {
                fragments.push(self.process_expression(inner, parameters, alias_required)?);
                Ok(())
            }
            Expr::Member(_) | Expr::Call(_) => {
                fragments.push(self.process_expression(e, parameters, alias_required)?);
                Ok(())
            }
            other => Err(SqliftError::UnsupportedConstruct(format!(
                "{} in a projection",
                describe(other)
            ))),
        }
    }

    // ── Expression walking ───────────────────────────────────────────

    pub(crate) fn process_expression(
        &mut self,
        e: &Expr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        match e {
            Expr::Binary { op, left, right } => {
                self.process_binary(*op, left, right, parameters, alias_required)
            }
            Expr::Lambda { body, .. } => {
                self.process_expression(body, parameters, alias_required)
            }
            Expr::Call(call) => self.process_call(call, parameters, alias_required),
            Expr::Quote(inner) | Expr::Convert(inner) => {
                self.process_expression(inner, parameters, alias_required)
            }
            other => self.process_single_side(other, parameters, alias_required),
        }
    }

    fn process_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        if op.parenthesized() {
            let l = self.process_expression(left, parameters, alias_required)?;
            let r = self.process_expression(right, parameters, alias_required)?;
            return Ok(format!("({l} {} {r})", op.sql()));
        }

        let l = self.process_single_side(left, parameters, alias_required)?;

        // A left side that already carries a LIKE comparison is a complete
        // predicate; composing it further would double-wrap it.
        if l.to_uppercase().contains(" LIKE ") {
            return Ok(l);
        }

        let r = self.process_single_side(right, parameters, alias_required)?;

        // Comparisons against a literal NULL use IS / IS NOT.
        let op_sql = if r == "NULL" {
            match op {
                BinaryOp::Eq => "IS",
                BinaryOp::Ne => "IS NOT",
                other => other.sql(),
            }
        } else {
            op.sql()
        };

        Ok(format!("{l} {op_sql} {r}"))
    }

    fn process_single_side(
        &mut self,
        e: &Expr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        match e {
            Expr::Constant(_) => self.expression_value(e, parameters),
            Expr::Member(m) => self.member_sql(m, alias_required),
            Expr::Binary { .. } => self.process_expression(e, parameters, alias_required),
            Expr::Call(call) => self.process_call(call, parameters, alias_required),
            Expr::Quote(inner) | Expr::Convert(inner) => {
                self.process_expression(inner, parameters, alias_required)
            }
            Expr::Lambda { body, .. } => {
                self.process_expression(body, parameters, alias_required)
            }
            Expr::Subquery(sub) => self.compile_subquery(sub, parameters),
            Expr::Parameter(name) => Err(SqliftError::UnsupportedConstruct(format!(
                "bare lambda parameter `{name}` in a value position"
            ))),
            Expr::New(_) => Err(SqliftError::UnsupportedConstruct(
                "anonymous projection in a value position".to_string(),
            )),
        }
    }

    // ── Member access ────────────────────────────────────────────────

    /// Compiles a member access to a (possibly alias-qualified) quoted
    /// column, resolving the nullable and text pseudo-members.
    fn member_sql(&mut self, m: &MemberExpr, alias_required: bool) -> SqliftResult<String> {
        match m.name.as_str() {
            "length" => {
                let inner = self.column_member(&m.target)?;
                if inner.def.is_some_and(|d| d.ty != ColumnType::Text) {
                    return Err(SqliftError::UnsupportedConstruct(format!(
                        "`length` on non-text column `{}`",
                        inner.name
                    )));
                }
                let col = self.member_sql(inner, alias_required)?;
                Ok(format!("LEN({col})"))
            }
            "value" => {
                // Unwraps to the underlying column.
                let inner = self.column_member(&m.target)?;
                self.member_sql(inner, alias_required)
            }
            "has_value" => {
                let inner = self.column_member(&m.target)?;
                let col = self.member_sql(inner, alias_required)?;
                Ok(format!("{col} IS NOT NULL"))
            }
            "Key" => Err(SqliftError::UnsupportedConstruct(
                "grouping key reference outside a grouped query".to_string(),
            )),
            name => {
                let def = m.def.ok_or_else(|| {
                    SqliftError::MissingMember(format!(
                        "`{name}` does not resolve to a column of the element type"
                    ))
                })?;
                let col = self.dialect.quote_column(def.sql_name());
                if alias_required {
                    if let Some(root) = root_parameter(&m.target) {
                        return Ok(format!(
                            "{}.{col}",
                            self.dialect.quote_table(root, None)
                        ));
                    }
                }
                Ok(col)
            }
        }
    }

    /// Requires the target of a pseudo-member to be a member access.
    fn column_member<'e>(&self, target: &'e Expr) -> SqliftResult<&'e MemberExpr> {
        match target {
            Expr::Member(m) => Ok(m),
            other => Err(SqliftError::UnsupportedConstruct(format!(
                "{} as the target of a column accessor",
                describe(other)
            ))),
        }
    }

    /// Quotes the column name of a member access without alias
    /// qualification. Used by call handlers.
    pub fn quoted_member_name(&self, e: &Expr) -> SqliftResult<String> {
        match e {
            Expr::Member(m) => {
                let def = m.def.ok_or_else(|| {
                    SqliftError::MissingMember(format!(
                        "`{}` does not resolve to a column of the element type",
                        m.name
                    ))
                })?;
                Ok(self.dialect.quote_column(def.sql_name()))
            }
            other => Err(SqliftError::UnsupportedConstruct(format!(
                "{} where a column reference was expected",
                describe(other)
            ))),
        }
    }

    // ── Method calls ─────────────────────────────────────────────────

    fn process_call(
        &mut self,
        call: &CallExpr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        match call.declaring {
            TypeTag::Text => self.process_text_call(call, parameters, alias_required),
            TypeTag::Sequence if call.method == "contains" => {
                self.process_containment(call, parameters, alias_required)
            }
            _ => self.process_handler_call(call, parameters, alias_required),
        }
    }

    /// Name-keyed dispatch for string methods.
    fn process_text_call(
        &mut self,
        call: &CallExpr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        let member = match call.target.as_deref() {
            Some(Expr::Member(m)) => self.member_sql(m, alias_required)?,
            // Chained string calls, e.g. to_lower().starts_with(...).
            Some(Expr::Call(inner)) => self.process_call(inner, parameters, alias_required)?,
            Some(other) => {
                return Err(SqliftError::UnsupportedConstruct(format!(
                    "{} as the target of a string method",
                    describe(other)
                )))
            }
            None => {
                return Err(SqliftError::UnsupportedConstruct(
                    "string method without a target".to_string(),
                ))
            }
        };

        let first = match call.args.first() {
            Some(a) => Some(self.expression_value(a, parameters)?),
            None => None,
        };
        let second = match call.args.get(1) {
            Some(a) => Some(self.expression_value(a, parameters)?),
            None => None,
        };

        let missing = || {
            SqliftError::UnsupportedConstruct(format!(
                "string method `{}` is missing an argument",
                call.method
            ))
        };

        match call.method.as_str() {
            "starts_with" => {
                let p = first.ok_or_else(missing)?;
                append_wildcards(parameters, &p, false, true);
                Ok(format!("{member} LIKE {p}"))
            }
            "ends_with" => {
                let p = first.ok_or_else(missing)?;
                append_wildcards(parameters, &p, true, false);
                Ok(format!("{member} LIKE {p}"))
            }
            "contains" => {
                let p = first.ok_or_else(missing)?;
                append_wildcards(parameters, &p, true, true);
                Ok(format!("{member} LIKE {p}"))
            }
            "to_upper" => Ok(format!("UCASE({member})")),
            "to_lower" => Ok(format!("LCASE({member})")),
            "trim" => Ok(format!("LTRIM(RTRIM({member}))")),
            "replace" => {
                let from = first.ok_or_else(missing)?;
                let to = second.ok_or_else(missing)?;
                Ok(format!("REPLACE({member}, {from}, {to})"))
            }
            "substring" => {
                let start = first.ok_or_else(missing)?;
                match second {
                    Some(len) => Ok(format!("SUBSTR({member}, {start}, {len})")),
                    None => Ok(format!("SUBSTR({member}, {start})")),
                }
            }
            "index_of" => {
                let needle = first.ok_or_else(missing)?;
                Ok(format!("CHARINDEX({needle}, {member})"))
            }
            other => Err(SqliftError::UnsupportedConstruct(format!(
                "method `{other}` on a string column"
            ))),
        }
    }

    /// Compiles sequence containment to `column IN <parameter>`, binding
    /// the whole sequence as a single value. Both call orientations are
    /// accepted: a sequence receiver with the member as the argument, and
    /// the static form with `(sequence, member)` arguments.
    fn process_containment(
        &mut self,
        call: &CallExpr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        let (sequence, member_expr) = match (&call.target, call.args.len()) {
            (Some(target), 1) => (target.as_ref(), &call.args[0]),
            (None, 2) => (&call.args[0], &call.args[1]),
            _ => {
                return Err(SqliftError::UnsupportedConstruct(
                    "containment call shape".to_string(),
                ))
            }
        };

        // The query-composed form passes a quoted lambda; compile it as a
        // full predicate instead.
        if let Expr::Quote(inner) = sequence {
            return self.process_expression(inner, parameters, alias_required);
        }

        let member = match member_expr {
            Expr::Member(m) => self.member_sql(m, alias_required)?,
            Expr::Call(inner) => self.process_call(inner, parameters, alias_required)?,
            other => {
                return Err(SqliftError::UnsupportedConstruct(format!(
                    "{} as a containment member",
                    describe(other)
                )))
            }
        };

        let source = match sequence {
            Expr::Constant(_) => self.expression_value(sequence, parameters)?,
            Expr::Subquery(sub) => self.compile_subquery(sub, parameters)?,
            other => {
                return Err(SqliftError::UnsupportedConstruct(format!(
                    "{} as a containment sequence",
                    describe(other)
                )))
            }
        };

        Ok(format!("{member} IN {source}"))
    }

    /// Consults the ordered call-handler registry; an unhandled call is a
    /// hard error naming the method.
    fn process_handler_call(
        &mut self,
        call: &CallExpr,
        parameters: &mut ParameterMap,
        alias_required: bool,
    ) -> SqliftResult<String> {
        match handlers::dispatch(self, call, parameters, alias_required)? {
            Some(sql) => Ok(sql),
            None => Err(SqliftError::UnsupportedConstruct(format!(
                "method `{}` on a {} type",
                call.method, call.declaring
            ))),
        }
    }

    // ── Values ───────────────────────────────────────────────────────

    /// Resolves a literal position: NULL and the single-space string are
    /// zero-parameter fast paths, a subquery is inlined, anything else
    /// binds a fresh parameter (through the dialect's value conversion).
    pub(crate) fn expression_value(
        &mut self,
        e: &Expr,
        parameters: &mut ParameterMap,
    ) -> SqliftResult<String> {
        match e {
            Expr::Constant(Value::Null) => Ok("NULL".to_string()),
            Expr::Constant(Value::String(s)) if s == " " => Ok("' '".to_string()),
            Expr::Constant(value) => {
                let name = self.next_parameter_name();
                parameters.insert(
                    name.clone(),
                    self.dialect.convert_parameter_value(value.clone()),
                );
                Ok(name)
            }
            Expr::Quote(inner) | Expr::Convert(inner) => {
                self.expression_value(inner, parameters)
            }
            Expr::Subquery(sub) => self.compile_subquery(sub, parameters),
            other => Err(SqliftError::UnsupportedConstruct(format!(
                "{} where a literal value was expected",
                describe(other)
            ))),
        }
    }

    /// Recursively compiles an embedded query on the shared counter and
    /// inlines it as a parenthesized fragment.
    fn compile_subquery(
        &mut self,
        sub: &SubqueryExpr,
        parameters: &mut ParameterMap,
    ) -> SqliftResult<String> {
        let result = sub.0.to_sql_offset(self.count, self.prefix)?;
        self.advance(result.parameters.len());
        let sql = result.to_query();
        parameters.extend(result.parameters);
        Ok(format!("({sql})"))
    }
}

/// Walks a member chain down to its root lambda parameter, if any. The
/// parameter name is the table alias the column is qualified with.
fn root_parameter(e: &Expr) -> Option<&str> {
    match e {
        Expr::Parameter(name) => Some(name),
        Expr::Member(m) => root_parameter(&m.target),
        Expr::Convert(inner) | Expr::Quote(inner) => root_parameter(inner),
        _ => None,
    }
}

/// Adds LIKE wildcards to an already-bound parameter value. String-method
/// translation binds the raw argument first and decorates it afterwards.
fn append_wildcards(parameters: &mut ParameterMap, name: &str, leading: bool, trailing: bool) {
    if let Some(value) = parameters.get_mut(name) {
        let text = match value {
            Value::String(s) => s.clone(),
            ref other => other.to_string(),
        };
        let mut decorated = String::new();
        if leading {
            decorated.push('%');
        }
        decorated.push_str(&text);
        if trailing {
            decorated.push('%');
        }
        *value = Value::String(decorated);
    }
}
