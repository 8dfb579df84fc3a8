//! The query builder and its hoisting compile.
//!
//! [`Select`] accumulates filters, a projection, ordering, grouping,
//! joins, and paging across a chain of fluent calls. Joins and groupings
//! derive a child builder that owns its ancestor outright, so the parent
//! chain is an owned list resolved once at compile entry; there are no
//! back-pointers and no shared mutation.
//!
//! Compilation hoists state up the chain: filters, joins, and groupings
//! concatenate (collected most-derived-first, then reversed to declaration
//! order); the projection and the ordering are the nearest non-empty ones;
//! take, skip, distinct, and the table override resolve nearest-wins.
//! Builders are not safe for concurrent mutation; compiled results are
//! immutable and freely shared.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlift_rs_core::{settings, SqliftError, SqliftResult};

use crate::ast::{Expr, SubqueryExpr};
use crate::dialect::SqlDialect;
use crate::query::compiler::ExpressionCompiler;
use crate::query::group::GroupByExpression;
use crate::query::join::JoinExpression;
use crate::query::result::{ParameterMap, SelectResult};
use crate::schema::Schema;

/// One ordering term: an expression and a direction.
#[derive(Debug, Clone)]
pub struct OrderByExpression {
    /// The order key selector.
    pub expr: Expr,
    /// Sort direction.
    pub ascending: bool,
}

/// Type-erased view of a query builder, used for parent chains, join
/// descriptors, and embedded subqueries.
pub trait QueryNode: Send + Sync {
    /// The element type's table name.
    fn base_table_name(&self) -> &'static str;

    /// The explicit table-name override, if set.
    fn table_override(&self) -> Option<&str>;

    /// The default select list derived from the element type's columns
    /// (`*` when the type carries no column metadata).
    fn default_select(&self, dialect: &dyn SqlDialect) -> Vec<String>;

    /// Accumulated filter predicates.
    fn filters(&self) -> &[Expr];

    /// The explicit projection, if set.
    fn selector(&self) -> Option<&Expr>;

    /// Accumulated ordering terms.
    fn order_bys(&self) -> &[OrderByExpression];

    /// Attached join descriptors.
    fn joins(&self) -> &[JoinExpression];

    /// Attached group descriptors.
    fn groups(&self) -> &[GroupByExpression];

    /// The distinct flag, if explicitly set.
    fn distinct_flag(&self) -> Option<bool>;

    /// The take count, if set.
    fn take_count(&self) -> Option<u64>;

    /// The skip count, if set.
    fn skip_count(&self) -> Option<u64>;

    /// The ancestor this builder was derived from.
    fn parent(&self) -> Option<&dyn QueryNode>;

    /// The derived-table source query, if this builder selects from a
    /// subquery.
    fn source(&self) -> Option<&dyn QueryNode>;

    /// The alias for the derived-table source.
    fn source_alias(&self) -> Option<&str>;

    /// The dialect this builder compiles for.
    fn dialect(&self) -> &Arc<dyn SqlDialect>;

    /// Compiles this builder, numbering parameters after
    /// `existing_parameter_count`.
    fn to_sql_offset(
        &self,
        existing_parameter_count: usize,
        parameter_name_prefix: &str,
    ) -> SqliftResult<SelectResult>;
}

/// A typed, chainable query builder over one element type.
///
/// All operations consume `self` and return the next builder, so a chain
/// reads top to bottom and earlier states cannot be mutated behind the
/// compiler's back.
pub struct Select<T: Schema> {
    table_override: Option<String>,
    dialect: Arc<dyn SqlDialect>,
    filters: Vec<Expr>,
    selector: Option<Expr>,
    order_bys: Vec<OrderByExpression>,
    distinct: Option<bool>,
    take: Option<u64>,
    skip: Option<u64>,
    joins: Vec<JoinExpression>,
    groups: Vec<GroupByExpression>,
    parent: Option<Box<dyn QueryNode>>,
    source: Option<Box<dyn QueryNode>>,
    source_alias: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Schema> std::fmt::Debug for Select<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Select")
            .field("table_override", &self.table_override)
            .field("filters", &self.filters)
            .field("selector", &self.selector)
            .field("order_bys", &self.order_bys)
            .field("distinct", &self.distinct)
            .field("take", &self.take)
            .field("skip", &self.skip)
            .field("joins", &self.joins)
            .field("groups", &self.groups)
            .field("source_alias", &self.source_alias)
            .finish_non_exhaustive()
    }
}

impl<T: Schema> Select<T> {
    fn empty(dialect: Arc<dyn SqlDialect>) -> Self {
        Self {
            table_override: None,
            dialect,
            filters: Vec::new(),
            selector: None,
            order_bys: Vec::new(),
            distinct: None,
            take: None,
            skip: None,
            joins: Vec::new(),
            groups: Vec::new(),
            parent: None,
            source: None,
            source_alias: None,
            _marker: PhantomData,
        }
    }

    /// Creates a builder over `T`'s table for the given dialect.
    pub fn new<D: SqlDialect + 'static>(dialect: D) -> Self {
        Self::with_dialect(Arc::new(dialect))
    }

    /// Creates a builder from a shared dialect handle.
    pub fn with_dialect(dialect: Arc<dyn SqlDialect>) -> Self {
        Self::empty(dialect)
    }

    /// Creates a builder with an explicit table-name override.
    pub fn with_table<D: SqlDialect + 'static>(table: impl Into<String>, dialect: D) -> Self {
        let mut select = Self::new(dialect);
        select.table_override = Some(table.into());
        select
    }

    /// Creates a builder whose FROM source is another query, wrapped as
    /// `(SELECT ...) AS alias`. The inner query is compiled on the shared
    /// parameter counter.
    pub fn from_query<U: Schema>(inner: Select<U>, alias: impl Into<String>) -> Self {
        let mut select = Self::empty(inner.dialect.clone());
        select.source = Some(Box::new(inner));
        select.source_alias = Some(alias.into());
        select
    }

    // ── Chainable operations ─────────────────────────────────────────

    /// Adds a filter predicate. Successive filters AND-compose, in any
    /// call order.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Sets the projection.
    #[must_use]
    pub fn select(mut self, selector: Expr) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Starts a fresh ascending ordering, discarding any prior ordering.
    #[must_use]
    pub fn order_by(mut self, key_selector: Expr) -> Self {
        self.order_bys.clear();
        self.order_bys.push(OrderByExpression {
            expr: key_selector,
            ascending: true,
        });
        self
    }

    /// Starts a fresh descending ordering, discarding any prior ordering.
    #[must_use]
    pub fn order_by_descending(mut self, key_selector: Expr) -> Self {
        self.order_bys.clear();
        self.order_bys.push(OrderByExpression {
            expr: key_selector,
            ascending: false,
        });
        self
    }

    /// Appends an ascending ordering term.
    #[must_use]
    pub fn then_by(mut self, key_selector: Expr) -> Self {
        self.order_bys.push(OrderByExpression {
            expr: key_selector,
            ascending: true,
        });
        self
    }

    /// Appends a descending ordering term.
    #[must_use]
    pub fn then_by_descending(mut self, key_selector: Expr) -> Self {
        self.order_bys.push(OrderByExpression {
            expr: key_selector,
            ascending: false,
        });
        self
    }

    /// Requests DISTINCT rows.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = Some(true);
        self
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub fn take(mut self, n: u64) -> Self {
        self.take = Some(n);
        self
    }

    /// Skips the first `n` rows.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPagingRequest` when no ordering has been specified
    /// on this builder or any ancestor: row-number paging requires a
    /// deterministic order.
    pub fn skip(mut self, n: u64) -> SqliftResult<Self> {
        self.dialect.assert_skip(ordering_in_scope(&self))?;
        self.skip = Some(n);
        Ok(self)
    }

    /// Joins another query. The join descriptor is attached to this
    /// builder, and a derived builder for the joined result type is
    /// returned, parented to this one. Aliases come from the key
    /// selectors' lambda parameter names.
    #[must_use]
    pub fn join<I: Schema, R: Schema>(
        mut self,
        inner: Select<I>,
        outer_key_selector: Expr,
        inner_key_selector: Expr,
        result_selector: Expr,
    ) -> Select<R> {
        self.joins.push(JoinExpression::new(
            Box::new(inner),
            outer_key_selector,
            inner_key_selector,
            result_selector,
        ));
        let derived_table = self.aliased_table_text();
        let dialect = self.dialect.clone();
        let mut derived = Select::<R>::empty(dialect);
        derived.table_override = Some(derived_table);
        derived.parent = Some(Box::new(self));
        derived
    }

    /// Groups by a key selector, deriving a builder for the grouped
    /// pipeline stage. Projections on the derived builder may reference
    /// the grouping key; they are re-mapped to per-row columns at compile
    /// time.
    #[must_use]
    pub fn group_by(self, key_selector: Expr) -> Self {
        self.attach_group(GroupByExpression::new(key_selector))
    }

    /// Groups with both a key selector and an element selector.
    #[must_use]
    pub fn group_by_with_element(self, key_selector: Expr, element_selector: Expr) -> Self {
        self.attach_group(GroupByExpression::with_element(
            key_selector,
            element_selector,
        ))
    }

    fn attach_group(self, group: GroupByExpression) -> Self {
        let mut derived = Self::empty(self.dialect.clone());
        derived.groups.push(group);
        derived.parent = Some(Box::new(self));
        derived
    }

    /// Wraps this builder into a row-count query.
    #[must_use]
    pub fn count(self) -> CountQuery<T> {
        CountQuery { inner: self }
    }

    /// Converts this builder into a subquery expression, usable as a
    /// containment source or comparison value in another query.
    #[must_use]
    pub fn into_subquery(self) -> Expr {
        Expr::Subquery(SubqueryExpr(Arc::new(self)))
    }

    // ── Compilation ──────────────────────────────────────────────────

    /// Compiles with the default offset and the configured parameter
    /// prefix.
    pub fn to_sql(&self) -> SqliftResult<SelectResult> {
        let prefix = settings::current().parameter_prefix;
        compile_query(self, 0, &prefix)
    }

    /// Compiles, numbering parameters after `existing_parameter_count`.
    /// Threading offsets correctly guarantees no collisions across nested
    /// compilations.
    pub fn to_sql_with(
        &self,
        existing_parameter_count: usize,
        parameter_name_prefix: &str,
    ) -> SqliftResult<SelectResult> {
        compile_query(self, existing_parameter_count, parameter_name_prefix)
    }

    /// The FROM-clause text for this builder, aliased when a join scheme
    /// is in scope.
    fn aliased_table_text(&self) -> String {
        if let Some(ref o) = self.table_override {
            return self.dialect.quote_table(o, None);
        }
        let name = T::table_name();
        let alias = self
            .joins
            .first()
            .and_then(JoinExpression::outer_alias)
            .filter(|a| *a != name);
        self.dialect.quote_table(name, alias)
    }
}

impl<T: Schema> QueryNode for Select<T> {
    fn base_table_name(&self) -> &'static str {
        T::table_name()
    }

    fn table_override(&self) -> Option<&str> {
        self.table_override.as_deref()
    }

    fn default_select(&self, dialect: &dyn SqlDialect) -> Vec<String> {
        let columns = T::columns();
        if columns.is_empty() {
            return vec!["*".to_string()];
        }
        columns
            .iter()
            .filter(|c| c.select)
            .map(|c| {
                let sql_name = dialect.quote_column(c.sql_name());
                let as_name = dialect.quote_column(c.member);
                if sql_name == as_name {
                    sql_name
                } else {
                    format!("{sql_name} AS {as_name}")
                }
            })
            .collect()
    }

    fn filters(&self) -> &[Expr] {
        &self.filters
    }

    fn selector(&self) -> Option<&Expr> {
        self.selector.as_ref()
    }

    fn order_bys(&self) -> &[OrderByExpression] {
        &self.order_bys
    }

    fn joins(&self) -> &[JoinExpression] {
        &self.joins
    }

    fn groups(&self) -> &[GroupByExpression] {
        &self.groups
    }

    fn distinct_flag(&self) -> Option<bool> {
        self.distinct
    }

    fn take_count(&self) -> Option<u64> {
        self.take
    }

    fn skip_count(&self) -> Option<u64> {
        self.skip
    }

    fn parent(&self) -> Option<&dyn QueryNode> {
        self.parent.as_deref()
    }

    fn source(&self) -> Option<&dyn QueryNode> {
        self.source.as_deref()
    }

    fn source_alias(&self) -> Option<&str> {
        self.source_alias.as_deref()
    }

    fn dialect(&self) -> &Arc<dyn SqlDialect> {
        &self.dialect
    }

    fn to_sql_offset(
        &self,
        existing_parameter_count: usize,
        parameter_name_prefix: &str,
    ) -> SqliftResult<SelectResult> {
        compile_query(self, existing_parameter_count, parameter_name_prefix)
    }
}

/// A row-count query over a builder's filters and joins.
pub struct CountQuery<T: Schema> {
    inner: Select<T>,
}

impl<T: Schema> CountQuery<T> {
    /// Compiles to a `SELECT COUNT(*)` statement. Ordering, paging, and
    /// distinct are dropped; filters and joins apply.
    pub fn to_sql(&self) -> SqliftResult<SelectResult> {
        let prefix = settings::current().parameter_prefix;
        self.to_sql_with(0, &prefix)
    }

    /// Compiles with an explicit offset and prefix.
    pub fn to_sql_with(
        &self,
        existing_parameter_count: usize,
        parameter_name_prefix: &str,
    ) -> SqliftResult<SelectResult> {
        let mut result =
            compile_query(&self.inner, existing_parameter_count, parameter_name_prefix)?;
        result.select = vec!["COUNT(*)".to_string()];
        result.order_by.clear();
        result.take = None;
        result.skip = None;
        result.distinct = false;
        Ok(result)
    }
}

/// Whether an ordering is specified on `node` or any ancestor.
fn ordering_in_scope(node: &dyn QueryNode) -> bool {
    if !node.order_bys().is_empty() {
        return true;
    }
    node.parent().is_some_and(ordering_in_scope)
}

/// Re-binds a lambda's parameters to the alias scheme fixed by the first
/// join descriptor. A single-parameter lambda that already uses one of the
/// aliases passes through; otherwise its parameter is renamed to the outer
/// alias. A two-parameter lambda binds positionally (outer, inner). Any
/// other shape has no structural correspondence and is rejected.
fn rebind_parameters(expr: Expr, joins: &[&JoinExpression]) -> SqliftResult<Expr> {
    let Some(first) = joins.first() else {
        return Ok(expr);
    };
    let outer = first.outer_alias();
    let inner = first.inner_alias();

    let ambiguous = |what: &str| {
        SqliftError::AmbiguousParameterBinding(format!(
            "{what} cannot be matched to the join aliases"
        ))
    };

    match expr {
        Expr::Lambda { params, body } => match params.len() {
            0 => Ok(Expr::Lambda { params, body }),
            1 => {
                let p = params[0].as_str();
                if Some(p) == outer || Some(p) == inner {
                    return Ok(Expr::Lambda { params, body });
                }
                let target = outer.ok_or_else(|| ambiguous("a lambda parameter"))?;
                let body = rename_parameter(&body, p, target);
                Ok(Expr::Lambda {
                    params: vec![target.to_string()],
                    body: Box::new(body),
                })
            }
            2 => {
                let o = outer.ok_or_else(|| ambiguous("a two-parameter lambda"))?;
                let i = inner.ok_or_else(|| ambiguous("a two-parameter lambda"))?;
                let body = rename_parameter(&body, &params[0], o);
                let body = rename_parameter(&body, &params[1], i);
                Ok(Expr::Lambda {
                    params: vec![o.to_string(), i.to_string()],
                    body: Box::new(body),
                })
            }
            n => Err(ambiguous(&format!("a {n}-parameter lambda"))),
        },
        other => Ok(other),
    }
}

/// Renames every reference to lambda parameter `from` to `to`. Nested
/// lambdas that re-bind the name shadow it and are left alone.
fn rename_parameter(e: &Expr, from: &str, to: &str) -> Expr {
    use crate::ast::{CallExpr, MemberExpr};
    match e {
        Expr::Parameter(name) if name == from => Expr::Parameter(to.to_string()),
        Expr::Member(m) => Expr::Member(MemberExpr {
            target: Box::new(rename_parameter(&m.target, from, to)),
            name: m.name.clone(),
            def: m.def,
        }),
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(rename_parameter(left, from, to)),
            right: Box::new(rename_parameter(right, from, to)),
        },
        Expr::Call(call) => Expr::Call(CallExpr {
            target: call
                .target
                .as_ref()
                .map(|t| Box::new(rename_parameter(t, from, to))),
            method: call.method.clone(),
            declaring: call.declaring,
            args: call
                .args
                .iter()
                .map(|a| rename_parameter(a, from, to))
                .collect(),
        }),
        Expr::Lambda { params, body } if !params.iter().any(|p| p == from) => Expr::Lambda {
            params: params.clone(),
            body: Box::new(rename_parameter(body, from, to)),
        },
        Expr::New(members) => Expr::New(
            members
                .iter()
                .map(|(alias, e)| (alias.clone(), rename_parameter(e, from, to)))
                .collect(),
        ),
        Expr::Quote(inner) => Expr::Quote(Box::new(rename_parameter(inner, from, to))),
        Expr::Convert(inner) => Expr::Convert(Box::new(rename_parameter(inner, from, to))),
        other => other.clone(),
    }
}

/// Compiles a builder chain into a [`SelectResult`].
pub(crate) fn compile_query(
    node: &dyn QueryNode,
    existing_parameter_count: usize,
    parameter_name_prefix: &str,
) -> SqliftResult<SelectResult> {
    let span = sqlift_rs_core::logging::compile_span(node.base_table_name());
    let _guard = span.enter();

    let dialect = node.dialect().clone();
    let mut parameters = ParameterMap::new();
    let mut compiler = ExpressionCompiler::new(
        dialect.as_ref(),
        existing_parameter_count,
        parameter_name_prefix,
    )?;

    // Resolve the ancestor chain once, most-derived first.
    let mut chain: Vec<&dyn QueryNode> = vec![node];
    let mut current = node;
    while let Some(parent) = current.parent() {
        chain.push(parent);
        current = parent;
    }

    // Table or derived-table source.
    let table = if let Some(holder) = chain.iter().find(|n| n.source().is_some()) {
        let source = holder.source().expect("source checked above");
        let alias = holder.source_alias().unwrap_or("d");
        let inner = source.to_sql_offset(compiler.parameter_count(), parameter_name_prefix)?;
        compiler.advance(inner.parameters.len());
        let text = format!("({}) AS {alias}", inner.to_query());
        parameters.extend(inner.parameters);
        text
    } else if let Some(o) = chain.iter().find_map(|n| n.table_override()) {
        dialect.quote_table(o, None)
    } else {
        let name = node.base_table_name();
        let alias = chain
            .iter()
            .find(|n| !n.joins().is_empty())
            .and_then(|n| n.joins()[0].outer_alias())
            .filter(|a| *a != name);
        dialect.quote_table(name, alias)
    };

    // Joins concatenate across the chain; the walk is most-derived-first,
    // so ancestors are visited in reverse to recover declaration order.
    let mut join_exprs: Vec<&JoinExpression> = Vec::new();
    for n in chain.iter().rev() {
        join_exprs.extend(n.joins());
    }
    let alias_required = !join_exprs.is_empty();

    let mut join_results = Vec::with_capacity(join_exprs.len());
    for join in &join_exprs {
        join_results.push(join.process(&mut compiler, &mut parameters, dialect.as_ref())?);
    }

    // Groupings concatenate as well.
    let mut group_exprs: Vec<&GroupByExpression> = Vec::new();
    for n in chain.iter().rev() {
        group_exprs.extend(n.groups());
    }

    let mut group_by = Vec::new();
    for group in &group_exprs {
        group_by.extend(group.key_fragments(&mut compiler, &mut parameters, alias_required)?);
    }

    // Projection: nearest explicit selector wins; otherwise the join
    // result selectors; otherwise the schema's default columns.
    let select = {
        let mut fragments = Vec::new();
        if let Some(selector) = chain.iter().find_map(|n| n.selector()) {
            let mut remapped = selector.clone();
            for group in &group_exprs {
                remapped = group.remap(&remapped)?;
            }
            let rebound = rebind_parameters(remapped, &join_exprs)?;
            fragments =
                compiler.compile_selector(&rebound, &mut parameters, alias_required, true)?;
        }
        if fragments.is_empty() && !join_results.is_empty() {
            for result in &join_results {
                for fragment in &result.result_fragments {
                    if !fragments.contains(fragment) {
                        fragments.push(fragment.clone());
                    }
                }
            }
        }
        if fragments.is_empty() {
            fragments = node.default_select(dialect.as_ref());
        }
        fragments
    };

    // Filters concatenate across the chain, AND-joined in declaration
    // order.
    let mut filters: Vec<Expr> = Vec::new();
    for n in chain.iter().rev() {
        filters.extend(n.filters().iter().cloned());
    }
    let where_clause = if filters.is_empty() {
        None
    } else {
        let rebound = filters
            .into_iter()
            .map(|f| rebind_parameters(f, &join_exprs))
            .collect::<SqliftResult<Vec<_>>>()?;
        Some(compiler.compile(&rebound, &mut parameters, alias_required)?)
    };

    // Ordering: nearest non-empty list, re-mapped through grouping and
    // the join alias scheme.
    let mut order_by = Vec::new();
    let order_terms = chain
        .iter()
        .map(|n| n.order_bys())
        .find(|terms| !terms.is_empty())
        .unwrap_or(&[]);
    for term in order_terms {
        let mut expr = term.expr.clone();
        for group in &group_exprs {
            expr = group.remap(&expr)?;
        }
        let rebound = rebind_parameters(expr, &join_exprs)?;
        let fragments =
            compiler.compile_selector(&rebound, &mut parameters, alias_required, true)?;
        for fragment in fragments {
            if term.ascending {
                order_by.push(fragment);
            } else {
                order_by.push(format!("{fragment} DESC"));
            }
        }
    }

    let take = chain.iter().find_map(|n| n.take_count());
    let skip = chain.iter().find_map(|n| n.skip_count());
    let distinct = chain
        .iter()
        .find_map(|n| n.distinct_flag())
        .unwrap_or(false);

    // Skip is re-validated after hoisting: the ordering may live on an
    // ancestor, but it must exist somewhere.
    if skip.is_some() && order_by.is_empty() {
        return Err(SqliftError::InvalidPagingRequest(
            "skip requires an ordering to be specified first".to_string(),
        ));
    }

    tracing::debug!(
        table = %table,
        parameters = parameters.len(),
        joins = join_results.len(),
        "compiled select query"
    );

    Ok(SelectResult {
        table,
        select,
        where_clause,
        order_by,
        group_by,
        joins: join_results.iter().map(|j| j.to_query()).collect(),
        distinct,
        take,
        skip,
        parameters,
        dialect,
    })
}
