//! The query-expression tree.
//!
//! [`Expr`] is the closed set of node kinds the compiler understands:
//! constants, lambda parameters, member accesses, binary operations, method
//! calls, lambdas, anonymous projections, quote/convert wrappers, and
//! embedded subqueries. Trees are immutable once built and freely shared;
//! the compiler matches over every variant, never inspects types at
//! runtime.
//!
//! Literal values must be pre-evaluated by the caller into [`Expr::Constant`]
//! nodes: the compiler never reads ambient object graphs. A captured query
//! object is represented explicitly as [`Expr::Subquery`].
//!
//! The free functions and `Expr` methods below form the embedded
//! expression-builder used to construct trees:
//!
//! ```
//! use sqlift_rs_query::ast::{field, lambda, lit, Expr};
//! use sqlift_rs_query::schema::{ColumnDef, ColumnType, Schema};
//!
//! struct Person;
//! impl Schema for Person {
//!     fn table_name() -> &'static str { "Person" }
//!     fn columns() -> &'static [ColumnDef] {
//!         const COLUMNS: &[ColumnDef] = &[ColumnDef::new("Age", ColumnType::Int)];
//!         COLUMNS
//!     }
//! }
//!
//! // x => x.Age >= 18
//! let predicate = lambda(["x"], field::<Person>("x", "Age").ge(lit(18)));
//! ```

use std::fmt;
use std::ops;
use std::sync::Arc;

use crate::query::builder::QueryNode;
use crate::schema::{ColumnDef, Schema};
use crate::value::Value;

/// Binary operators with a direct SQL rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl BinaryOp {
    /// Returns the SQL operator text.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }

    /// Whether the composed fragment is wrapped in parentheses for
    /// nesting safety (logical connectives and arithmetic).
    pub const fn parenthesized(self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }
}

/// The declaring-type tag of a method call, used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// String methods (`starts_with`, `to_upper`, ...).
    Text,
    /// Sequence methods (`contains` for IN, `count`).
    Sequence,
    /// Nullable accessor methods (`value_or_default`).
    Nullable,
    /// Free-form column templating.
    Template,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Sequence => "sequence",
            Self::Nullable => "nullable",
            Self::Template => "template",
        };
        f.write_str(name)
    }
}

/// A method-call node.
#[derive(Debug, Clone)]
pub struct CallExpr {
    /// The receiver, if any.
    pub target: Option<Box<Expr>>,
    /// The method name (snake_case).
    pub method: String,
    /// The declaring-type tag used for dispatch.
    pub declaring: TypeTag,
    /// Argument expressions.
    pub args: Vec<Expr>,
}

/// A member-access node.
///
/// `def` carries the resolved column metadata when the member was looked
/// up against a [`Schema`]; pseudo-members (`length`, `value`, `has_value`,
/// the grouping `Key`) have no definition and are resolved structurally by
/// the compiler.
#[derive(Debug, Clone)]
pub struct MemberExpr {
    /// The target the member is accessed on.
    pub target: Box<Expr>,
    /// The member name.
    pub name: String,
    /// Column metadata, when the member resolves to a schema column.
    pub def: Option<&'static ColumnDef>,
}

/// An embedded subquery: a captured query object, compiled recursively on
/// the shared parameter counter and inlined as `(SELECT ...)`.
#[derive(Clone)]
pub struct SubqueryExpr(pub Arc<dyn QueryNode>);

impl fmt::Debug for SubqueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subquery({})", self.0.base_table_name())
    }
}

/// One node of a query-expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A pre-evaluated literal value.
    Constant(Value),
    /// A lambda parameter reference.
    Parameter(String),
    /// A member access.
    Member(MemberExpr),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A method call.
    Call(CallExpr),
    /// A lambda with named parameters.
    Lambda {
        /// Parameter names, in order.
        params: Vec<String>,
        /// The lambda body.
        body: Box<Expr>,
    },
    /// An anonymous projection: `(alias, expression)` pairs.
    New(Vec<(String, Expr)>),
    /// A quoted nested lambda passed as an argument. Semantically
    /// transparent.
    Quote(Box<Expr>),
    /// A boxing/widening conversion. Semantically transparent.
    Convert(Box<Expr>),
    /// An embedded subquery.
    Subquery(SubqueryExpr),
}

// ── Constructors ───────────────────────────────────────────────────────

/// A pre-evaluated literal.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

/// The SQL NULL literal.
pub fn null() -> Expr {
    Expr::Constant(Value::Null)
}

/// A lambda parameter reference.
pub fn param(name: &str) -> Expr {
    Expr::Parameter(name.to_string())
}

/// A member access on a lambda parameter, resolved against `T`'s columns.
///
/// An unknown member still constructs a node; the compiler rejects it with
/// a missing-member error when reached.
pub fn field<T: Schema>(param_name: &str, member: &str) -> Expr {
    Expr::Member(MemberExpr {
        target: Box::new(param(param_name)),
        name: member.to_string(),
        def: T::column(member),
    })
}

/// A lambda with the given parameter names.
pub fn lambda<const N: usize>(params: [&str; N], body: Expr) -> Expr {
    Expr::Lambda {
        params: params.iter().map(|p| (*p).to_string()).collect(),
        body: Box::new(body),
    }
}

/// An anonymous projection from `(alias, expression)` pairs.
pub fn projection<'a, I>(members: I) -> Expr
where
    I: IntoIterator<Item = (&'a str, Expr)>,
{
    Expr::New(
        members
            .into_iter()
            .map(|(alias, e)| (alias.to_string(), e))
            .collect(),
    )
}

/// The grouping key of a grouped query (`g.Key`).
pub fn group_key(param_name: &str) -> Expr {
    param(param_name).member("Key")
}

/// One member of a composite grouping key (`g.Key.Make`).
pub fn group_key_member(param_name: &str, member: &str) -> Expr {
    group_key(param_name).member(member)
}

/// A group row count (`COUNT(*)`).
pub fn count_all() -> Expr {
    Expr::Call(CallExpr {
        target: None,
        method: "count".to_string(),
        declaring: TypeTag::Sequence,
        args: Vec::new(),
    })
}

/// A free-form column template: `{0}` in `template` is replaced with the
/// quoted column name of `column` (which must be a member access).
pub fn column_format(template: &str, column: Expr) -> Expr {
    Expr::Call(CallExpr {
        target: None,
        method: "format".to_string(),
        declaring: TypeTag::Template,
        args: vec![lit(template), column],
    })
}

// ── Combinators ────────────────────────────────────────────────────────

impl Expr {
    fn binary(self, op: BinaryOp, rhs: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs),
        }
    }

    fn text_call(self, method: &str, args: Vec<Self>) -> Self {
        Self::Call(CallExpr {
            target: Some(Box::new(self)),
            method: method.to_string(),
            declaring: TypeTag::Text,
            args,
        })
    }

    /// `self = rhs` (rewritten to `IS` against a NULL literal).
    pub fn eq(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Eq, rhs)
    }

    /// `self <> rhs` (rewritten to `IS NOT` against a NULL literal).
    pub fn ne(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Ne, rhs)
    }

    /// `self > rhs`.
    pub fn gt(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Gt, rhs)
    }

    /// `self >= rhs`.
    pub fn ge(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Ge, rhs)
    }

    /// `self < rhs`.
    pub fn lt(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Lt, rhs)
    }

    /// `self <= rhs`.
    pub fn le(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Le, rhs)
    }

    /// `(self AND rhs)`.
    pub fn and(self, rhs: Self) -> Self {
        self.binary(BinaryOp::And, rhs)
    }

    /// `(self OR rhs)`.
    pub fn or(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Or, rhs)
    }

    /// `(self + rhs)`.
    pub fn add(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    /// `(self - rhs)`.
    pub fn sub(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Sub, rhs)
    }

    /// `(self * rhs)`.
    pub fn mul(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Mul, rhs)
    }

    /// `(self / rhs)`.
    pub fn div(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Div, rhs)
    }

    /// `(self % rhs)`.
    pub fn rem(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Mod, rhs)
    }

    /// A structural member access with no schema lookup (pseudo-members
    /// such as `length`, `value`, `has_value`, the grouping `Key`).
    pub fn member(self, name: &str) -> Self {
        Self::Member(MemberExpr {
            target: Box::new(self),
            name: name.to_string(),
            def: None,
        })
    }

    /// String length of a text column: `LEN(col)`.
    pub fn length(self) -> Self {
        self.member("length")
    }

    /// Unwraps a nullable column to the underlying column.
    pub fn value(self) -> Self {
        self.member("value")
    }

    /// Null test on a nullable column: `col IS NOT NULL`.
    pub fn has_value(self) -> Self {
        self.member("has_value")
    }

    /// Null-coalesced access on a nullable column, through the dialect's
    /// coalescing template with a type-derived default value.
    pub fn value_or_default(self) -> Self {
        Self::Call(CallExpr {
            target: Some(Box::new(self)),
            method: "value_or_default".to_string(),
            declaring: TypeTag::Nullable,
            args: Vec::new(),
        })
    }

    /// `col LIKE 'v%'`.
    pub fn starts_with(self, v: impl Into<Value>) -> Self {
        self.text_call("starts_with", vec![lit(v)])
    }

    /// `col LIKE '%v'`.
    pub fn ends_with(self, v: impl Into<Value>) -> Self {
        self.text_call("ends_with", vec![lit(v)])
    }

    /// `col LIKE '%v%'`.
    pub fn contains_str(self, v: impl Into<Value>) -> Self {
        self.text_call("contains", vec![lit(v)])
    }

    /// `UCASE(col)`.
    pub fn to_upper(self) -> Self {
        self.text_call("to_upper", Vec::new())
    }

    /// `LCASE(col)`.
    pub fn to_lower(self) -> Self {
        self.text_call("to_lower", Vec::new())
    }

    /// `LTRIM(RTRIM(col))`.
    pub fn trim(self) -> Self {
        self.text_call("trim", Vec::new())
    }

    /// `REPLACE(col, from, to)`.
    pub fn replace(self, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.text_call("replace", vec![lit(from), lit(to)])
    }

    /// `SUBSTR(col, start[, length])`.
    pub fn substring(self, start: i64, length: Option<i64>) -> Self {
        let mut args = vec![lit(start)];
        if let Some(len) = length {
            args.push(lit(len));
        }
        self.text_call("substring", args)
    }

    /// `CHARINDEX(needle, col)`.
    pub fn index_of(self, needle: impl Into<Value>) -> Self {
        self.text_call("index_of", vec![lit(needle)])
    }

    /// `col IN @p`, binding the whole sequence as a single parameter.
    pub fn in_list(self, values: Vec<Value>) -> Self {
        Self::Call(CallExpr {
            target: Some(Box::new(Self::Constant(Value::List(values)))),
            method: "contains".to_string(),
            declaring: TypeTag::Sequence,
            args: vec![self],
        })
    }

    /// `col IN (SELECT ...)`, inlining the subquery.
    pub fn in_query(self, subquery: Self) -> Self {
        Self::Call(CallExpr {
            target: Some(Box::new(subquery)),
            method: "contains".to_string(),
            declaring: TypeTag::Sequence,
            args: vec![self],
        })
    }

    /// Wraps this expression in a quote node.
    pub fn quote(self) -> Self {
        Self::Quote(Box::new(self))
    }

    /// Wraps this expression in a conversion node.
    pub fn convert(self) -> Self {
        Self::Convert(Box::new(self))
    }
}

impl ops::BitAnd for Expr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl ops::BitOr for Expr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}
