//! Error types for the sqlift-rs compiler.
//!
//! Compilation is a pure, single-pass translation: every error here is
//! unrecoverable within one compile call and propagates to the caller
//! synchronously. No partial or degraded SQL is ever returned.

use thiserror::Error;

/// The primary error type for sqlift-rs.
///
/// The first four variants form the compile-error taxonomy: they identify
/// the exact construct the compiler could not translate rather than
/// producing a silently wrong SQL string. The remaining variants cover the
/// settings layer and the execution seam.
#[derive(Error, Debug)]
pub enum SqliftError {
    // ── Compilation ──────────────────────────────────────────────────

    /// An expression node kind, method name, or declaring type the
    /// compiler has no translation rule for.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// A skip/paging request without a deterministic ordering in scope.
    #[error("invalid paging request: {0}")]
    InvalidPagingRequest(String),

    /// A member access that resolves to no column of the schema.
    #[error("missing member: {0}")]
    MissingMember(String),

    /// A lambda parameter that cannot be structurally matched to a table
    /// alias when re-mapping for joins or grouping. Treated as unsupported
    /// rather than guessed.
    #[error("ambiguous parameter binding: {0}")]
    AmbiguousParameterBinding(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A settings value is missing or invalid.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    // ── Execution seam ───────────────────────────────────────────────

    /// An error reported by the data-access layer behind the
    /// `SqlExecutor` seam.
    #[error("database error: {0}")]
    DatabaseError(String),
}

impl SqliftError {
    /// Returns `true` for errors raised while translating an expression
    /// tree, as opposed to configuration or execution failures.
    pub const fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedConstruct(_)
                | Self::InvalidPagingRequest(_)
                | Self::MissingMember(_)
                | Self::AmbiguousParameterBinding(_)
        )
    }
}

/// A convenience type alias for `Result<T, SqliftError>`.
pub type SqliftResult<T> = Result<T, SqliftError>;
