//! Table and column metadata for query element types.
//!
//! The [`Schema`] trait is the compiler's window into the element type of a
//! query: the table (or view) name and the list of [`ColumnDef`] entries.
//! A `ColumnDef` is the equivalent of a column-mapping attribute in the
//! source system: it can rename the SQL column, exclude the member from the
//! default select list, and mark the column nullable.
//!
//! # Examples
//!
//! ```
//! use sqlift_rs_query::schema::{ColumnDef, ColumnType, Schema};
//!
//! struct Person;
//!
//! impl Schema for Person {
//!     fn table_name() -> &'static str {
//!         "Person"
//!     }
//!
//!     fn columns() -> &'static [ColumnDef] {
//!         const COLUMNS: &[ColumnDef] = &[
//!             ColumnDef::new("ID", ColumnType::Int),
//!             ColumnDef::new("FirstName", ColumnType::Text),
//!             ColumnDef::new("IsEmployed", ColumnType::Bool).renamed("Is_Employed"),
//!             ColumnDef::new("Age", ColumnType::Int).nullable(),
//!         ];
//!         COLUMNS
//!     }
//! }
//! ```

use crate::value::Value;

/// The SQL-facing type of a column.
///
/// Used to validate pseudo-members (`length` is only meaningful on text
/// columns) and to derive the default value for null-coalescing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Boolean column.
    Bool,
    /// Integer column.
    Int,
    /// Floating-point column.
    Float,
    /// Text column.
    Text,
    /// Date column.
    Date,
    /// Date-and-time column.
    DateTime,
    /// UUID column.
    Uuid,
    /// Binary column.
    Bytes,
}

impl ColumnType {
    /// Returns the default value of this type, used when compiling a
    /// null-coalescing access (`value_or_default`).
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Text => Value::String(String::new()),
            Self::Date => Value::Date(chrono::NaiveDate::MIN),
            Self::DateTime => Value::DateTime(chrono::NaiveDateTime::MIN),
            Self::Uuid => Value::Uuid(uuid::Uuid::nil()),
            Self::Bytes => Value::Bytes(Vec::new()),
        }
    }
}

/// Metadata for one member of a query element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// The member name as written in query expressions.
    pub member: &'static str,
    /// Explicit SQL column name; when `None` the member name is used.
    pub column: Option<&'static str>,
    /// Whether this member participates in the default select list.
    pub select: bool,
    /// Whether the column is nullable (enables `value` / `has_value` /
    /// `value_or_default` accesses).
    pub nullable: bool,
    /// The SQL-facing type of the column.
    pub ty: ColumnType,
}

impl ColumnDef {
    /// Creates a column definition for a member, selected by default.
    pub const fn new(member: &'static str, ty: ColumnType) -> Self {
        Self {
            member,
            column: None,
            select: true,
            nullable: false,
            ty,
        }
    }

    /// Overrides the SQL column name.
    #[must_use]
    pub const fn renamed(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Excludes this member from the default select list.
    #[must_use]
    pub const fn excluded(mut self) -> Self {
        self.select = false;
        self
    }

    /// Marks the column nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns the SQL column name (override or member name).
    pub const fn sql_name(&self) -> &'static str {
        match self.column {
            Some(c) => c,
            None => self.member,
        }
    }
}

/// Table metadata for a query element type.
///
/// An implementation with an empty column list compiles to a `*` select
/// list; otherwise the default select is every member whose `select` flag
/// is set, renamed with `AS` where the SQL column name differs.
pub trait Schema: Send + Sync + 'static {
    /// Returns the database table or view name.
    fn table_name() -> &'static str;

    /// Returns the column metadata for this type.
    fn columns() -> &'static [ColumnDef] {
        &[]
    }

    /// Looks up the column definition for a member name.
    fn column(member: &str) -> Option<&'static ColumnDef> {
        Self::columns().iter().find(|c| c.member == member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Car;

    impl Schema for Car {
        fn table_name() -> &'static str {
            "Car"
        }

        fn columns() -> &'static [ColumnDef] {
            const COLUMNS: &[ColumnDef] = &[
                ColumnDef::new("Id", ColumnType::Int),
                ColumnDef::new("Make", ColumnType::Text).renamed("Mfg_Make"),
                ColumnDef::new("Secret", ColumnType::Text).excluded(),
                ColumnDef::new("Mileage", ColumnType::Int).nullable(),
            ];
            COLUMNS
        }
    }

    struct Untyped;

    impl Schema for Untyped {
        fn table_name() -> &'static str {
            "Untyped"
        }
    }

    #[test]
    fn test_sql_name() {
        assert_eq!(Car::column("Id").unwrap().sql_name(), "Id");
        assert_eq!(Car::column("Make").unwrap().sql_name(), "Mfg_Make");
    }

    #[test]
    fn test_lookup_missing() {
        assert!(Car::column("Nope").is_none());
    }

    #[test]
    fn test_flags() {
        assert!(!Car::column("Secret").unwrap().select);
        assert!(Car::column("Mileage").unwrap().nullable);
    }

    #[test]
    fn test_empty_columns() {
        assert!(Untyped::columns().is_empty());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(ColumnType::Int.default_value(), Value::Int(0));
        assert_eq!(ColumnType::Bool.default_value(), Value::Bool(false));
        assert_eq!(
            ColumnType::Text.default_value(),
            Value::String(String::new())
        );
        assert_eq!(
            ColumnType::Uuid.default_value(),
            Value::Uuid(uuid::Uuid::nil())
        );
    }
}
