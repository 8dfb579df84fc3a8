//! # sqlift-rs
//!
//! A strongly-typed, composable query expression to SQL compiler.
//!
//! Build a [`Select`] over a [`Schema`] type, chain filters, projections,
//! ordering, grouping, joins, and paging, then compile to a
//! dialect-specific parameterized statement:
//!
//! ```
//! use sqlift_rs::{field, lambda, lit, ColumnDef, ColumnType, MssqlDialect, Schema, Select};
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
//!             ColumnDef::new("Age", ColumnType::Int),
//!         ];
//!         COLUMNS
//!     }
//! }
//!
//! let result = Select::<Person>::new(MssqlDialect::new())
//!     .filter(lambda(["x"], field::<Person>("x", "Age").ge(lit(18))))
//!     .to_sql()
//!     .unwrap();
//!
//! assert_eq!(
//!     result.to_query(),
//!     "SELECT [ID], [Age] FROM [Person] WHERE [Age] >= @sqlift_1"
//! );
//! ```

pub use sqlift_rs_core::{
    error::{SqliftError, SqliftResult},
    logging, settings,
    settings::Settings,
};
pub use sqlift_rs_query::*;
