//! INSERT, UPDATE, and DELETE statement builders.
//!
//! These share the select compiler's parameter naming, dialect quoting,
//! and column-metadata resolution. Values are supplied as
//! `(member, Value)` pairs; member names resolve through the element
//! type's [`Schema`](crate::schema::Schema) metadata, so column renames
//! apply to DML exactly as they do to queries.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlift_rs_core::{settings, SqliftError, SqliftResult};

use crate::ast::Expr;
use crate::dialect::SqlDialect;
use crate::query::compiler::ExpressionCompiler;
use crate::query::result::{ParameterMap, StatementResult};
use crate::schema::Schema;
use crate::value::Value;

fn resolve_column<T: Schema>(member: &str, dialect: &dyn SqlDialect) -> SqliftResult<String> {
    let def = T::column(member).ok_or_else(|| {
        SqliftError::MissingMember(format!("`{member}` is not a column of `{}`", T::table_name()))
    })?;
    Ok(dialect.quote_column(def.sql_name()))
}

/// An INSERT statement builder.
pub struct Insert<T: Schema> {
    table_override: Option<String>,
    dialect: Arc<dyn SqlDialect>,
    values: Vec<(String, Value)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Schema> Insert<T> {
    /// Creates an insert into `T`'s table.
    pub fn new<D: SqlDialect + 'static>(dialect: D) -> Self {
        Self {
            table_override: None,
            dialect: Arc::new(dialect),
            values: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Overrides the target table name.
    #[must_use]
    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.table_override = Some(table.into());
        self
    }

    /// Sets a member value.
    #[must_use]
    pub fn set(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((member.into(), value.into()));
        self
    }

    /// Compiles the statement.
    pub fn to_sql(&self) -> SqliftResult<StatementResult> {
        let prefix = settings::current().parameter_prefix;
        self.to_sql_with(0, &prefix)
    }

    /// Compiles, numbering parameters after `existing_parameter_count`.
    pub fn to_sql_with(
        &self,
        existing_parameter_count: usize,
        parameter_name_prefix: &str,
    ) -> SqliftResult<StatementResult> {
        let mut compiler = ExpressionCompiler::new(
            self.dialect.as_ref(),
            existing_parameter_count,
            parameter_name_prefix,
        )?;
        let mut parameters = ParameterMap::new();

        let mut columns = Vec::with_capacity(self.values.len());
        let mut placeholders = Vec::with_capacity(self.values.len());
        for (member, value) in &self.values {
            columns.push(resolve_column::<T>(member, self.dialect.as_ref())?);
            placeholders
                .push(compiler.expression_value(&Expr::Constant(value.clone()), &mut parameters)?);
        }

        let table = self.table_override.as_deref().unwrap_or(T::table_name());
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.dialect.quote_table(table, None),
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(StatementResult { sql, parameters })
    }
}

/// An UPDATE statement builder.
pub struct Update<T: Schema> {
    table_override: Option<String>,
    dialect: Arc<dyn SqlDialect>,
    values: Vec<(String, Value)>,
    filters: Vec<Expr>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Schema> Update<T> {
    /// Creates an update of `T`'s table.
    pub fn new<D: SqlDialect + 'static>(dialect: D) -> Self {
        Self {
            table_override: None,
            dialect: Arc::new(dialect),
            values: Vec::new(),
            filters: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Overrides the target table name.
    #[must_use]
    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.table_override = Some(table.into());
        self
    }

    /// Sets a member value.
    #[must_use]
    pub fn set(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((member.into(), value.into()));
        self
    }

    /// Adds a filter predicate. Successive filters AND-compose.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Compiles the statement. An update without filters applies to every
    /// row.
    pub fn to_sql(&self) -> SqliftResult<StatementResult> {
        let prefix = settings::current().parameter_prefix;
        self.to_sql_with(0, &prefix)
    }

    /// Compiles, numbering parameters after `existing_parameter_count`.
    pub fn to_sql_with(
        &self,
        existing_parameter_count: usize,
        parameter_name_prefix: &str,
    ) -> SqliftResult<StatementResult> {
        let mut compiler = ExpressionCompiler::new(
            self.dialect.as_ref(),
            existing_parameter_count,
            parameter_name_prefix,
        )?;
        let mut parameters = ParameterMap::new();

        let mut assignments = Vec::with_capacity(self.values.len());
        for (member, value) in &self.values {
            let column = resolve_column::<T>(member, self.dialect.as_ref())?;
            let placeholder =
                compiler.expression_value(&Expr::Constant(value.clone()), &mut parameters)?;
            assignments.push(format!("{column} = {placeholder}"));
        }

        let table = self.table_override.as_deref().unwrap_or(T::table_name());
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.dialect.quote_table(table, None),
            assignments.join(", ")
        );
        if !self.filters.is_empty() {
            let where_sql = compiler.compile(&self.filters, &mut parameters, false)?;
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok(StatementResult { sql, parameters })
    }
}

/// A DELETE statement builder.
pub struct Delete<T: Schema> {
    table_override: Option<String>,
    dialect: Arc<dyn SqlDialect>,
    filters: Vec<Expr>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Schema> Delete<T> {
    /// Creates a delete from `T`'s table.
    pub fn new<D: SqlDialect + 'static>(dialect: D) -> Self {
        Self {
            table_override: None,
            dialect: Arc::new(dialect),
            filters: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Overrides the target table name.
    #[must_use]
    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.table_override = Some(table.into());
        self
    }

    /// Adds a filter predicate. Successive filters AND-compose.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Compiles the statement. A delete without filters applies to every
    /// row.
    pub fn to_sql(&self) -> SqliftResult<StatementResult> {
        let prefix = settings::current().parameter_prefix;
        self.to_sql_with(0, &prefix)
    }

    /// Compiles, numbering parameters after `existing_parameter_count`.
    pub fn to_sql_with(
        &self,
        existing_parameter_count: usize,
        parameter_name_prefix: &str,
    ) -> SqliftResult<StatementResult> {
        let mut compiler = ExpressionCompiler::new(
            self.dialect.as_ref(),
            existing_parameter_count,
            parameter_name_prefix,
        )?;
        let mut parameters = ParameterMap::new();

        let table = self.table_override.as_deref().unwrap_or(T::table_name());
        let mut sql = format!("DELETE FROM {}", self.dialect.quote_table(table, None));
        if !self.filters.is_empty() {
            let where_sql = compiler.compile(&self.filters, &mut parameters, false)?;
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok(StatementResult { sql, parameters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{field, lambda, lit};
    use crate::dialect::{MssqlDialect, SqliteDialect};
    use crate::schema::{ColumnDef, ColumnType};

    struct Person;

    impl Schema for Person {
        fn table_name() -> &'static str {
            "Person"
        }

        fn columns() -> &'static [ColumnDef] {
            const COLUMNS: &[ColumnDef] = &[
                ColumnDef::new("ID", ColumnType::Int),
                ColumnDef::new("FirstName", ColumnType::Text),
                ColumnDef::new("IsEmployed", ColumnType::Bool).renamed("Is_Employed"),
            ];
            COLUMNS
        }
    }

    #[test]
    fn test_insert() {
        let result = Insert::<Person>::new(MssqlDialect::new())
            .set("FirstName", "Chris")
            .set("IsEmployed", true)
            .to_sql()
            .unwrap();
        assert_eq!(
            result.sql,
            "INSERT INTO [Person] ([FirstName], [Is_Employed]) VALUES (@sqlift_1, @sqlift_2)"
        );
        assert_eq!(result.parameters.get("@sqlift_1"), Some(&Value::String("Chris".into())));
        assert_eq!(result.parameters.get("@sqlift_2"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_insert_null_is_literal() {
        let result = Insert::<Person>::new(MssqlDialect::new())
            .set("FirstName", Value::Null)
            .to_sql()
            .unwrap();
        assert_eq!(result.sql, "INSERT INTO [Person] ([FirstName]) VALUES (NULL)");
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_insert_unknown_member_rejected() {
        let err = Insert::<Person>::new(MssqlDialect::new())
            .set("Nope", 1)
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, SqliftError::MissingMember(_)));
    }

    #[test]
    fn test_update_with_filter() {
        let result = Update::<Person>::new(MssqlDialect::new())
            .set("FirstName", "Updated")
            .filter(lambda(["x"], field::<Person>("x", "ID").eq(lit(1))))
            .to_sql()
            .unwrap();
        assert_eq!(
            result.sql,
            "UPDATE [Person] SET [FirstName] = @sqlift_1 WHERE [ID] = @sqlift_2"
        );
        assert_eq!(result.parameters.len(), 2);
    }

    #[test]
    fn test_update_without_filter_touches_all_rows() {
        let result = Update::<Person>::new(MssqlDialect::new())
            .set("IsEmployed", false)
            .to_sql()
            .unwrap();
        assert_eq!(result.sql, "UPDATE [Person] SET [Is_Employed] = @sqlift_1");
    }

    #[test]
    fn test_delete() {
        let result = Delete::<Person>::new(MssqlDialect::new())
            .filter(lambda(["x"], field::<Person>("x", "ID").eq(lit(3))))
            .to_sql()
            .unwrap();
        assert_eq!(result.sql, "DELETE FROM [Person] WHERE [ID] = @sqlift_1");
        assert_eq!(result.parameters.get("@sqlift_1"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_sqlite_value_conversion_applies() {
        let result = Insert::<Person>::new(SqliteDialect::new())
            .set("IsEmployed", true)
            .to_sql()
            .unwrap();
        assert_eq!(
            result.sql,
            "INSERT INTO \"Person\" (\"Is_Employed\") VALUES (@sqlift_1)"
        );
        assert_eq!(result.parameters.get("@sqlift_1"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_table_override() {
        let result = Delete::<Person>::new(MssqlDialect::new())
            .into_table("PersonArchive")
            .to_sql()
            .unwrap();
        assert_eq!(result.sql, "DELETE FROM [PersonArchive]");
    }
}
