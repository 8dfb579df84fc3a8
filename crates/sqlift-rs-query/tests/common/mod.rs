//! Shared schema fixtures for the integration suites.
#![allow(dead_code)]

use sqlift_rs_query::schema::{ColumnDef, ColumnType, Schema};

/// The main test table, exercising column renames, nullability, and a
/// column name containing spaces.
pub struct Person;

impl Schema for Person {
    fn table_name() -> &'static str {
        "Person"
    }

    fn columns() -> &'static [ColumnDef] {
        const COLUMNS: &[ColumnDef] = &[
            ColumnDef::new("ID", ColumnType::Int),
            ColumnDef::new("FirstName", ColumnType::Text),
            ColumnDef::new("LastName", ColumnType::Text),
            ColumnDef::new("Age", ColumnType::Int).nullable(),
            ColumnDef::new("IsEmployed", ColumnType::Bool).renamed("Is_Employed"),
            ColumnDef::new("ParentID", ColumnType::Int).nullable(),
            ColumnDef::new("ColumnWithSpaces", ColumnType::Text).renamed("Column With Spaces"),
        ];
        COLUMNS
    }
}

pub struct ParentPerson;

impl Schema for ParentPerson {
    fn table_name() -> &'static str {
        "ParentPerson"
    }

    fn columns() -> &'static [ColumnDef] {
        const COLUMNS: &[ColumnDef] = &[
            ColumnDef::new("ID", ColumnType::Int),
            ColumnDef::new("FirstName", ColumnType::Text),
            ColumnDef::new("LastName", ColumnType::Text),
        ];
        COLUMNS
    }
}

pub struct Car;

impl Schema for Car {
    fn table_name() -> &'static str {
        "Car"
    }

    fn columns() -> &'static [ColumnDef] {
        const COLUMNS: &[ColumnDef] = &[
            ColumnDef::new("Id", ColumnType::Int),
            ColumnDef::new("Make", ColumnType::Text),
            ColumnDef::new("ParentId", ColumnType::Int),
        ];
        COLUMNS
    }
}

/// A table whose element type carries no column metadata: selects compile
/// to `*`.
pub struct AuditEntry;

impl Schema for AuditEntry {
    fn table_name() -> &'static str {
        "AuditEntry"
    }
}

/// Join result shapes. These carry no column metadata of their own; their
/// select lists derive from result selectors or explicit projections.
pub struct PersonWithParent;

impl Schema for PersonWithParent {
    fn table_name() -> &'static str {
        "PersonWithParent"
    }
}

pub struct CarWithOwner;

impl Schema for CarWithOwner {
    fn table_name() -> &'static str {
        "CarWithOwner"
    }
}

/// Element type for derived-table (subquery-sourced) queries.
pub struct FirstNameRow;

impl Schema for FirstNameRow {
    fn table_name() -> &'static str {
        "FirstNameRow"
    }

    fn columns() -> &'static [ColumnDef] {
        const COLUMNS: &[ColumnDef] = &[ColumnDef::new("FirstName", ColumnType::Text)];
        COLUMNS
    }
}
