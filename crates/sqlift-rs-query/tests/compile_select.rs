//! End-to-end select compilation against the reference dialect: default
//! select lists, filters, paging shapes, and parameter numbering.

mod common;

use common::{AuditEntry, Person};
use sqlift_rs_core::SqliftError;
use sqlift_rs_query::ast::{field, lambda, lit, null, projection};
use sqlift_rs_query::dialect::{
    MssqlDialect, MysqlDialect, OracleDialect, PostgresDialect, SqliteDialect,
};
use sqlift_rs_query::query::Select;
use sqlift_rs_query::value::Value;

const PERSON_COLUMNS: &str = "[ID], [FirstName], [LastName], [Age], [Is_Employed] AS \
                              [IsEmployed], [ParentID], [Column With Spaces] AS [ColumnWithSpaces]";

#[test]
fn default_select_lists_every_included_column() {
    let result = Select::<Person>::new(MssqlDialect::new()).to_sql().unwrap();
    assert_eq!(result.table, "[Person]");
    assert_eq!(
        result.select,
        vec![
            "[ID]",
            "[FirstName]",
            "[LastName]",
            "[Age]",
            "[Is_Employed] AS [IsEmployed]",
            "[ParentID]",
            "[Column With Spaces] AS [ColumnWithSpaces]",
        ]
    );
    assert_eq!(
        result.to_query(),
        format!("SELECT {PERSON_COLUMNS} FROM [Person]")
    );
}

#[test]
fn schema_without_metadata_selects_star() {
    let result = Select::<AuditEntry>::new(MssqlDialect::new())
        .to_sql()
        .unwrap();
    assert_eq!(result.select, vec!["*"]);
    assert_eq!(result.to_query(), "SELECT * FROM [AuditEntry]");
}

#[test]
fn table_override_replaces_schema_name() {
    let result = Select::<Person>::with_table("PersonTableOverride", MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "Age").eq(lit(12))))
        .to_sql()
        .unwrap();
    assert_eq!(result.table, "[PersonTableOverride]");
    assert_eq!(result.where_clause.as_deref(), Some("[Age] = @sqlift_1"));
}

#[test]
fn successive_filters_and_compose() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "Age").eq(lit(12))))
        .filter(lambda(
            ["x"],
            field::<Person>("x", "FirstName").starts_with("Ar"),
        ))
        .to_sql()
        .unwrap();
    assert_eq!(
        result.where_clause.as_deref(),
        Some("[Age] = @sqlift_1 AND [FirstName] LIKE @sqlift_2")
    );
    assert_eq!(result.parameters.get("@sqlift_1"), Some(&Value::Int(12)));
    assert_eq!(
        result.parameters.get("@sqlift_2"),
        Some(&Value::String("Ar%".to_string()))
    );
}

#[test]
fn null_comparisons_have_no_parameters() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "FirstName").eq(null())))
        .to_sql()
        .unwrap();
    assert_eq!(result.where_clause.as_deref(), Some("[FirstName] IS NULL"));
    assert!(result.parameters.is_empty());

    let result = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "FirstName").ne(null())))
        .to_sql()
        .unwrap();
    assert_eq!(
        result.where_clause.as_deref(),
        Some("[FirstName] IS NOT NULL")
    );
    assert!(result.parameters.is_empty());
}

#[test]
fn containment_round_trip() {
    let seq = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
    let result = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(
            ["x"],
            field::<Person>("x", "Age").in_list(seq.clone()),
        ))
        .to_sql()
        .unwrap();
    assert_eq!(result.where_clause.as_deref(), Some("[Age] IN @sqlift_1"));
    assert_eq!(result.parameters.len(), 1);
    assert_eq!(
        result.parameters.get("@sqlift_1"),
        Some(&Value::List(seq))
    );
}

#[test]
fn projection_narrows_select_list() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .select(lambda(["x"], field::<Person>("x", "FirstName")))
        .filter(lambda(["x"], field::<Person>("x", "Age").lt(lit(10))))
        .to_sql()
        .unwrap();
    assert_eq!(result.select, vec!["[FirstName]"]);
    assert_eq!(result.where_clause.as_deref(), Some("[Age] < @sqlift_1"));
}

#[test]
fn projection_with_computed_member() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .select(lambda(
            ["x"],
            projection([(
                "FirstName",
                field::<Person>("x", "FirstName").to_upper(),
            )]),
        ))
        .to_sql()
        .unwrap();
    assert_eq!(result.select, vec!["UCASE([FirstName]) AS [FirstName]"]);
}

#[test]
fn ordering_accumulates_with_then_by() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .order_by(lambda(["x"], field::<Person>("x", "LastName")))
        .then_by_descending(lambda(["x"], field::<Person>("x", "Age")))
        .to_sql()
        .unwrap();
    assert_eq!(result.order_by, vec!["[LastName]", "[Age] DESC"]);
}

#[test]
fn fresh_order_by_discards_prior_ordering() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .order_by(lambda(["x"], field::<Person>("x", "LastName")))
        .order_by(lambda(["x"], field::<Person>("x", "ID")))
        .to_sql()
        .unwrap();
    assert_eq!(result.order_by, vec!["[ID]"]);
}

// ── Paging ───────────────────────────────────────────────────────────

#[test]
fn take_alone_compiles_to_top() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .take(15)
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        format!("SELECT TOP 15 {PERSON_COLUMNS} FROM [Person]")
    );
}

#[test]
fn distinct_take_compiles_to_distinct_top() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .select(lambda(["x"], field::<Person>("x", "FirstName")))
        .distinct()
        .take(10)
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        "SELECT DISTINCT TOP 10 [FirstName] FROM [Person]"
    );
}

#[test]
fn skip_rewrites_to_row_number_cte() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .order_by(lambda(["x"], field::<Person>("x", "ID")))
        .skip(15)
        .unwrap()
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        format!(
            "WITH sqlift_data_set AS (SELECT {PERSON_COLUMNS}, ROW_NUMBER() OVER (ORDER BY \
             [ID]) AS [sqlift_row_number] FROM [Person]) SELECT * FROM sqlift_data_set WHERE \
             [sqlift_row_number] >= 16"
        )
    );
}

#[test]
fn skip_and_take_compile_to_between() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .order_by(lambda(["x"], field::<Person>("x", "Age")))
        .skip(20)
        .unwrap()
        .take(10)
        .to_sql()
        .unwrap();
    let sql = result.to_query();
    assert!(
        sql.ends_with("WHERE [sqlift_row_number] BETWEEN 21 AND 30"),
        "unexpected paging tail: {sql}"
    );
    assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY [Age])"));
}

#[test]
fn skip_without_ordering_is_rejected() {
    let err = Select::<Person>::new(MssqlDialect::new()).skip(5).unwrap_err();
    assert!(matches!(err, SqliftError::InvalidPagingRequest(_)));
}

#[test]
fn skip_sees_ordering_from_an_ancestor() {
    // Ordering lives on the pre-group builder; skip on the derived stage
    // must still see it through the chain.
    let grouped = Select::<Person>::new(MssqlDialect::new())
        .order_by(lambda(["x"], field::<Person>("x", "Age")))
        .group_by(lambda(["x"], field::<Person>("x", "Age")));
    assert!(grouped.skip(5).is_ok());
}

// ── Parameter numbering ──────────────────────────────────────────────

#[test]
fn offset_shifts_every_placeholder() {
    let build = || {
        Select::<Person>::new(MssqlDialect::new())
            .filter(lambda(["x"], field::<Person>("x", "Age").ge(lit(18))))
            .filter(lambda(
                ["x"],
                field::<Person>("x", "FirstName").starts_with("C"),
            ))
    };

    let base = build().to_sql_with(0, "sqlift_").unwrap();
    let shifted = build().to_sql_with(2, "sqlift_").unwrap();

    assert_eq!(
        base.where_clause.as_deref(),
        Some("[Age] >= @sqlift_1 AND [FirstName] LIKE @sqlift_2")
    );
    assert_eq!(
        shifted.where_clause.as_deref(),
        Some("[Age] >= @sqlift_3 AND [FirstName] LIKE @sqlift_4")
    );

    // The shifted result is the base result with every index moved by 2.
    let expected = base
        .where_clause
        .unwrap()
        .replace("@sqlift_1", "@sqlift_3")
        .replace("@sqlift_2", "@sqlift_4");
    assert_eq!(shifted.where_clause.as_deref(), Some(expected.as_str()));
}

#[test]
fn compilation_is_idempotent() {
    let query = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "Age").ge(lit(18))))
        .order_by(lambda(["x"], field::<Person>("x", "ID")));

    let first = query.to_sql().unwrap();
    let second = query.to_sql().unwrap();
    assert_eq!(first.to_query(), second.to_query());
    assert_eq!(first.parameters, second.parameters);
}

#[test]
fn custom_prefix_applies_to_every_parameter() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "Age").eq(lit(12))))
        .to_sql_with(0, "test")
        .unwrap();
    assert_eq!(result.where_clause.as_deref(), Some("[Age] = @test1"));
    assert_eq!(result.parameters.get("@test1"), Some(&Value::Int(12)));
}

// ── Other dialects ───────────────────────────────────────────────────

#[test]
fn sqlite_uses_limit_offset() {
    let result = Select::<Person>::new(SqliteDialect::new())
        .select(lambda(["x"], field::<Person>("x", "FirstName")))
        .order_by(lambda(["x"], field::<Person>("x", "FirstName")))
        .skip(20)
        .unwrap()
        .take(10)
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        "SELECT \"FirstName\" FROM \"Person\" ORDER BY \"FirstName\" LIMIT 10 OFFSET 20"
    );
}

#[test]
fn postgres_uses_limit_offset() {
    let result = Select::<Person>::new(PostgresDialect::new())
        .select(lambda(["x"], field::<Person>("x", "FirstName")))
        .order_by(lambda(["x"], field::<Person>("x", "FirstName")))
        .skip(5)
        .unwrap()
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        "SELECT \"FirstName\" FROM \"Person\" ORDER BY \"FirstName\" OFFSET 5"
    );
}

#[test]
fn mysql_quotes_with_backticks() {
    let result = Select::<Person>::new(MysqlDialect::new())
        .select(lambda(["x"], field::<Person>("x", "FirstName")))
        .filter(lambda(["x"], field::<Person>("x", "Age").gt(lit(30))))
        .take(3)
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        "SELECT `FirstName` FROM `Person` WHERE `Age` > @sqlift_1 LIMIT 3"
    );
}

#[test]
fn oracle_uses_fetch_syntax_and_colon_prefix() {
    let result = Select::<Person>::new(OracleDialect::new())
        .select(lambda(["x"], field::<Person>("x", "FirstName")))
        .filter(lambda(["x"], field::<Person>("x", "Age").gt(lit(30))))
        .order_by(lambda(["x"], field::<Person>("x", "FirstName")))
        .skip(10)
        .unwrap()
        .take(5)
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        "SELECT \"FirstName\" FROM \"Person\" WHERE \"Age\" > :sqlift_1 ORDER BY \"FirstName\" \
         OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
    assert_eq!(result.parameters.get(":sqlift_1"), Some(&Value::Int(30)));
}

// ── Error reporting ──────────────────────────────────────────────────

#[test]
fn unknown_member_fails_with_missing_member() {
    let err = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "MiddleName").eq(lit("J"))))
        .to_sql()
        .unwrap_err();
    match err {
        SqliftError::MissingMember(msg) => assert!(msg.contains("MiddleName")),
        other => panic!("expected MissingMember, got {other}"),
    }
}

#[test]
fn count_query_drops_ordering_and_paging() {
    let result = Select::<Person>::new(MssqlDialect::new())
        .filter(lambda(["x"], field::<Person>("x", "Age").ge(lit(18))))
        .order_by(lambda(["x"], field::<Person>("x", "ID")))
        .take(10)
        .count()
        .to_sql()
        .unwrap();
    assert_eq!(
        result.to_query(),
        "SELECT COUNT(*) FROM [Person] WHERE [Age] >= @sqlift_1"
    );
}
