use qsql::{
    Configuration, Expression, QueryError, QueryMetadata, SqlQuery, SqlTemplates,
    TableSource,
};

qsql::table! {
    /// Employees of a company
    pub struct QEmployees("EMPLOYEES") {
        id: i64 => "ID",
        company_id: i64 => "COMPANY_ID",
        name: String => "NAME",
    }
}

#[test]
fn test_generated_table() {
    let e = QEmployees::new("e");
    assert_eq!(e.table().name(), "EMPLOYEES");
    assert_eq!(e.table().alias(), "e");
    assert_eq!(e.table().columns(), &["ID", "COMPANY_ID", "NAME"]);
    assert_eq!(e.company_id.path().to_string(), "e.COMPANY_ID");

    let configuration = Configuration::new(SqlTemplates::h2());
    let bindings = SqlQuery::new(&configuration)
        .from(&e)
        .to_sql(e.all_columns())
        .unwrap();
    assert_eq!(bindings.sql, "select e.ID, e.COMPANY_ID, e.NAME\nfrom EMPLOYEES e");
}

#[test]
fn test_errors_are_deferred_to_terminal_operation() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let e = QEmployees::new("e");

    let query = SqlQuery::new(&configuration)
        .where_(e.id.eq(1))
        .from(&e)
        .where_(e.name.eq("x"));
    let expected = QueryError::UnknownSource {
        alias: "e".to_string(),
        column: "ID".to_string(),
    };
    assert_eq!(query.to_sql(&e.name), Err(expected.clone()));
    assert_eq!(query.count_sql(), Err(expected));
}

#[test]
fn test_no_validation_accepts_any_order() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let e = QEmployees::new("e");

    let bindings = SqlQuery::with_metadata(&configuration, QueryMetadata::new().no_validate())
        .where_(e.id.eq(1))
        .from(&e)
        .to_sql(&e.name)
        .unwrap();
    assert_eq!(bindings.sql, "select e.NAME\nfrom EMPLOYEES e\nwhere e.ID = ?");
}

#[test]
fn test_join_condition_requires_join() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let e = QEmployees::new("e");

    let query = SqlQuery::with_metadata(&configuration, QueryMetadata::new().no_validate())
        .on(e.id.eq(1))
        .from(&e);
    assert_eq!(query.to_sql(&e.name), Err(QueryError::ConditionWithoutJoin));
}

#[test]
fn test_self_join_with_distinct_aliases() {
    let configuration = Configuration::new(SqlTemplates::postgres());
    let e = QEmployees::new("e");
    let boss = QEmployees::new("boss");

    let bindings = SqlQuery::new(&configuration)
        .from(&e)
        .left_join(&boss)
        .on(boss.id.eq(&e.company_id))
        .where_(e.name.ne("nobody"))
        .order_by(boss.name.desc())
        .to_sql((&e.name, boss.name.coalesce("-")))
        .unwrap();
    assert_eq!(
        bindings.sql,
        "select e.NAME, coalesce(boss.NAME, $1)\nfrom EMPLOYEES e\nleft join EMPLOYEES boss\non boss.ID = e.COMPANY_ID\nwhere e.NAME <> $2\norder by boss.NAME desc"
    );
    assert_eq!(bindings.constants.len(), 2);
}

#[test]
fn test_projection_is_per_call() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let e = QEmployees::new("e");
    let query = SqlQuery::new(&configuration).from(&e);

    let first = query.to_sql(&e.id).unwrap();
    let second = query.to_sql(vec![e.name.to_expr()]).unwrap();
    assert_eq!(first.sql, "select e.ID\nfrom EMPLOYEES e");
    assert_eq!(second.sql, "select e.NAME\nfrom EMPLOYEES e");
    assert!(query.metadata().projection().is_empty());
}
