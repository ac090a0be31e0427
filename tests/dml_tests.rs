use qsql::{
    Configuration, Expression, NumericExpression, QueryError, SqlDeleteClause, SqlInsertClause,
    SqlTemplates, SqlUpdateClause, StringExpression, Value,
};

qsql::table! {
    pub struct QCompanies("COMPANIES") {
        id: i64 => "ID",
        name: String => "NAME",
    }
}

fn h2() -> Configuration {
    Configuration::new(SqlTemplates::h2())
}

#[test]
fn test_insert() {
    let configuration = h2();
    let c = QCompanies::new("c");
    let bindings = SqlInsertClause::new(&configuration, &c)
        .set(&c.id, 1)
        .set(&c.name, "acme")
        .to_sql()
        .unwrap();

    assert_eq!(bindings.sql, "insert into COMPANIES (ID, NAME)\nvalues (?, ?)");
    assert_eq!(
        bindings.constants,
        vec![Value::Int(1), Value::Text("acme".to_string())]
    );
}

#[test]
fn test_insert_replaces_repeated_column() {
    let configuration = h2();
    let c = QCompanies::new("c");
    let bindings = SqlInsertClause::new(&configuration, &c)
        .set(&c.name, "first")
        .set(&c.name, "second")
        .to_sql()
        .unwrap();

    assert_eq!(bindings.sql, "insert into COMPANIES (NAME)\nvalues (?)");
    assert_eq!(bindings.constants, vec![Value::Text("second".to_string())]);
}

#[test]
fn test_insert_without_columns_fails() {
    let configuration = h2();
    let c = QCompanies::new("c");
    assert_eq!(
        SqlInsertClause::new(&configuration, &c).to_sql(),
        Err(QueryError::EmptyClause {
            clause: "insert",
            table: "COMPANIES".to_string()
        })
    );
}

#[test]
fn test_update_uses_unqualified_columns() {
    let configuration = Configuration::new(SqlTemplates::postgres());
    let c = QCompanies::new("c");
    let bindings = SqlUpdateClause::new(&configuration, &c)
        .set(&c.name, c.name.upper())
        .set(&c.id, c.id.add(100))
        .where_(c.id.lt(10))
        .where_(c.name.like("a%"))
        .to_sql()
        .unwrap();

    assert_eq!(
        bindings.sql,
        "update COMPANIES\nset NAME = upper(NAME), ID = ID + $1\nwhere ID < $2 and NAME like $3"
    );
    assert_eq!(
        bindings.constants,
        vec![Value::Int(100), Value::Int(10), Value::Text("a%".to_string())]
    );
}

#[test]
fn test_update_without_where_targets_whole_table() {
    let configuration = h2();
    let c = QCompanies::new("c");
    let bindings = SqlUpdateClause::new(&configuration, &c)
        .set(&c.name, "x")
        .to_sql()
        .unwrap();
    assert_eq!(bindings.sql, "update COMPANIES\nset NAME = ?");
}

#[test]
fn test_delete() {
    let configuration = h2();
    let c = QCompanies::new("c");

    let filtered = SqlDeleteClause::new(&configuration, &c)
        .where_(c.id.in_list([1, 2, 3]))
        .to_sql()
        .unwrap();
    assert_eq!(filtered.sql, "delete from COMPANIES\nwhere ID in (?, ?, ?)");
    assert_eq!(filtered.constants.len(), 3);

    let everything = SqlDeleteClause::new(&configuration, &c).to_sql().unwrap();
    assert_eq!(everything.sql, "delete from COMPANIES");
}

#[test]
fn test_single_line_delete() {
    let mut templates = SqlTemplates::cubrid();
    templates.new_line_to_single_space();
    let configuration = Configuration::new(templates);
    let c = QCompanies::new("c");

    let bindings = SqlDeleteClause::new(&configuration, &c)
        .where_(c.name.is_null())
        .to_sql()
        .unwrap();
    assert_eq!(bindings.sql, "delete from COMPANIES where NAME is null");
}
