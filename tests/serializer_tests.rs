use qsql::templates::PREC_COMPARISON;
use qsql::{
    constant, count_all, Column, ColumnPath, Configuration, Expr, Expression, JoinType,
    NumericExpression, Op, QueryError, QueryMetadata, SqlQuery, SqlSerializer, SqlTemplates,
    StringExpression, Table, Value,
};

fn companies() -> (Table, Column<i64>, Column<String>) {
    let table = Table::new("COMPANIES", "COMPANIES");
    let id = table.column("ID");
    let name = table.column("NAME");
    (table, id, name)
}

fn lookup_metadata(predicate: qsql::Predicate) -> QueryMetadata {
    let (table, _, name) = companies();
    let mut metadata = QueryMetadata::new();
    metadata.add_join(JoinType::Default, table);
    metadata.add_where(predicate).unwrap();
    metadata.add_projection(name.to_expr()).unwrap();
    metadata
}

fn sql(templates: SqlTemplates, query: impl FnOnce(SqlQuery<'_>) -> SqlQuery<'_>) -> String {
    let configuration = Configuration::new(templates);
    let (table, _, name) = companies();
    query(SqlQuery::new(&configuration).from(&table))
        .to_sql(&name)
        .unwrap()
        .sql
}

#[test]
fn test_h2_lookup_by_id() {
    let (_, id, _) = companies();
    let templates = SqlTemplates::h2();
    let metadata = lookup_metadata(id.eq(1));

    let mut serializer = SqlSerializer::new(&templates);
    serializer.serialize(&metadata, false).unwrap();

    assert_eq!(
        serializer.to_string(),
        "select COMPANIES.NAME\nfrom COMPANIES COMPANIES\nwhere COMPANIES.ID = ?"
    );
    assert_eq!(serializer.constants(), &[Value::Int(1)]);
    assert_eq!(
        serializer.constant_paths(),
        &[Some(ColumnPath::new("COMPANIES", "ID"))]
    );
}

#[test]
fn test_constant_paths_follow_compared_column() {
    let (_, id, name) = companies();
    let templates = SqlTemplates::h2();
    let metadata = lookup_metadata(id.in_list([1, 2]).and(name.like("A%")));

    let mut serializer = SqlSerializer::new(&templates);
    serializer.serialize(&metadata, false).unwrap();

    assert_eq!(
        serializer.sql(),
        "select COMPANIES.NAME\nfrom COMPANIES COMPANIES\nwhere COMPANIES.ID in (?, ?) and COMPANIES.NAME like ?"
    );
    let id_path = Some(ColumnPath::new("COMPANIES", "ID"));
    let name_path = Some(ColumnPath::new("COMPANIES", "NAME"));
    assert_eq!(
        serializer.constant_paths(),
        &[id_path.clone(), id_path, name_path]
    );
}

#[test]
fn test_normalization_folds_constant_arithmetic() {
    let (_, id, _) = companies();
    let templates = SqlTemplates::h2();
    let metadata = lookup_metadata(id.eq(constant(1_i64).add(2)));

    let mut normalized = SqlSerializer::new(&templates);
    normalized.serialize(&metadata, false).unwrap();
    assert!(normalized.sql().ends_with("where COMPANIES.ID = ?"));
    assert_eq!(normalized.constants(), &[Value::Int(3)]);

    let mut plain = SqlSerializer::new(&templates);
    plain.set_normalize(false);
    plain.serialize(&metadata, false).unwrap();
    assert!(plain.sql().ends_with("where COMPANIES.ID = ? + ?"));
    assert_eq!(plain.constants(), &[Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_overflowing_arithmetic_is_not_folded() {
    let (_, id, _) = companies();
    let templates = SqlTemplates::h2();
    let metadata = lookup_metadata(id.eq(constant(i64::MAX).add(1)));

    let mut serializer = SqlSerializer::new(&templates);
    serializer.serialize(&metadata, false).unwrap();
    assert!(serializer.sql().ends_with("where COMPANIES.ID = ? + ?"));
    assert_eq!(serializer.constants().len(), 2);
}

#[test]
fn test_normalization_removes_double_negation() {
    let (_, id, _) = companies();
    let templates = SqlTemplates::h2();
    let metadata = lookup_metadata(id.eq(1).not().not());

    let mut serializer = SqlSerializer::new(&templates);
    serializer.serialize(&metadata, false).unwrap();
    assert!(serializer.sql().ends_with("where COMPANIES.ID = ?"));
}

#[test]
fn test_double_negation_keeps_operand_parentheses() {
    let (_, id, name) = companies();
    let predicate = || id.eq(1).or(name.eq("a")).not().not().and(id.gt(5));

    let rendered = sql(SqlTemplates::h2(), |q| q.where_(predicate()));
    assert!(rendered.ends_with(
        "where (COMPANIES.ID = ? or COMPANIES.NAME = ?) and COMPANIES.ID > ?"
    ));

    let nested = sql(SqlTemplates::h2(), |q| {
        q.where_(id.gt(5).and(id.eq(1).or(name.eq("a")).not().not().not().not()))
    });
    assert!(nested.ends_with(
        "where COMPANIES.ID > ? and (COMPANIES.ID = ? or COMPANIES.NAME = ?)"
    ));

    let templates = SqlTemplates::h2();
    let mut serializer = SqlSerializer::new(&templates);
    serializer.set_normalize(false);
    serializer
        .serialize(&lookup_metadata(predicate()), false)
        .unwrap();
    assert!(serializer.sql().ends_with(
        "where not (not (COMPANIES.ID = ? or COMPANIES.NAME = ?)) and COMPANIES.ID > ?"
    ));
}

#[test]
fn test_empty_in_list() {
    let (_, id, _) = companies();
    let none = sql(SqlTemplates::h2(), |q| q.where_(id.in_list(Vec::<i64>::new())));
    assert!(none.ends_with("\nwhere 1 = 2"));

    let all = sql(SqlTemplates::h2(), |q| q.where_(id.not_in(Vec::<i64>::new())));
    assert!(all.ends_with("\nwhere 1 = 1"));
}

#[test]
fn test_precedence_decides_parentheses() {
    let (_, id, name) = companies();
    let rendered = sql(SqlTemplates::h2(), |q| {
        q.where_(id.eq(1).or(name.eq("a")).and(id.gt(5)))
    });
    assert!(rendered.ends_with(
        "where (COMPANIES.ID = ? or COMPANIES.NAME = ?) and COMPANIES.ID > ?"
    ));

    let chained = sql(SqlTemplates::h2(), |q| {
        q.where_(id.gt(1).and(id.lt(9)).and(name.is_not_null()))
    });
    assert!(chained.ends_with(
        "where COMPANIES.ID > ? and COMPANIES.ID < ? and COMPANIES.NAME is not null"
    ));

    let arithmetic = sql(SqlTemplates::h2(), |q| {
        q.where_(id.add(1).mul(2).gt(id.sub(id.sub(3))))
    });
    assert!(arithmetic.ends_with(
        "where (COMPANIES.ID + ?) * ? > COMPANIES.ID - (COMPANIES.ID - ?)"
    ));
}

#[test]
fn test_functions_never_parenthesize_operands() {
    let (_, id, name) = companies();
    let rendered = sql(SqlTemplates::h2(), |q| {
        q.where_(name.lower().eq("acme").and(id.coalesce(0).between(1, 10)))
    });
    assert!(rendered.ends_with(
        "where lower(COMPANIES.NAME) = ? and coalesce(COMPANIES.ID, ?) between ? and ?"
    ));
}

#[test]
fn test_joins() {
    let companies = Table::new("COMPANIES", "c");
    let employees = Table::new("EMPLOYEES", "e");
    let company_id: Column<i64> = companies.column("ID");
    let company_name: Column<String> = companies.column("NAME");
    let employer: Column<i64> = employees.column("COMPANY_ID");
    let employee_name: Column<String> = employees.column("NAME");
    let configuration = Configuration::new(SqlTemplates::h2());

    let bindings = SqlQuery::new(&configuration)
        .from(&companies)
        .inner_join(&employees)
        .on(employer.eq(&company_id))
        .where_(company_id.eq(7))
        .to_sql((&company_name, &employee_name))
        .unwrap();
    assert_eq!(
        bindings.sql,
        "select c.NAME, e.NAME\nfrom COMPANIES c\ninner join EMPLOYEES e\non e.COMPANY_ID = c.ID\nwhere c.ID = ?"
    );

    let cross = SqlQuery::new(&configuration)
        .from(&companies)
        .from(&employees)
        .left_join(&Table::new("OFFICES", "o"))
        .to_sql(&company_name)
        .unwrap();
    assert_eq!(
        cross.sql,
        "select c.NAME\nfrom COMPANIES c, EMPLOYEES e\nleft join OFFICES o"
    );
}

#[test]
fn test_grouping_and_aliases() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let (table, id, name) = companies();

    let bindings = SqlQuery::new(&configuration)
        .from(&table)
        .group_by(&name)
        .having(id.count().gt(1))
        .to_sql((&name, count_all().alias("total")))
        .unwrap();
    assert_eq!(
        bindings.sql,
        "select COMPANIES.NAME, count(*) as total\nfrom COMPANIES COMPANIES\ngroup by COMPANIES.NAME\nhaving count(COMPANIES.ID) > ?"
    );
}

#[test]
fn test_paging_per_dialect() {
    let paged = |templates: SqlTemplates, limit: Option<u64>, offset: Option<u64>| {
        sql(templates, |mut q| {
            if let Some(limit) = limit {
                q = q.limit(limit);
            }
            if let Some(offset) = offset {
                q = q.offset(offset);
            }
            q
        })
    };

    assert!(paged(SqlTemplates::h2(), Some(10), Some(20)).ends_with("\nlimit 10\noffset 20"));
    assert!(paged(SqlTemplates::h2(), None, Some(20)).ends_with("COMPANIES\noffset 20"));
    assert!(paged(SqlTemplates::postgres(), Some(5), None).ends_with("\nlimit 5"));
    assert!(paged(SqlTemplates::sqlite(), None, Some(20)).ends_with("\nlimit -1\noffset 20"));
    assert!(paged(SqlTemplates::mysql(), Some(10), Some(20)).ends_with("\nlimit 20, 10"));
    assert!(paged(SqlTemplates::mysql(), None, Some(20))
        .ends_with("\nlimit 20, 18446744073709551615"));
    assert!(paged(SqlTemplates::cubrid(), Some(10), None).ends_with("\nlimit 10"));
}

#[test]
fn test_order_by_nulls() {
    let (_, _, name) = companies();
    let native = sql(SqlTemplates::h2(), |q| q.order_by(name.asc().nulls_last()));
    assert!(native.ends_with("\norder by COMPANIES.NAME asc nulls last"));

    let emulated = sql(SqlTemplates::mysql(), |q| q.order_by(name.desc().nulls_first()));
    assert!(emulated.ends_with("\norder by COMPANIES.NAME is null desc, COMPANIES.NAME desc"));
}

#[test]
fn test_count_row_ignores_order_and_paging() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let (table, id, name) = companies();

    let bindings = SqlQuery::new(&configuration)
        .from(&table)
        .where_(id.gt(3))
        .order_by(name.asc())
        .limit(10)
        .count_sql()
        .unwrap();
    assert_eq!(
        bindings.sql,
        "select count(*)\nfrom COMPANIES COMPANIES\nwhere COMPANIES.ID > ?"
    );
    assert_eq!(bindings.constants, vec![Value::Int(3)]);
}

#[test]
fn test_distinct_count_uses_subquery() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let (table, _, name) = companies();

    let bindings = SqlQuery::new(&configuration)
        .from(&table)
        .count_distinct_sql(&name)
        .unwrap();
    assert_eq!(
        bindings.sql,
        "select count(*)\nfrom (select distinct COMPANIES.NAME\nfrom COMPANIES COMPANIES) internal"
    );

    let distinct = sql(SqlTemplates::h2(), |q| q.distinct());
    assert!(distinct.starts_with("select distinct COMPANIES.NAME\n"));
}

#[test]
fn test_grouped_count_uses_subquery() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let (table, id, name) = companies();

    let bindings = SqlQuery::new(&configuration)
        .from(&table)
        .where_(id.gt(3))
        .group_by(&name)
        .having(id.count().gt(1))
        .count_sql()
        .unwrap();
    assert_eq!(
        bindings.sql,
        "select count(*)\nfrom (select COMPANIES.NAME\nfrom COMPANIES COMPANIES\nwhere COMPANIES.ID > ?\ngroup by COMPANIES.NAME\nhaving count(COMPANIES.ID) > ?) internal"
    );
    assert_eq!(bindings.constants, vec![Value::Int(3), Value::Int(1)]);
}

#[test]
fn test_literals_are_inlined() {
    let configuration = Configuration::new(SqlTemplates::h2()).with_literals(true);
    let (table, id, name) = companies();

    let bindings = SqlQuery::new(&configuration)
        .from(&table)
        .where_(name.eq("O'Hara").and(id.eq(4)))
        .to_sql(&name)
        .unwrap();
    assert!(bindings
        .sql
        .ends_with("where COMPANIES.NAME = 'O''Hara' and COMPANIES.ID = 4"));
    assert!(bindings.constants.is_empty());
}

#[test]
fn test_postgres_numbered_placeholders() {
    let (_, id, name) = companies();
    let rendered = sql(SqlTemplates::postgres(), |q| {
        q.where_(id.eq(1).and(name.ne("x")))
    });
    assert!(rendered.ends_with("where COMPANIES.ID = $1 and COMPANIES.NAME <> $2"));
}

#[test]
fn test_mysql_concat_and_quoting() {
    let configuration = Configuration::new(SqlTemplates::mysql());
    let orders = Table::new("order", "o");
    let reference: Column<String> = orders.column("reference");

    let bindings = SqlQuery::new(&configuration)
        .from(&orders)
        .to_sql(reference.concat("-x"))
        .unwrap();
    assert_eq!(bindings.sql, "select concat(o.reference, ?)\nfrom `order` o");
}

#[test]
fn test_schema_and_quote_all() {
    let mut templates = SqlTemplates::h2();
    templates.set_print_schema(true).set_quote_all(true);
    let configuration = Configuration::new(templates);
    let table = Table::new("COMPANIES", "c").with_schema("PUBLIC");
    let id: Column<i64> = table.column("ID");

    let bindings = SqlQuery::new(&configuration)
        .from(&table)
        .to_sql(&id)
        .unwrap();
    assert_eq!(
        bindings.sql,
        "select \"c\".\"ID\"\nfrom \"PUBLIC\".\"COMPANIES\" \"c\""
    );
}

#[test]
fn test_custom_templates() {
    let (_, _, name) = companies();
    let mut templates = SqlTemplates::postgres();
    templates.add_template(Op::Like, "{0} ilike {1}", PREC_COMPARISON);
    let rendered = sql(templates, |q| q.where_(name.like("a%")));
    assert!(rendered.ends_with("where COMPANIES.NAME ilike $1"));

    let mut broken = SqlTemplates::h2();
    broken.add_template(Op::Eq, "{0} = {2}", PREC_COMPARISON);
    let configuration = Configuration::new(broken);
    let (table, id, name) = companies();
    let err = SqlQuery::new(&configuration)
        .from(&table)
        .where_(id.eq(1))
        .to_sql(&name)
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::TemplateArgument {
            op: Op::Eq,
            index: 2,
            arity: 2
        }
    );
}

#[test]
fn test_structural_errors() {
    let configuration = Configuration::new(SqlTemplates::h2());
    let (table, id, _) = companies();

    let empty = SqlQuery::new(&configuration)
        .from(&table)
        .to_sql(Vec::<Expr>::new());
    assert_eq!(empty, Err(QueryError::EmptyProjection));

    let unsourced = SqlQuery::with_metadata(&configuration, QueryMetadata::new().no_validate())
        .to_sql(&id);
    assert_eq!(unsourced, Err(QueryError::MissingFrom));
}

#[test]
fn test_failed_statement_restores_qualified_columns() {
    let mut broken = SqlTemplates::h2();
    broken.add_template(Op::Eq, "{0} = {2}", PREC_COMPARISON);
    let (table, id, _) = companies();

    let mut serializer = SqlSerializer::new(&broken);
    let err = serializer
        .serialize_delete(&table, Some(&id.eq(1).into_expr()))
        .unwrap_err();
    assert!(matches!(err, QueryError::TemplateArgument { .. }));

    serializer.serialize_expr(&id.to_expr()).unwrap();
    assert!(serializer.sql().ends_with("COMPANIES.ID"));
}
