//! Typed expression model
//!
//! Queries are assembled from typed handles (`Column<T>`, `TypedExpr<T>`,
//! `Predicate`) that lower into the untyped [`Expr`] tree the serializer walks.
//! The type parameter only exists at construction time: comparing a
//! `Column<i64>` against a `&str` does not compile.

use crate::value::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Operators understood by the templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Loe,
    /// `>`
    Gt,
    /// `>=`
    Goe,
    /// `is null`
    IsNull,
    /// `is not null`
    IsNotNull,
    /// `like`
    Like,
    /// `in (..)`
    In,
    /// `not in (..)`
    NotIn,
    /// `between .. and ..`
    Between,
    /// Conjunction, any number of operands
    And,
    /// Disjunction, any number of operands
    Or,
    /// Negation
    Not,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// String concatenation
    Concat,
    /// `lower(..)`
    Lower,
    /// `upper(..)`
    Upper,
    /// `count(..)`
    Count,
    /// `count(distinct ..)`
    CountDistinct,
    /// `count(*)`
    CountAll,
    /// `sum(..)`
    Sum,
    /// `min(..)`
    Min,
    /// `max(..)`
    Max,
    /// `avg(..)`
    Avg,
    /// `coalesce(..)`
    Coalesce,
}

impl Op {
    /// Arithmetic symbol for operators that can be folded
    #[must_use]
    pub const fn arithmetic_symbol(self) -> Option<char> {
        match self {
            Self::Add => Some('+'),
            Self::Sub => Some('-'),
            Self::Mul => Some('*'),
            Self::Div => Some('/'),
            _ => None,
        }
    }

    /// Whether the operator compares its first operand against the others
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::Ne
                | Self::Lt
                | Self::Loe
                | Self::Gt
                | Self::Goe
                | Self::Like
                | Self::In
                | Self::NotIn
                | Self::Between
        )
    }
}

/// A column reference through a table alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnPath {
    table: Arc<str>,
    column: Arc<str>,
}

impl ColumnPath {
    /// Create a path for `column` of the source aliased `table`
    #[must_use]
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: Arc::from(table),
            column: Arc::from(column),
        }
    }

    /// Alias of the owning source
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column name
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Untyped expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Path(ColumnPath),
    /// Bound or inlined constant
    Constant(Value),
    /// Parenthesized list, the right side of `in`
    List(Vec<Expr>),
    /// Operator application
    Operation {
        /// Operator
        op: Op,
        /// Operands
        args: Vec<Expr>,
    },
    /// Projection alias, `expr as alias`
    Alias {
        /// Aliased expression
        expr: Box<Expr>,
        /// Alias name
        alias: String,
    },
}

impl Expr {
    /// Constant expression
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    /// Operator application
    #[must_use]
    pub const fn operation(op: Op, args: Vec<Self>) -> Self {
        Self::Operation { op, args }
    }

    /// Call `f` for every column path in the tree, depth first
    pub fn visit_paths<'a, F: FnMut(&'a ColumnPath)>(&'a self, f: &mut F) {
        match self {
            Self::Path(path) => f(path),
            Self::Constant(_) => {}
            Self::List(items) | Self::Operation { args: items, .. } => {
                for item in items {
                    item.visit_paths(f);
                }
            }
            Self::Alias { expr, .. } => expr.visit_paths(f),
        }
    }
}

/// Flatten nested applications of the same variadic operator
fn combine(op: Op, lhs: Expr, rhs: Expr) -> Expr {
    let mut args = Vec::with_capacity(2);
    for operand in [lhs, rhs] {
        match operand {
            Expr::Operation { op: inner, args: nested } if inner == op => args.extend(nested),
            other => args.push(other),
        }
    }
    Expr::Operation { op, args }
}

/// Conjunction of an optional existing condition with a new one
pub(crate) fn combine_and(existing: Option<Expr>, expr: Expr) -> Expr {
    match existing {
        Some(current) => combine(Op::And, current, expr),
        None => expr,
    }
}

/// A table or view usable as a query source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    schema: Option<String>,
    name: String,
    alias: Arc<str>,
    columns: Vec<String>,
    primary_key: Vec<String>,
}

impl Table {
    /// Create a source for table `name` referenced as `alias`
    #[must_use]
    pub fn new(name: impl Into<String>, alias: &str) -> Self {
        Self {
            schema: None,
            name: name.into(),
            alias: Arc::from(alias),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Qualify the table with a schema
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Declare the column names of the table
    #[must_use]
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Declare the primary key columns, used as default merge keys
    #[must_use]
    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Typed handle for a column of this source
    #[must_use]
    pub fn column<T>(&self, name: &str) -> Column<T> {
        Column::new(ColumnPath {
            table: Arc::clone(&self.alias),
            column: Arc::from(name),
        })
    }

    /// Schema, if any
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Table name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias used to qualify columns
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Declared columns
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Primary key paths
    #[must_use]
    pub fn primary_key(&self) -> Vec<ColumnPath> {
        self.primary_key
            .iter()
            .map(|column| ColumnPath {
                table: Arc::clone(&self.alias),
                column: Arc::from(column.as_str()),
            })
            .collect()
    }
}

/// Anything that exposes a [`Table`], typically a struct generated by [`table!`](crate::table)
pub trait TableSource {
    /// The underlying table
    fn table(&self) -> &Table;
}

impl TableSource for Table {
    fn table(&self) -> &Table {
        self
    }
}

/// Typed column handle
pub struct Column<T> {
    path: ColumnPath,
    _type: PhantomData<fn() -> T>,
}

impl<T> Column<T> {
    /// Wrap a path
    #[must_use]
    pub const fn new(path: ColumnPath) -> Self {
        Self {
            path,
            _type: PhantomData,
        }
    }

    /// The underlying path
    #[must_use]
    pub const fn path(&self) -> &ColumnPath {
        &self.path
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self::new(self.path.clone())
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.path).finish()
    }
}

/// Typed wrapper around a computed expression
pub struct TypedExpr<T> {
    expr: Expr,
    _type: PhantomData<fn() -> T>,
}

impl<T> TypedExpr<T> {
    /// Wrap an untyped expression
    #[must_use]
    pub const fn new(expr: Expr) -> Self {
        Self {
            expr,
            _type: PhantomData,
        }
    }

    /// Unwrap into the untyped expression
    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<T> Clone for TypedExpr<T> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone())
    }
}

impl<T> fmt::Debug for TypedExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedExpr").field(&self.expr).finish()
    }
}

/// Boolean expression usable in where, having and join conditions
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate(Expr);

impl Predicate {
    /// Wrap an untyped boolean expression
    #[must_use]
    pub const fn new(expr: Expr) -> Self {
        Self(expr)
    }

    fn binary(op: Op, lhs: Expr, rhs: Expr) -> Self {
        Self(Expr::operation(op, vec![lhs, rhs]))
    }

    /// Both predicates hold
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self(combine(Op::And, self.0, other.0))
    }

    /// Either predicate holds
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self(combine(Op::Or, self.0, other.0))
    }

    /// Negation
    #[must_use]
    pub fn not(self) -> Self {
        Self(Expr::operation(Op::Not, vec![self.0]))
    }

    /// The underlying expression
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.0
    }

    /// Unwrap into the underlying expression
    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.0
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// Placement of nulls in an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// `nulls first`
    First,
    /// `nulls last`
    Last,
}

/// One entry of an order by clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpecifier {
    /// Sorted expression
    pub expr: Expr,
    /// Direction
    pub order: Order,
    /// Null placement, dialect default when unset
    pub nulls: Option<NullOrdering>,
}

impl OrderSpecifier {
    /// Sort nulls before other values
    #[must_use]
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullOrdering::First);
        self
    }

    /// Sort nulls after other values
    #[must_use]
    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullOrdering::Last);
        self
    }
}

/// Conversion of an operand into an expression of type `T`
pub trait IntoExpr<T> {
    /// Lower into the untyped tree
    fn into_expr(self) -> Expr;
}

macro_rules! literal_into_expr {
    ($target:ty: $($source:ty),+) => {
        $(
            impl IntoExpr<$target> for $source {
                fn into_expr(self) -> Expr {
                    Expr::Constant(Value::from(self))
                }
            }
        )+
    };
}

literal_into_expr!(i64: i64, i32);
literal_into_expr!(i32: i32);
literal_into_expr!(f64: f64);
literal_into_expr!(bool: bool);
literal_into_expr!(String: String, &str);

impl<T> IntoExpr<T> for Column<T> {
    fn into_expr(self) -> Expr {
        Expr::Path(self.path)
    }
}

impl<T> IntoExpr<T> for &Column<T> {
    fn into_expr(self) -> Expr {
        Expr::Path(self.path.clone())
    }
}

impl<T> IntoExpr<T> for TypedExpr<T> {
    fn into_expr(self) -> Expr {
        self.expr
    }
}

/// Marker for numeric column types
pub trait Numeric {}

impl Numeric for i64 {}
impl Numeric for i32 {}
impl Numeric for f64 {}

/// Operations available on every typed expression
pub trait Expression<T> {
    /// Lower into the untyped tree
    fn to_expr(&self) -> Expr;

    /// `self = rhs`
    fn eq(&self, rhs: impl IntoExpr<T>) -> Predicate {
        Predicate::binary(Op::Eq, self.to_expr(), rhs.into_expr())
    }

    /// `self <> rhs`
    fn ne(&self, rhs: impl IntoExpr<T>) -> Predicate {
        Predicate::binary(Op::Ne, self.to_expr(), rhs.into_expr())
    }

    /// `self < rhs`
    fn lt(&self, rhs: impl IntoExpr<T>) -> Predicate {
        Predicate::binary(Op::Lt, self.to_expr(), rhs.into_expr())
    }

    /// `self <= rhs`
    fn loe(&self, rhs: impl IntoExpr<T>) -> Predicate {
        Predicate::binary(Op::Loe, self.to_expr(), rhs.into_expr())
    }

    /// `self > rhs`
    fn gt(&self, rhs: impl IntoExpr<T>) -> Predicate {
        Predicate::binary(Op::Gt, self.to_expr(), rhs.into_expr())
    }

    /// `self >= rhs`
    fn goe(&self, rhs: impl IntoExpr<T>) -> Predicate {
        Predicate::binary(Op::Goe, self.to_expr(), rhs.into_expr())
    }

    /// `self is null`
    fn is_null(&self) -> Predicate {
        Predicate(Expr::operation(Op::IsNull, vec![self.to_expr()]))
    }

    /// `self is not null`
    fn is_not_null(&self) -> Predicate {
        Predicate(Expr::operation(Op::IsNotNull, vec![self.to_expr()]))
    }

    /// `self in (values)`; an empty list never matches
    fn in_list<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr<T>,
    {
        let list = values.into_iter().map(IntoExpr::into_expr).collect();
        Predicate::binary(Op::In, self.to_expr(), Expr::List(list))
    }

    /// `self not in (values)`; an empty list always matches
    fn not_in<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: IntoExpr<T>,
    {
        let list = values.into_iter().map(IntoExpr::into_expr).collect();
        Predicate::binary(Op::NotIn, self.to_expr(), Expr::List(list))
    }

    /// `self between low and high`
    fn between(&self, low: impl IntoExpr<T>, high: impl IntoExpr<T>) -> Predicate {
        Predicate(Expr::operation(
            Op::Between,
            vec![self.to_expr(), low.into_expr(), high.into_expr()],
        ))
    }

    /// `coalesce(self, fallback)`
    fn coalesce(&self, fallback: impl IntoExpr<T>) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(
            Op::Coalesce,
            vec![self.to_expr(), fallback.into_expr()],
        ))
    }

    /// `count(self)`
    fn count(&self) -> TypedExpr<i64> {
        TypedExpr::new(Expr::operation(Op::Count, vec![self.to_expr()]))
    }

    /// `count(distinct self)`
    fn count_distinct(&self) -> TypedExpr<i64> {
        TypedExpr::new(Expr::operation(Op::CountDistinct, vec![self.to_expr()]))
    }

    /// `min(self)`
    fn min(&self) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(Op::Min, vec![self.to_expr()]))
    }

    /// `max(self)`
    fn max(&self) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(Op::Max, vec![self.to_expr()]))
    }

    /// Projection alias, `self as alias`
    fn alias(&self, alias: &str) -> Expr {
        Expr::Alias {
            expr: Box::new(self.to_expr()),
            alias: alias.to_string(),
        }
    }

    /// Ascending order
    fn asc(&self) -> OrderSpecifier {
        OrderSpecifier {
            expr: self.to_expr(),
            order: Order::Asc,
            nulls: None,
        }
    }

    /// Descending order
    fn desc(&self) -> OrderSpecifier {
        OrderSpecifier {
            expr: self.to_expr(),
            order: Order::Desc,
            nulls: None,
        }
    }
}

impl<T> Expression<T> for Column<T> {
    fn to_expr(&self) -> Expr {
        Expr::Path(self.path.clone())
    }
}

impl<T> Expression<T> for TypedExpr<T> {
    fn to_expr(&self) -> Expr {
        self.expr.clone()
    }
}

/// Arithmetic and numeric aggregates
pub trait NumericExpression<T: Numeric>: Expression<T> {
    /// `self + rhs`
    fn add(&self, rhs: impl IntoExpr<T>) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(Op::Add, vec![self.to_expr(), rhs.into_expr()]))
    }

    /// `self - rhs`
    fn sub(&self, rhs: impl IntoExpr<T>) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(Op::Sub, vec![self.to_expr(), rhs.into_expr()]))
    }

    /// `self * rhs`
    fn mul(&self, rhs: impl IntoExpr<T>) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(Op::Mul, vec![self.to_expr(), rhs.into_expr()]))
    }

    /// `self / rhs`
    fn div(&self, rhs: impl IntoExpr<T>) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(Op::Div, vec![self.to_expr(), rhs.into_expr()]))
    }

    /// `sum(self)`
    fn sum(&self) -> TypedExpr<T> {
        TypedExpr::new(Expr::operation(Op::Sum, vec![self.to_expr()]))
    }

    /// `avg(self)`
    fn avg(&self) -> TypedExpr<f64> {
        TypedExpr::new(Expr::operation(Op::Avg, vec![self.to_expr()]))
    }
}

impl<T: Numeric, E: Expression<T>> NumericExpression<T> for E {}

/// Text operations
pub trait StringExpression: Expression<String> {
    /// `self like pattern`
    fn like(&self, pattern: impl IntoExpr<String>) -> Predicate {
        Predicate::binary(Op::Like, self.to_expr(), pattern.into_expr())
    }

    /// `lower(self)`
    fn lower(&self) -> TypedExpr<String> {
        TypedExpr::new(Expr::operation(Op::Lower, vec![self.to_expr()]))
    }

    /// `upper(self)`
    fn upper(&self) -> TypedExpr<String> {
        TypedExpr::new(Expr::operation(Op::Upper, vec![self.to_expr()]))
    }

    /// Concatenation
    fn concat(&self, rhs: impl IntoExpr<String>) -> TypedExpr<String> {
        TypedExpr::new(Expr::operation(Op::Concat, vec![self.to_expr(), rhs.into_expr()]))
    }
}

impl<E: Expression<String>> StringExpression for E {}

/// `count(*)`
#[must_use]
pub const fn count_all() -> TypedExpr<i64> {
    TypedExpr::new(Expr::Operation {
        op: Op::CountAll,
        args: Vec::new(),
    })
}

/// Typed constant
#[must_use]
pub fn constant<T: Into<Value>>(value: T) -> TypedExpr<T> {
    TypedExpr::new(Expr::Constant(value.into()))
}

/// A list of expressions to select
pub trait Projection {
    /// Append the projected expressions
    fn push_exprs(self, out: &mut Vec<Expr>);

    /// Collect the projected expressions
    fn into_exprs(self) -> Vec<Expr>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        self.push_exprs(&mut out);
        out
    }
}

impl<T> Projection for &Column<T> {
    fn push_exprs(self, out: &mut Vec<Expr>) {
        out.push(Expr::Path(self.path.clone()));
    }
}

impl<T> Projection for TypedExpr<T> {
    fn push_exprs(self, out: &mut Vec<Expr>) {
        out.push(self.expr);
    }
}

impl Projection for Expr {
    fn push_exprs(self, out: &mut Vec<Expr>) {
        out.push(self);
    }
}

impl Projection for Vec<Expr> {
    fn push_exprs(self, out: &mut Vec<Expr>) {
        out.extend(self);
    }
}

impl Projection for &[Expr] {
    fn push_exprs(self, out: &mut Vec<Expr>) {
        out.extend_from_slice(self);
    }
}

macro_rules! tuple_projection {
    ($($name:ident),+) => {
        impl<$($name: Projection),+> Projection for ($($name,)+) {
            #[allow(non_snake_case)]
            fn push_exprs(self, out: &mut Vec<Expr>) {
                let ($($name,)+) = self;
                $($name.push_exprs(out);)+
            }
        }
    };
}

tuple_projection!(A, B);
tuple_projection!(A, B, C);
tuple_projection!(A, B, C, D);

/// Declare a typed table with its columns
///
/// ```
/// qsql::table! {
///     /// The companies fixture
///     pub struct QCompanies("companies") {
///         id: i64 => "id",
///         name: String => "name",
///     }
/// }
///
/// let companies = QCompanies::new("c");
/// assert_eq!(companies.id.path().to_string(), "c.id");
/// ```
#[macro_export]
macro_rules! table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ($sql_name:literal) {
            $($field:ident : $ty:ty => $column:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            table: $crate::Table,
            $(
                #[doc = concat!("Column `", $column, "`")]
                pub $field: $crate::Column<$ty>,
            )+
        }

        impl $name {
            /// Create the source under the given alias
            #[must_use]
            pub fn new(alias: &str) -> Self {
                Self::from_table($crate::Table::new($sql_name, alias))
            }

            /// Create the source from a prepared table, keeping its schema and keys
            #[must_use]
            pub fn from_table(table: $crate::Table) -> Self {
                let table = table.with_columns(&[$($column),+]);
                Self {
                    $($field: table.column($column),)+
                    table,
                }
            }

            /// Every column, in declaration order
            #[must_use]
            pub fn all_columns(&self) -> Vec<$crate::Expr> {
                vec![$($crate::Expression::to_expr(&self.$field)),+]
            }
        }

        impl $crate::TableSource for $name {
            fn table(&self) -> &$crate::Table {
                &self.table
            }
        }
    };
}
