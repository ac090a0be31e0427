//! Dialect templates
//!
//! A [`SqlTemplates`] value holds everything that differs between database
//! vendors: operator patterns, keyword fragments, identifier quoting, bind
//! placeholders, paging syntax and the shape of a merge statement. Operator
//! patterns use `{n}` for the n-th operand and are parsed once, when the
//! templates are built.

use crate::expr::Op;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Supported database vendors
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// H2
    H2,
    /// CUBRID
    Cubrid,
    /// `PostgreSQL`
    Postgres,
    /// `MySQL`
    #[value(name = "mysql")]
    MySql,
    /// `SQLite`
    Sqlite,
}

impl Dialect {
    /// Default templates of the dialect
    #[must_use]
    pub fn templates(self) -> SqlTemplates {
        SqlTemplates::for_dialect(self)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::H2 => "h2",
            Self::Cubrid => "cubrid",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        })
    }
}

/// Precedence of `or`
pub const PREC_OR: u8 = 10;
/// Precedence of `and`
pub const PREC_AND: u8 = 20;
/// Precedence of `not`
pub const PREC_NOT: u8 = 30;
/// Precedence of comparisons and other predicates
pub const PREC_COMPARISON: u8 = 40;
/// Precedence of string concatenation
pub const PREC_CONCAT: u8 = 45;
/// Precedence of `+` and `-`
pub const PREC_ADDITIVE: u8 = 50;
/// Precedence of `*` and `/`
pub const PREC_MULTIPLICATIVE: u8 = 60;
/// Function call syntax; operands are delimited and never parenthesized
pub const PREC_FUNCTION: u8 = u8::MAX;

/// Piece of a parsed operator pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Operand reference, `{n}`
    Arg(usize),
    /// Literal text
    Text(String),
}

/// Parsed operator pattern with its precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    elements: Vec<Element>,
    precedence: u8,
}

impl Template {
    /// Parse a pattern such as `"{0} = {1}"`; braces that do not enclose
    /// an index are kept as text
    #[must_use]
    pub fn new(pattern: &str, precedence: u8) -> Self {
        let mut elements = Vec::new();
        let mut text = String::new();
        let mut rest = pattern;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let closed = digits > 0 && after.as_bytes().get(digits) == Some(&b'}');
            match after[..digits].parse::<usize>() {
                Ok(index) if closed => {
                    text.push_str(&rest[..start]);
                    if !text.is_empty() {
                        elements.push(Element::Text(std::mem::take(&mut text)));
                    }
                    elements.push(Element::Arg(index));
                    rest = &after[digits + 1..];
                }
                _ => {
                    text.push_str(&rest[..=start]);
                    rest = after;
                }
            }
        }
        text.push_str(rest);
        if !text.is_empty() {
            elements.push(Element::Text(text));
        }
        Self {
            elements,
            precedence,
        }
    }

    /// Parsed elements
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Binding strength, higher binds tighter
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        self.precedence
    }
}

/// Keyword fragments; the defaults embed `\n` where a clause starts a new line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Keyword {
    Select,
    SelectDistinct,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    DefaultJoin,
    InnerJoin,
    Join,
    LeftJoin,
    RightJoin,
    FullJoin,
    On,
    TableAlias,
    As,
    Asc,
    Desc,
    NullsFirst,
    NullsLast,
    Limit,
    Offset,
    InsertInto,
    InsertOrReplaceInto,
    Values,
    Update,
    Set,
    DeleteFrom,
    MergeInto,
    Key,
    Using,
    WhenMatched,
    WhenNotMatched,
    OnConflict,
    DoUpdateSet,
    DoNothing,
    OnDuplicateKeyUpdate,
    AlwaysFalse,
    AlwaysTrue,
}

impl Keyword {
    const ALL: [Self; 39] = [
        Self::Select,
        Self::SelectDistinct,
        Self::From,
        Self::Where,
        Self::GroupBy,
        Self::Having,
        Self::OrderBy,
        Self::DefaultJoin,
        Self::InnerJoin,
        Self::Join,
        Self::LeftJoin,
        Self::RightJoin,
        Self::FullJoin,
        Self::On,
        Self::TableAlias,
        Self::As,
        Self::Asc,
        Self::Desc,
        Self::NullsFirst,
        Self::NullsLast,
        Self::Limit,
        Self::Offset,
        Self::InsertInto,
        Self::InsertOrReplaceInto,
        Self::Values,
        Self::Update,
        Self::Set,
        Self::DeleteFrom,
        Self::MergeInto,
        Self::Key,
        Self::Using,
        Self::WhenMatched,
        Self::WhenNotMatched,
        Self::OnConflict,
        Self::DoUpdateSet,
        Self::DoNothing,
        Self::OnDuplicateKeyUpdate,
        Self::AlwaysFalse,
        Self::AlwaysTrue,
    ];

    const fn default_text(self) -> &'static str {
        match self {
            Self::Select => "select ",
            Self::SelectDistinct => "select distinct ",
            Self::From => "\nfrom ",
            Self::Where => "\nwhere ",
            Self::GroupBy => "\ngroup by ",
            Self::Having => "\nhaving ",
            Self::OrderBy => "\norder by ",
            Self::DefaultJoin => ", ",
            Self::InnerJoin => "\ninner join ",
            Self::Join => "\njoin ",
            Self::LeftJoin => "\nleft join ",
            Self::RightJoin => "\nright join ",
            Self::FullJoin => "\nfull join ",
            Self::On => "\non ",
            Self::TableAlias => " ",
            Self::As => " as ",
            Self::Asc => " asc",
            Self::Desc => " desc",
            Self::NullsFirst => " nulls first",
            Self::NullsLast => " nulls last",
            Self::Limit => "\nlimit ",
            Self::Offset => "\noffset ",
            Self::InsertInto => "insert into ",
            Self::InsertOrReplaceInto => "insert or replace into ",
            Self::Values => "\nvalues ",
            Self::Update => "update ",
            Self::Set => "\nset ",
            Self::DeleteFrom => "delete from ",
            Self::MergeInto => "merge into ",
            Self::Key => " key ",
            Self::Using => "\nusing ",
            Self::WhenMatched => "\nwhen matched then update set ",
            Self::WhenNotMatched => "\nwhen not matched then insert ",
            Self::OnConflict => "\non conflict ",
            Self::DoUpdateSet => " do update set ",
            Self::DoNothing => " do nothing",
            Self::OnDuplicateKeyUpdate => "\non duplicate key update ",
            Self::AlwaysFalse => "1 = 2",
            Self::AlwaysTrue => "1 = 1",
        }
    }
}

/// Bind parameter syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    Question,
    /// `$1`, `$2`, ...
    Numbered,
}

/// Paging syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// `limit n offset m`
    LimitOffset,
    /// `limit m, n`
    LimitComma,
}

/// Shape of a merge (upsert) statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStyle {
    /// `merge into t (..) key (..) values (..)`
    Key,
    /// `merge into t using (select ..) .. when matched .. when not matched ..`
    Standard,
    /// `insert into t .. on conflict (..) do update set ..`
    OnConflict,
    /// `insert into t .. on duplicate key update ..`
    OnDuplicateKey,
    /// `insert or replace into t ..`
    InsertOrReplace,
}

const RESERVED: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "check", "column", "constraint", "create",
    "cross", "default", "delete", "desc", "distinct", "drop", "else", "end", "exists", "false",
    "for", "from", "full", "group", "having", "in", "index", "inner", "insert", "into", "is",
    "join", "key", "left", "like", "limit", "merge", "not", "null", "offset", "on", "or", "order",
    "outer", "primary", "right", "select", "set", "table", "then", "to", "true", "union",
    "unique", "update", "user", "using", "values", "when", "where", "with",
];

fn is_plain_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.iter().any(|word| word.eq_ignore_ascii_case(identifier))
}

/// Rendering rules of one database vendor
#[derive(Debug, Clone)]
pub struct SqlTemplates {
    dialect: Dialect,
    operators: HashMap<Op, Template>,
    keywords: Vec<String>,
    quote_open: char,
    quote_close: char,
    quote_all: bool,
    print_schema: bool,
    nulls_ordering: bool,
    placeholders: PlaceholderStyle,
    paging: PagingStyle,
    unbounded_limit: Option<&'static str>,
    merge: MergeStyle,
    dummy_table: Option<String>,
}

impl SqlTemplates {
    fn base(dialect: Dialect) -> Self {
        let operators = [
            (Op::Eq, "{0} = {1}", PREC_COMPARISON),
            (Op::Ne, "{0} <> {1}", PREC_COMPARISON),
            (Op::Lt, "{0} < {1}", PREC_COMPARISON),
            (Op::Loe, "{0} <= {1}", PREC_COMPARISON),
            (Op::Gt, "{0} > {1}", PREC_COMPARISON),
            (Op::Goe, "{0} >= {1}", PREC_COMPARISON),
            (Op::IsNull, "{0} is null", PREC_COMPARISON),
            (Op::IsNotNull, "{0} is not null", PREC_COMPARISON),
            (Op::Like, "{0} like {1}", PREC_COMPARISON),
            (Op::In, "{0} in {1}", PREC_COMPARISON),
            (Op::NotIn, "{0} not in {1}", PREC_COMPARISON),
            (Op::Between, "{0} between {1} and {2}", PREC_COMPARISON),
            (Op::And, "{0} and {1}", PREC_AND),
            (Op::Or, "{0} or {1}", PREC_OR),
            (Op::Not, "not {0}", PREC_NOT),
            (Op::Add, "{0} + {1}", PREC_ADDITIVE),
            (Op::Sub, "{0} - {1}", PREC_ADDITIVE),
            (Op::Mul, "{0} * {1}", PREC_MULTIPLICATIVE),
            (Op::Div, "{0} / {1}", PREC_MULTIPLICATIVE),
            (Op::Concat, "{0} || {1}", PREC_CONCAT),
            (Op::Lower, "lower({0})", PREC_FUNCTION),
            (Op::Upper, "upper({0})", PREC_FUNCTION),
            (Op::Count, "count({0})", PREC_FUNCTION),
            (Op::CountDistinct, "count(distinct {0})", PREC_FUNCTION),
            (Op::CountAll, "count(*)", PREC_FUNCTION),
            (Op::Sum, "sum({0})", PREC_FUNCTION),
            (Op::Min, "min({0})", PREC_FUNCTION),
            (Op::Max, "max({0})", PREC_FUNCTION),
            (Op::Avg, "avg({0})", PREC_FUNCTION),
            (Op::Coalesce, "coalesce({0}, {1})", PREC_FUNCTION),
        ]
        .into_iter()
        .map(|(op, pattern, precedence)| (op, Template::new(pattern, precedence)))
        .collect();

        Self {
            dialect,
            operators,
            keywords: Keyword::ALL
                .iter()
                .map(|keyword| keyword.default_text().to_string())
                .collect(),
            quote_open: '"',
            quote_close: '"',
            quote_all: false,
            print_schema: false,
            nulls_ordering: true,
            placeholders: PlaceholderStyle::Question,
            paging: PagingStyle::LimitOffset,
            unbounded_limit: None,
            merge: MergeStyle::Key,
            dummy_table: None,
        }
    }

    /// Templates for a dialect
    #[must_use]
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::H2 => Self::h2(),
            Dialect::Cubrid => Self::cubrid(),
            Dialect::Postgres => Self::postgres(),
            Dialect::MySql => Self::mysql(),
            Dialect::Sqlite => Self::sqlite(),
        }
    }

    /// H2 templates
    #[must_use]
    pub fn h2() -> Self {
        Self::base(Dialect::H2)
    }

    /// CUBRID templates
    #[must_use]
    pub fn cubrid() -> Self {
        let mut templates = Self::base(Dialect::Cubrid);
        templates.paging = PagingStyle::LimitComma;
        templates.unbounded_limit = Some("18446744073709551615");
        templates.merge = MergeStyle::Standard;
        templates.dummy_table = Some("db_root".to_string());
        templates
    }

    /// `PostgreSQL` templates
    #[must_use]
    pub fn postgres() -> Self {
        let mut templates = Self::base(Dialect::Postgres);
        templates.placeholders = PlaceholderStyle::Numbered;
        templates.merge = MergeStyle::OnConflict;
        templates
    }

    /// `MySQL` templates
    #[must_use]
    pub fn mysql() -> Self {
        let mut templates = Self::base(Dialect::MySql);
        templates.quote_open = '`';
        templates.quote_close = '`';
        templates.paging = PagingStyle::LimitComma;
        templates.unbounded_limit = Some("18446744073709551615");
        templates.merge = MergeStyle::OnDuplicateKey;
        templates.nulls_ordering = false;
        templates.add_template(Op::Concat, "concat({0}, {1})", PREC_FUNCTION);
        templates
    }

    /// `SQLite` templates
    #[must_use]
    pub fn sqlite() -> Self {
        let mut templates = Self::base(Dialect::Sqlite);
        templates.unbounded_limit = Some("-1");
        templates.merge = MergeStyle::InsertOrReplace;
        templates
    }

    /// Render every clause on a single line
    pub fn new_line_to_single_space(&mut self) -> &mut Self {
        for keyword in &mut self.keywords {
            if keyword.contains('\n') {
                *keyword = keyword.replace('\n', " ");
            }
        }
        self
    }

    /// Quote every identifier, not only those that require it
    pub fn set_quote_all(&mut self, quote_all: bool) -> &mut Self {
        self.quote_all = quote_all;
        self
    }

    /// Qualify tables with their schema
    pub fn set_print_schema(&mut self, print_schema: bool) -> &mut Self {
        self.print_schema = print_schema;
        self
    }

    /// Register or replace an operator pattern
    pub fn add_template(&mut self, op: Op, pattern: &str, precedence: u8) -> &mut Self {
        self.operators.insert(op, Template::new(pattern, precedence));
        self
    }

    /// Replace a keyword fragment
    pub fn set_keyword(&mut self, keyword: Keyword, text: impl Into<String>) -> &mut Self {
        self.keywords[keyword as usize] = text.into();
        self
    }

    /// Dialect these templates were created for
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Pattern of an operator
    #[must_use]
    pub fn template(&self, op: Op) -> Option<&Template> {
        self.operators.get(&op)
    }

    /// Keyword fragment
    #[must_use]
    pub fn keyword(&self, keyword: Keyword) -> &str {
        &self.keywords[keyword as usize]
    }

    /// Quote an identifier when required
    #[must_use]
    pub fn quote_identifier<'a>(&self, identifier: &'a str) -> Cow<'a, str> {
        if !self.quote_all && is_plain_identifier(identifier) {
            return Cow::Borrowed(identifier);
        }
        let mut quoted = String::with_capacity(identifier.len() + 2);
        quoted.push(self.quote_open);
        for c in identifier.chars() {
            if c == self.quote_close {
                quoted.push(c);
            }
            quoted.push(c);
        }
        quoted.push(self.quote_close);
        Cow::Owned(quoted)
    }

    /// Whether tables are qualified with their schema
    #[must_use]
    pub const fn is_print_schema(&self) -> bool {
        self.print_schema
    }

    /// Whether `nulls first` / `nulls last` is supported natively
    #[must_use]
    pub const fn supports_nulls_ordering(&self) -> bool {
        self.nulls_ordering
    }

    /// Bind parameter syntax
    #[must_use]
    pub const fn placeholders(&self) -> PlaceholderStyle {
        self.placeholders
    }

    /// Paging syntax
    #[must_use]
    pub const fn paging(&self) -> PagingStyle {
        self.paging
    }

    /// Limit rendered when only an offset is given, for dialects that need one
    #[must_use]
    pub const fn unbounded_limit(&self) -> Option<&'static str> {
        self.unbounded_limit
    }

    /// Merge statement shape
    #[must_use]
    pub const fn merge_style(&self) -> MergeStyle {
        self.merge
    }

    /// Single-row table used to select constants
    #[must_use]
    pub fn dummy_table(&self) -> Option<&str> {
        self.dummy_table.as_deref()
    }
}
