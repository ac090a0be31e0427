//! SQL text generation
//!
//! [`SqlSerializer`] walks [`QueryMetadata`] (or the parts of a DML clause)
//! and appends SQL text according to a set of [`SqlTemplates`]. Constants are
//! collected in placeholder order together with the column they were
//! compared against, so callers can bind them or inspect them.

use crate::error::{QueryError, Result};
use crate::expr::{ColumnPath, Expr, NullOrdering, Op, Order, OrderSpecifier, Table};
use crate::metadata::{JoinType, QueryMetadata};
use crate::templates::{
    Element, Keyword, MergeStyle, PagingStyle, PlaceholderStyle, SqlTemplates, PREC_FUNCTION,
};
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::slice;

/// Alias of the derived table in merge statements and counted subqueries
const MERGE_SOURCE: &str = "src";
const COUNT_SOURCE: &str = "internal";
const MAX_ROWS: &str = "18446744073709551615";

/// SQL text with its bind values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlBindings {
    /// Statement text
    pub sql: String,
    /// Bind values in placeholder order
    pub constants: Vec<Value>,
}

/// Column assignment of a DML clause
pub type Assignment = (ColumnPath, Expr);

const fn is_left_associative(op: Op) -> bool {
    matches!(
        op,
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Concat | Op::And | Op::Or
    )
}

const fn is_associative(op: Op) -> bool {
    matches!(op, Op::Add | Op::Mul | Op::Concat | Op::And | Op::Or)
}

/// Fold arithmetic over numeric constants into a single value
fn fold_constant(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Constant(value) => value.as_number().map(|_| value.clone()),
        Expr::Operation { op, args } => fold_operation(*op, args),
        _ => None,
    }
}

fn fold_operation(op: Op, args: &[Expr]) -> Option<Value> {
    let symbol = op.arithmetic_symbol()?;
    let [lhs, rhs] = args else {
        return None;
    };
    let lhs = fold_constant(lhs)?.as_number()?;
    let rhs = fold_constant(rhs)?.as_number()?;
    lhs.apply(symbol, rhs)
}

/// Strip pairs of `not` around an expression
fn strip_double_negation(mut expr: &Expr) -> &Expr {
    while let Expr::Operation { op: Op::Not, args } = expr {
        let [Expr::Operation { op: Op::Not, args: inner }] = args.as_slice() else {
            break;
        };
        let [negated] = inner.as_slice() else {
            break;
        };
        expr = negated;
    }
    expr
}

/// Serializer for select queries and DML statements
pub struct SqlSerializer<'t> {
    templates: &'t SqlTemplates,
    sql: String,
    constants: Vec<Value>,
    constant_paths: Vec<Option<ColumnPath>>,
    normalize: bool,
    use_literals: bool,
    skip_parent: bool,
    current_path: Option<ColumnPath>,
}

impl<'t> SqlSerializer<'t> {
    /// Create a serializer with normalization on and bind parameters
    #[must_use]
    pub fn new(templates: &'t SqlTemplates) -> Self {
        Self {
            templates,
            sql: String::with_capacity(128),
            constants: Vec::new(),
            constant_paths: Vec::new(),
            normalize: true,
            use_literals: false,
            skip_parent: false,
            current_path: None,
        }
    }

    /// Fold constant arithmetic and drop double negation
    pub fn set_normalize(&mut self, normalize: bool) {
        self.normalize = normalize;
    }

    /// Inline constants as literals instead of binding them
    pub fn set_use_literals(&mut self, use_literals: bool) {
        self.use_literals = use_literals;
    }

    /// Generated text
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bind values in placeholder order
    #[must_use]
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// For each bind value, the column it was compared against
    #[must_use]
    pub fn constant_paths(&self) -> &[Option<ColumnPath>] {
        &self.constant_paths
    }

    /// Consume into text and bind values
    #[must_use]
    pub fn into_bindings(self) -> SqlBindings {
        SqlBindings {
            sql: self.sql,
            constants: self.constants,
        }
    }

    fn keyword(&mut self, keyword: Keyword) {
        self.sql.push_str(self.templates.keyword(keyword));
    }

    fn identifier(&mut self, identifier: &str) {
        let quoted = self.templates.quote_identifier(identifier);
        self.sql.push_str(&quoted);
    }

    /// Serialize a select query, or its row count when `for_count_row` is set
    pub fn serialize(&mut self, metadata: &QueryMetadata, for_count_row: bool) -> Result<()> {
        if metadata.joins().is_empty() {
            return Err(QueryError::MissingFrom);
        }

        if !for_count_row {
            self.serialize_projection(metadata)?;
            self.serialize_sources(metadata)?;
            self.serialize_filters(metadata)?;
            self.serialize_order(metadata.order_by())?;
            self.serialize_paging(metadata);
        } else if metadata.is_distinct() || !metadata.group_by().is_empty() {
            self.keyword(Keyword::Select);
            self.serialize_operation(Op::CountAll, &[])?;
            self.keyword(Keyword::From);
            self.sql.push('(');
            if metadata.is_distinct() {
                self.serialize_projection(metadata)?;
            } else {
                self.keyword(Keyword::Select);
                self.serialize_list(metadata.group_by())?;
            }
            self.serialize_sources(metadata)?;
            self.serialize_filters(metadata)?;
            self.sql.push(')');
            self.keyword(Keyword::TableAlias);
            self.sql.push_str(COUNT_SOURCE);
        } else {
            self.keyword(Keyword::Select);
            self.serialize_operation(Op::CountAll, &[])?;
            self.serialize_sources(metadata)?;
            self.serialize_filters(metadata)?;
        }
        Ok(())
    }

    fn serialize_projection(&mut self, metadata: &QueryMetadata) -> Result<()> {
        if metadata.projection().is_empty() {
            return Err(QueryError::EmptyProjection);
        }
        if metadata.is_distinct() {
            self.keyword(Keyword::SelectDistinct);
        } else {
            self.keyword(Keyword::Select);
        }
        self.serialize_list(metadata.projection())
    }

    fn serialize_list(&mut self, exprs: &[Expr]) -> Result<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.serialize_expr(expr)?;
        }
        Ok(())
    }

    fn serialize_sources(&mut self, metadata: &QueryMetadata) -> Result<()> {
        for (i, join) in metadata.joins().iter().enumerate() {
            let keyword = if i == 0 {
                Keyword::From
            } else {
                match join.join_type {
                    JoinType::Default => Keyword::DefaultJoin,
                    JoinType::Inner => Keyword::InnerJoin,
                    JoinType::Join => Keyword::Join,
                    JoinType::Left => Keyword::LeftJoin,
                    JoinType::Right => Keyword::RightJoin,
                    JoinType::Full => Keyword::FullJoin,
                }
            };
            self.keyword(keyword);
            self.serialize_table(&join.target, true);
            if let Some(condition) = &join.condition {
                self.keyword(Keyword::On);
                self.serialize_expr(condition)?;
            }
        }
        Ok(())
    }

    fn serialize_filters(&mut self, metadata: &QueryMetadata) -> Result<()> {
        if let Some(predicate) = metadata.where_clause() {
            self.keyword(Keyword::Where);
            self.serialize_expr(predicate)?;
        }
        if !metadata.group_by().is_empty() {
            self.keyword(Keyword::GroupBy);
            self.serialize_list(metadata.group_by())?;
        }
        if let Some(predicate) = metadata.having() {
            self.keyword(Keyword::Having);
            self.serialize_expr(predicate)?;
        }
        Ok(())
    }

    fn serialize_order(&mut self, order_by: &[OrderSpecifier]) -> Result<()> {
        if order_by.is_empty() {
            return Ok(());
        }
        let native_nulls = self.templates.supports_nulls_ordering();
        self.keyword(Keyword::OrderBy);
        for (i, specifier) in order_by.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            if let (Some(nulls), false) = (specifier.nulls, native_nulls) {
                self.serialize_operation(Op::IsNull, slice::from_ref(&specifier.expr))?;
                self.keyword(match nulls {
                    NullOrdering::First => Keyword::Desc,
                    NullOrdering::Last => Keyword::Asc,
                });
                self.sql.push_str(", ");
            }
            self.serialize_expr(&specifier.expr)?;
            self.keyword(match specifier.order {
                Order::Asc => Keyword::Asc,
                Order::Desc => Keyword::Desc,
            });
            if let (Some(nulls), true) = (specifier.nulls, native_nulls) {
                self.keyword(match nulls {
                    NullOrdering::First => Keyword::NullsFirst,
                    NullOrdering::Last => Keyword::NullsLast,
                });
            }
        }
        Ok(())
    }

    fn serialize_paging(&mut self, metadata: &QueryMetadata) {
        let modifiers = metadata.modifiers();
        match self.templates.paging() {
            PagingStyle::LimitOffset => {
                if let Some(limit) = modifiers.limit {
                    self.keyword(Keyword::Limit);
                    self.sql.push_str(&limit.to_string());
                } else if let (Some(_), Some(unbounded)) =
                    (modifiers.offset, self.templates.unbounded_limit())
                {
                    self.keyword(Keyword::Limit);
                    self.sql.push_str(unbounded);
                }
                if let Some(offset) = modifiers.offset {
                    self.keyword(Keyword::Offset);
                    self.sql.push_str(&offset.to_string());
                }
            }
            PagingStyle::LimitComma => match (modifiers.limit, modifiers.offset) {
                (Some(limit), None) => {
                    self.keyword(Keyword::Limit);
                    self.sql.push_str(&limit.to_string());
                }
                (limit, Some(offset)) => {
                    self.keyword(Keyword::Limit);
                    self.sql.push_str(&offset.to_string());
                    self.sql.push_str(", ");
                    match limit {
                        Some(limit) => self.sql.push_str(&limit.to_string()),
                        None => self
                            .sql
                            .push_str(self.templates.unbounded_limit().unwrap_or(MAX_ROWS)),
                    }
                }
                (None, None) => {}
            },
        }
    }

    fn serialize_table(&mut self, table: &Table, aliased: bool) {
        if self.templates.is_print_schema() {
            if let Some(schema) = table.schema() {
                self.identifier(schema);
                self.sql.push('.');
            }
        }
        self.identifier(table.name());
        if aliased {
            self.keyword(Keyword::TableAlias);
            self.identifier(table.alias());
        }
    }

    /// Serialize a single expression
    pub fn serialize_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Path(path) => {
                self.serialize_path(path);
                Ok(())
            }
            Expr::Constant(value) => {
                self.serialize_constant(value);
                Ok(())
            }
            Expr::List(items) => {
                self.sql.push('(');
                self.serialize_list(items)?;
                self.sql.push(')');
                Ok(())
            }
            Expr::Operation { op, args } => self.serialize_operation(*op, args),
            Expr::Alias { expr, alias } => {
                self.serialize_expr(expr)?;
                self.keyword(Keyword::As);
                self.identifier(alias);
                Ok(())
            }
        }
    }

    fn serialize_path(&mut self, path: &ColumnPath) {
        if !self.skip_parent {
            self.identifier(path.table());
            self.sql.push('.');
        }
        self.identifier(path.column());
    }

    fn serialize_constant(&mut self, value: &Value) {
        if self.use_literals {
            self.sql.push_str(&value.to_literal());
            return;
        }
        self.constants.push(value.clone());
        self.constant_paths.push(self.current_path.clone());
        match self.templates.placeholders() {
            PlaceholderStyle::Question => self.sql.push('?'),
            PlaceholderStyle::Numbered => {
                self.sql.push('$');
                self.sql.push_str(&self.constants.len().to_string());
            }
        }
    }

    fn serialize_operation(&mut self, op: Op, args: &[Expr]) -> Result<()> {
        if self.normalize {
            if let Some(folded) = fold_operation(op, args) {
                self.serialize_constant(&folded);
                return Ok(());
            }
            if let (Op::Not, [Expr::Operation { op: Op::Not, args: inner }]) = (op, args) {
                if let [negated] = inner.as_slice() {
                    return self.serialize_expr(strip_double_negation(negated));
                }
            }
        }

        match (op, args) {
            (Op::In, [_, Expr::List(items)]) if items.is_empty() => {
                self.keyword(Keyword::AlwaysFalse);
                return Ok(());
            }
            (Op::NotIn, [_, Expr::List(items)]) if items.is_empty() => {
                self.keyword(Keyword::AlwaysTrue);
                return Ok(());
            }
            (Op::And | Op::Or, [single]) => return self.serialize_expr(single),
            (Op::And | Op::Or, [init @ .., last]) if init.len() > 1 => {
                let nested = [Expr::operation(op, init.to_vec()), last.clone()];
                return self.serialize_operation(op, &nested);
            }
            _ => {}
        }

        let templates = self.templates;
        let template = templates
            .template(op)
            .ok_or(QueryError::MissingTemplate { op })?;

        let previous = if op.is_comparison() {
            match args.first() {
                Some(Expr::Path(path)) => self.current_path.replace(path.clone()),
                _ => self.current_path.clone(),
            }
        } else {
            self.current_path.clone()
        };

        for element in template.elements() {
            match element {
                Element::Text(text) => self.sql.push_str(text),
                Element::Arg(index) => {
                    let arg = args.get(*index).ok_or(QueryError::TemplateArgument {
                        op,
                        index: *index,
                        arity: args.len(),
                    })?;
                    self.serialize_operand(op, template.precedence(), *index, arg)?;
                }
            }
        }

        self.current_path = previous;
        Ok(())
    }

    fn serialize_operand(
        &mut self,
        parent: Op,
        parent_precedence: u8,
        position: usize,
        arg: &Expr,
    ) -> Result<()> {
        let arg = if self.normalize {
            strip_double_negation(arg)
        } else {
            arg
        };
        let Expr::Operation { op: child, args } = arg else {
            return self.serialize_expr(arg);
        };
        if self.normalize {
            if let Some(folded) = fold_operation(*child, args) {
                self.serialize_constant(&folded);
                return Ok(());
            }
        }

        let child_precedence = self
            .templates
            .template(*child)
            .map_or(PREC_FUNCTION, |template| template.precedence());
        let ambiguous = if position == 0 {
            !is_left_associative(parent)
        } else {
            !(*child == parent && is_associative(parent))
        };
        let wrap = parent_precedence != PREC_FUNCTION
            && (child_precedence < parent_precedence
                || (child_precedence == parent_precedence && ambiguous));

        if wrap {
            self.sql.push('(');
            self.serialize_operation(*child, args)?;
            self.sql.push(')');
            Ok(())
        } else {
            self.serialize_operation(*child, args)
        }
    }

    /// Run `serialize` with column paths rendered without their table
    fn without_parent(&mut self, serialize: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let previous = std::mem::replace(&mut self.skip_parent, true);
        let result = serialize(self);
        self.skip_parent = previous;
        result
    }

    fn serialize_columns(&mut self, assignments: &[Assignment]) {
        self.sql.push('(');
        for (i, (column, _)) in assignments.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.identifier(column.column());
        }
        self.sql.push(')');
    }

    fn serialize_values(&mut self, assignments: &[Assignment]) -> Result<()> {
        self.sql.push('(');
        for (i, (column, value)) in assignments.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            let previous = self.current_path.replace(column.clone());
            self.serialize_expr(value)?;
            self.current_path = previous;
        }
        self.sql.push(')');
        Ok(())
    }

    /// Serialize `insert into table (..) values (..)`
    pub fn serialize_insert(&mut self, table: &Table, assignments: &[Assignment]) -> Result<()> {
        if assignments.is_empty() {
            return Err(QueryError::EmptyClause {
                clause: "insert",
                table: table.name().to_string(),
            });
        }
        self.without_parent(|s| {
            s.keyword(Keyword::InsertInto);
            s.serialize_insert_tail(table, assignments)
        })
    }

    fn serialize_insert_tail(&mut self, table: &Table, assignments: &[Assignment]) -> Result<()> {
        self.serialize_table(table, false);
        self.sql.push(' ');
        self.serialize_columns(assignments);
        self.keyword(Keyword::Values);
        self.serialize_values(assignments)
    }

    /// Serialize `update table set .. where ..`
    pub fn serialize_update(
        &mut self,
        table: &Table,
        assignments: &[Assignment],
        predicate: Option<&Expr>,
    ) -> Result<()> {
        if assignments.is_empty() {
            return Err(QueryError::EmptyClause {
                clause: "update",
                table: table.name().to_string(),
            });
        }
        self.without_parent(|s| {
            s.keyword(Keyword::Update);
            s.serialize_table(table, false);
            s.keyword(Keyword::Set);
            for (i, (column, value)) in assignments.iter().enumerate() {
                if i > 0 {
                    s.sql.push_str(", ");
                }
                s.identifier(column.column());
                s.sql.push_str(" = ");
                let previous = s.current_path.replace(column.clone());
                s.serialize_expr(value)?;
                s.current_path = previous;
            }
            if let Some(predicate) = predicate {
                s.keyword(Keyword::Where);
                s.serialize_expr(predicate)?;
            }
            Ok(())
        })
    }

    /// Serialize `delete from table where ..`
    pub fn serialize_delete(&mut self, table: &Table, predicate: Option<&Expr>) -> Result<()> {
        self.without_parent(|s| {
            s.keyword(Keyword::DeleteFrom);
            s.serialize_table(table, false);
            if let Some(predicate) = predicate {
                s.keyword(Keyword::Where);
                s.serialize_expr(predicate)?;
            }
            Ok(())
        })
    }

    /// Serialize an upsert keyed on `keys`, in the dialect's merge style
    pub fn serialize_merge(
        &mut self,
        table: &Table,
        keys: &[ColumnPath],
        assignments: &[Assignment],
    ) -> Result<()> {
        if assignments.is_empty() {
            return Err(QueryError::EmptyClause {
                clause: "merge",
                table: table.name().to_string(),
            });
        }
        if keys.is_empty() {
            return Err(QueryError::MissingMergeKeys {
                table: table.name().to_string(),
            });
        }
        if let Some(key) = keys.iter().find(|key| {
            !assignments
                .iter()
                .any(|(column, _)| column.column() == key.column())
        }) {
            return Err(QueryError::MergeKeyNotSet {
                column: key.column().to_string(),
            });
        }

        let updates: Vec<&ColumnPath> = assignments
            .iter()
            .map(|(column, _)| column)
            .filter(|column| !keys.iter().any(|key| key.column() == column.column()))
            .collect();

        self.without_parent(|s| s.serialize_merge_style(table, keys, assignments, &updates))
    }

    fn serialize_merge_style(
        &mut self,
        table: &Table,
        keys: &[ColumnPath],
        assignments: &[Assignment],
        updates: &[&ColumnPath],
    ) -> Result<()> {
        match self.templates.merge_style() {
            MergeStyle::Key => {
                self.keyword(Keyword::MergeInto);
                self.serialize_table(table, false);
                self.sql.push(' ');
                self.serialize_columns(assignments);
                self.keyword(Keyword::Key);
                self.sql.push('(');
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.identifier(key.column());
                }
                self.sql.push(')');
                self.keyword(Keyword::Values);
                self.serialize_values(assignments)?;
            }
            MergeStyle::Standard => self.serialize_standard_merge(table, keys, assignments, updates)?,
            MergeStyle::OnConflict => {
                self.keyword(Keyword::InsertInto);
                self.serialize_insert_tail(table, assignments)?;
                self.keyword(Keyword::OnConflict);
                self.sql.push('(');
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.identifier(key.column());
                }
                self.sql.push(')');
                if updates.is_empty() {
                    self.keyword(Keyword::DoNothing);
                } else {
                    self.keyword(Keyword::DoUpdateSet);
                    for (i, column) in updates.iter().enumerate() {
                        if i > 0 {
                            self.sql.push_str(", ");
                        }
                        self.identifier(column.column());
                        self.sql.push_str(" = excluded.");
                        self.identifier(column.column());
                    }
                }
            }
            MergeStyle::OnDuplicateKey => {
                self.keyword(Keyword::InsertInto);
                self.serialize_insert_tail(table, assignments)?;
                self.keyword(Keyword::OnDuplicateKeyUpdate);
                if updates.is_empty() {
                    self.identifier(keys[0].column());
                    self.sql.push_str(" = ");
                    self.identifier(keys[0].column());
                }
                for (i, column) in updates.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.identifier(column.column());
                    self.sql.push_str(" = values(");
                    self.identifier(column.column());
                    self.sql.push(')');
                }
            }
            MergeStyle::InsertOrReplace => {
                self.keyword(Keyword::InsertOrReplaceInto);
                self.serialize_insert_tail(table, assignments)?;
            }
        }
        Ok(())
    }

    fn serialize_standard_merge(
        &mut self,
        table: &Table,
        keys: &[ColumnPath],
        assignments: &[Assignment],
        updates: &[&ColumnPath],
    ) -> Result<()> {
        let target = self.templates.quote_identifier(table.name()).into_owned();

        self.keyword(Keyword::MergeInto);
        self.serialize_table(table, false);
        self.keyword(Keyword::Using);
        self.sql.push('(');
        self.keyword(Keyword::Select);
        for (i, (column, value)) in assignments.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            let previous = self.current_path.replace(column.clone());
            self.serialize_expr(value)?;
            self.current_path = previous;
            self.keyword(Keyword::As);
            self.identifier(column.column());
        }
        if let Some(dummy) = self.templates.dummy_table() {
            self.keyword(Keyword::From);
            self.sql.push_str(dummy);
        }
        self.sql.push(')');
        self.keyword(Keyword::TableAlias);
        self.sql.push_str(MERGE_SOURCE);

        self.keyword(Keyword::On);
        self.sql.push('(');
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(" and ");
            }
            self.sql.push_str(&target);
            self.sql.push('.');
            self.identifier(key.column());
            self.sql.push_str(" = ");
            self.sql.push_str(MERGE_SOURCE);
            self.sql.push('.');
            self.identifier(key.column());
        }
        self.sql.push(')');

        if !updates.is_empty() {
            self.keyword(Keyword::WhenMatched);
            for (i, column) in updates.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.identifier(column.column());
                self.sql.push_str(" = ");
                self.sql.push_str(MERGE_SOURCE);
                self.sql.push('.');
                self.identifier(column.column());
            }
        }

        self.keyword(Keyword::WhenNotMatched);
        self.serialize_columns(assignments);
        self.keyword(Keyword::Values);
        self.sql.push('(');
        for (i, (column, _)) in assignments.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.sql.push_str(MERGE_SOURCE);
            self.sql.push('.');
            self.identifier(column.column());
        }
        self.sql.push(')');
        Ok(())
    }
}

impl fmt::Display for SqlSerializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
