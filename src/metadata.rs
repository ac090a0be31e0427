//! In-memory query model prior to SQL generation

use crate::error::{QueryError, Result};
use crate::expr::{combine_and, ColumnPath, Expr, OrderSpecifier, Predicate, Table};
use std::collections::HashSet;
use std::sync::Arc;

/// How a source is attached to the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Plain source in the from list
    Default,
    /// `inner join`
    Inner,
    /// `join`
    Join,
    /// `left join`
    Left,
    /// `right join`
    Right,
    /// `full join`
    Full,
}

/// A source of the query together with its join condition
#[derive(Debug, Clone, PartialEq)]
pub struct JoinExpression {
    /// Join kind
    pub join_type: JoinType,
    /// Joined table
    pub target: Table,
    /// Condition given through `on`
    pub condition: Option<Expr>,
}

/// Paging modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryModifiers {
    /// Maximum number of rows
    pub limit: Option<u64>,
    /// Number of rows to skip
    pub offset: Option<u64>,
}

impl QueryModifiers {
    /// Whether any modifier is set
    #[must_use]
    pub const fn is_restricting(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

/// Joins, projection, filters, grouping, ordering and paging of a query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMetadata {
    joins: Vec<JoinExpression>,
    where_: Option<Expr>,
    group_by: Vec<Expr>,
    having: Option<Expr>,
    order_by: Vec<OrderSpecifier>,
    projection: Vec<Expr>,
    modifiers: QueryModifiers,
    distinct: bool,
    validate: bool,
    sources: HashSet<Arc<str>>,
}

impl Default for QueryMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryMetadata {
    /// Create empty metadata with source validation enabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            joins: Vec::new(),
            where_: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            projection: Vec::new(),
            modifiers: QueryModifiers::default(),
            distinct: false,
            validate: true,
            sources: HashSet::new(),
        }
    }

    /// Disable the check that referenced columns belong to a joined source
    #[must_use]
    pub fn no_validate(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Whether source validation is enabled
    #[must_use]
    pub const fn is_validating(&self) -> bool {
        self.validate
    }

    fn check(&self, expr: &Expr) -> Result<()> {
        if !self.validate {
            return Ok(());
        }
        let mut unknown: Option<ColumnPath> = None;
        expr.visit_paths(&mut |path: &ColumnPath| {
            if unknown.is_none() && !self.sources.contains(path.table()) {
                unknown = Some(path.clone());
            }
        });
        match unknown {
            Some(path) => Err(QueryError::UnknownSource {
                alias: path.table().to_string(),
                column: path.column().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Add a source
    pub fn add_join(&mut self, join_type: JoinType, target: Table) {
        self.sources.insert(Arc::from(target.alias()));
        self.joins.push(JoinExpression {
            join_type,
            target,
            condition: None,
        });
    }

    /// Add a condition to the most recent join, conjunctively
    pub fn add_join_condition(&mut self, condition: Predicate) -> Result<()> {
        let expr = condition.into_expr();
        self.check(&expr)?;
        let join = self
            .joins
            .last_mut()
            .ok_or(QueryError::ConditionWithoutJoin)?;
        join.condition = Some(combine_and(join.condition.take(), expr));
        Ok(())
    }

    /// Add a filter, conjunctively
    pub fn add_where(&mut self, predicate: Predicate) -> Result<()> {
        let expr = predicate.into_expr();
        self.check(&expr)?;
        self.where_ = Some(combine_and(self.where_.take(), expr));
        Ok(())
    }

    /// Add a grouping expression
    pub fn add_group_by(&mut self, expr: Expr) -> Result<()> {
        self.check(&expr)?;
        self.group_by.push(expr);
        Ok(())
    }

    /// Add a group filter, conjunctively
    pub fn add_having(&mut self, predicate: Predicate) -> Result<()> {
        let expr = predicate.into_expr();
        self.check(&expr)?;
        self.having = Some(combine_and(self.having.take(), expr));
        Ok(())
    }

    /// Add an ordering
    pub fn add_order_by(&mut self, order: OrderSpecifier) -> Result<()> {
        self.check(&order.expr)?;
        self.order_by.push(order);
        Ok(())
    }

    /// Add a projected expression
    pub fn add_projection(&mut self, expr: Expr) -> Result<()> {
        self.check(&expr)?;
        self.projection.push(expr);
        Ok(())
    }

    /// Remove every projected expression
    pub fn clear_projection(&mut self) {
        self.projection.clear();
    }

    /// Set the row limit
    pub fn set_limit(&mut self, limit: u64) {
        self.modifiers.limit = Some(limit);
    }

    /// Set the number of skipped rows
    pub fn set_offset(&mut self, offset: u64) {
        self.modifiers.offset = Some(offset);
    }

    /// Select distinct rows only
    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    /// Sources in the order they were added
    #[must_use]
    pub fn joins(&self) -> &[JoinExpression] {
        &self.joins
    }

    /// Combined filter
    #[must_use]
    pub const fn where_clause(&self) -> Option<&Expr> {
        self.where_.as_ref()
    }

    /// Grouping expressions
    #[must_use]
    pub fn group_by(&self) -> &[Expr] {
        &self.group_by
    }

    /// Combined group filter
    #[must_use]
    pub const fn having(&self) -> Option<&Expr> {
        self.having.as_ref()
    }

    /// Orderings
    #[must_use]
    pub fn order_by(&self) -> &[OrderSpecifier] {
        &self.order_by
    }

    /// Projected expressions
    #[must_use]
    pub fn projection(&self) -> &[Expr] {
        &self.projection
    }

    /// Paging modifiers
    #[must_use]
    pub const fn modifiers(&self) -> QueryModifiers {
        self.modifiers
    }

    /// Whether only distinct rows are selected
    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Column, Expression};

    fn companies() -> (Table, Column<i64>, Column<String>) {
        let table = Table::new("companies", "c");
        let id = table.column("id");
        let name = table.column("name");
        (table, id, name)
    }

    #[test]
    fn test_where_predicates_are_conjunctive() {
        let (table, id, name) = companies();
        let mut md = QueryMetadata::new();
        md.add_join(JoinType::Default, table);
        md.add_where(id.gt(1)).unwrap();
        md.add_where(name.eq("acme")).unwrap();

        match md.where_clause() {
            Some(Expr::Operation { args, .. }) => assert_eq!(args.len(), 2),
            other => panic!("unexpected where clause: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let (_, id, _) = companies();
        let mut md = QueryMetadata::new();
        let err = md.add_where(id.eq(1)).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownSource {
                alias: "c".to_string(),
                column: "id".to_string()
            }
        );
    }

    #[test]
    fn test_no_validate_accepts_unknown_source() {
        let (_, id, _) = companies();
        let mut md = QueryMetadata::new().no_validate();
        assert!(md.add_projection(id.to_expr()).is_ok());
    }

    #[test]
    fn test_join_condition_requires_join() {
        let (_, id, _) = companies();
        let mut md = QueryMetadata::new().no_validate();
        assert_eq!(
            md.add_join_condition(id.eq(1)),
            Err(QueryError::ConditionWithoutJoin)
        );
    }
}
