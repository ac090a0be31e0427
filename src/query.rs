//! Query building utilities
//!
//! [`SqlQuery`] is the fluent entry point: it records sources, filters and
//! modifiers into [`QueryMetadata`] and serializes them with the templates of
//! its [`Configuration`] when a terminal operation is called. Builder methods
//! never fail; the first error is kept and returned by the terminal
//! operation.

use crate::config::Configuration;
use crate::database::{DatabaseError, DatabasePool};
use crate::error::{QueryError, Result};
use crate::expr::{Column, OrderSpecifier, Predicate, Projection, TableSource};
use crate::metadata::{JoinType, QueryMetadata};
use crate::serializer::{SqlBindings, SqlSerializer};
use tokio_postgres::types::FromSql;
use tokio_postgres::{Row, RowStream};
use tracing::debug;

/// Typed select query bound to a configuration
#[derive(Debug, Clone)]
pub struct SqlQuery<'c> {
    configuration: &'c Configuration,
    metadata: QueryMetadata,
    error: Option<QueryError>,
}

impl<'c> SqlQuery<'c> {
    /// Create a query with source validation enabled
    #[must_use]
    pub fn new(configuration: &'c Configuration) -> Self {
        Self::with_metadata(configuration, QueryMetadata::new())
    }

    /// Create a query on top of prepared metadata, e.g. `QueryMetadata::new().no_validate()`
    #[must_use]
    pub const fn with_metadata(configuration: &'c Configuration, metadata: QueryMetadata) -> Self {
        Self {
            configuration,
            metadata,
            error: None,
        }
    }

    fn record(mut self, result: Result<()>) -> Self {
        if self.error.is_none() {
            if let Err(err) = result {
                self.error = Some(err);
            }
        }
        self
    }

    fn add_source(mut self, join_type: JoinType, source: &impl TableSource) -> Self {
        self.metadata.add_join(join_type, source.table().clone());
        self
    }

    /// Add a source to the from list
    #[must_use]
    pub fn from(self, source: &impl TableSource) -> Self {
        self.add_source(JoinType::Default, source)
    }

    /// `inner join source`
    #[must_use]
    pub fn inner_join(self, source: &impl TableSource) -> Self {
        self.add_source(JoinType::Inner, source)
    }

    /// `join source`
    #[must_use]
    pub fn join(self, source: &impl TableSource) -> Self {
        self.add_source(JoinType::Join, source)
    }

    /// `left join source`
    #[must_use]
    pub fn left_join(self, source: &impl TableSource) -> Self {
        self.add_source(JoinType::Left, source)
    }

    /// `right join source`
    #[must_use]
    pub fn right_join(self, source: &impl TableSource) -> Self {
        self.add_source(JoinType::Right, source)
    }

    /// `full join source`
    #[must_use]
    pub fn full_join(self, source: &impl TableSource) -> Self {
        self.add_source(JoinType::Full, source)
    }

    /// Condition of the most recent join
    #[must_use]
    pub fn on(mut self, condition: Predicate) -> Self {
        let result = self.metadata.add_join_condition(condition);
        self.record(result)
    }

    /// Add a filter; repeated calls are combined with `and`
    #[must_use]
    pub fn where_(mut self, predicate: Predicate) -> Self {
        let result = self.metadata.add_where(predicate);
        self.record(result)
    }

    /// Add grouping expressions
    #[must_use]
    pub fn group_by(mut self, exprs: impl Projection) -> Self {
        for expr in exprs.into_exprs() {
            let result = self.metadata.add_group_by(expr);
            self = self.record(result);
        }
        self
    }

    /// Add a group filter
    #[must_use]
    pub fn having(mut self, predicate: Predicate) -> Self {
        let result = self.metadata.add_having(predicate);
        self.record(result)
    }

    /// Add an ordering
    #[must_use]
    pub fn order_by(mut self, order: OrderSpecifier) -> Self {
        let result = self.metadata.add_order_by(order);
        self.record(result)
    }

    /// Limit the number of rows
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.metadata.set_limit(limit);
        self
    }

    /// Skip rows
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.metadata.set_offset(offset);
        self
    }

    /// Select distinct rows only
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.metadata.set_distinct(true);
        self
    }

    /// The metadata built so far
    #[must_use]
    pub const fn metadata(&self) -> &QueryMetadata {
        &self.metadata
    }

    fn serialize(&self, metadata: &QueryMetadata, for_count_row: bool) -> Result<SqlBindings> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let mut serializer = SqlSerializer::new(self.configuration.templates());
        serializer.set_use_literals(self.configuration.use_literals());
        serializer.serialize(metadata, for_count_row)?;
        let bindings = serializer.into_bindings();
        debug!(sql = %bindings.sql, constants = bindings.constants.len(), "serialized query");
        Ok(bindings)
    }

    /// SQL selecting `projection`
    pub fn to_sql(&self, projection: impl Projection) -> Result<SqlBindings> {
        let mut metadata = self.metadata.clone();
        metadata.clear_projection();
        for expr in projection.into_exprs() {
            metadata.add_projection(expr)?;
        }
        self.serialize(&metadata, false)
    }

    /// SQL counting the matching rows
    pub fn count_sql(&self) -> Result<SqlBindings> {
        self.serialize(&self.metadata, true)
    }

    /// Count SQL for a distinct projection
    pub fn count_distinct_sql(&self, projection: impl Projection) -> Result<SqlBindings> {
        let mut metadata = self.metadata.clone();
        metadata.clear_projection();
        metadata.set_distinct(true);
        for expr in projection.into_exprs() {
            metadata.add_projection(expr)?;
        }
        self.serialize(&metadata, true)
    }

    /// Fetch every row of `projection`
    pub async fn fetch(
        &self,
        pool: &DatabasePool,
        projection: impl Projection,
    ) -> std::result::Result<Vec<Row>, DatabaseError> {
        let bindings = self.to_sql(projection)?;
        pool.query_values(&bindings.sql, &bindings.constants).await
    }

    /// Fetch the values of a single column
    pub async fn fetch_values<T>(
        &self,
        pool: &DatabasePool,
        column: &Column<T>,
    ) -> std::result::Result<Vec<T>, DatabaseError>
    where
        T: for<'a> FromSql<'a>,
    {
        let rows = self.fetch(pool, column).await?;
        rows.iter()
            .map(|row| row.try_get(0).map_err(DatabaseError::from))
            .collect()
    }

    /// Fetch the first row of `projection`, if any
    pub async fn fetch_one(
        &self,
        pool: &DatabasePool,
        projection: impl Projection,
    ) -> std::result::Result<Option<Row>, DatabaseError> {
        let mut metadata = self.metadata.clone();
        metadata.clear_projection();
        metadata.set_limit(1);
        for expr in projection.into_exprs() {
            metadata.add_projection(expr).map_err(DatabaseError::from)?;
        }
        let bindings = self.serialize(&metadata, false)?;
        let rows = pool.query_values(&bindings.sql, &bindings.constants).await?;
        Ok(rows.into_iter().next())
    }

    /// Count the matching rows
    pub async fn fetch_count(&self, pool: &DatabasePool) -> std::result::Result<i64, DatabaseError> {
        let bindings = self.count_sql()?;
        let rows = pool.query_values(&bindings.sql, &bindings.constants).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get(0)?),
            None => Ok(0),
        }
    }

    /// Stream the rows of `projection`
    pub async fn iterate(
        &self,
        pool: &DatabasePool,
        projection: impl Projection,
    ) -> std::result::Result<RowStream, DatabaseError> {
        let bindings = self.to_sql(projection)?;
        pool.query_raw(&bindings.sql, &bindings.constants).await
    }
}
