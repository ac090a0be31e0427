//! Insert, update, delete and merge clauses

use crate::config::Configuration;
use crate::database::{DatabaseError, DatabasePool};
use crate::error::Result;
use crate::expr::{combine_and, Column, ColumnPath, Expr, IntoExpr, Predicate, Table, TableSource};
use crate::serializer::{Assignment, SqlBindings, SqlSerializer};
use tracing::debug;

fn bindings<F>(configuration: &Configuration, serialize: F) -> Result<SqlBindings>
where
    F: FnOnce(&mut SqlSerializer<'_>) -> Result<()>,
{
    let mut serializer = SqlSerializer::new(configuration.templates());
    serializer.set_use_literals(configuration.use_literals());
    serialize(&mut serializer)?;
    let bindings = serializer.into_bindings();
    debug!(sql = %bindings.sql, constants = bindings.constants.len(), "serialized clause");
    Ok(bindings)
}

async fn execute(pool: &DatabasePool, bindings: Result<SqlBindings>) -> std::result::Result<u64, DatabaseError> {
    let bindings = bindings?;
    pool.execute_values(&bindings.sql, &bindings.constants).await
}

/// Replace the value of an already assigned column, or append it
fn assign(assignments: &mut Vec<Assignment>, column: ColumnPath, value: Expr) {
    match assignments
        .iter_mut()
        .find(|(existing, _)| existing.column() == column.column())
    {
        Some(slot) => slot.1 = value,
        None => assignments.push((column, value)),
    }
}

/// `insert into table (..) values (..)`
#[derive(Debug, Clone)]
pub struct SqlInsertClause<'c> {
    configuration: &'c Configuration,
    table: Table,
    assignments: Vec<Assignment>,
}

impl<'c> SqlInsertClause<'c> {
    /// Insert into `target`
    #[must_use]
    pub fn new(configuration: &'c Configuration, target: &impl TableSource) -> Self {
        Self {
            configuration,
            table: target.table().clone(),
            assignments: Vec::new(),
        }
    }

    /// Value of a column
    #[must_use]
    pub fn set<T>(mut self, column: &Column<T>, value: impl IntoExpr<T>) -> Self {
        assign(&mut self.assignments, column.path().clone(), value.into_expr());
        self
    }

    /// Statement text and bindings
    pub fn to_sql(&self) -> Result<SqlBindings> {
        bindings(self.configuration, |serializer| {
            serializer.serialize_insert(&self.table, &self.assignments)
        })
    }

    /// Execute and return the number of inserted rows
    pub async fn execute(&self, pool: &DatabasePool) -> std::result::Result<u64, DatabaseError> {
        execute(pool, self.to_sql()).await
    }
}

/// `update table set .. where ..`
#[derive(Debug, Clone)]
pub struct SqlUpdateClause<'c> {
    configuration: &'c Configuration,
    table: Table,
    assignments: Vec<Assignment>,
    predicate: Option<Expr>,
}

impl<'c> SqlUpdateClause<'c> {
    /// Update rows of `target`
    #[must_use]
    pub fn new(configuration: &'c Configuration, target: &impl TableSource) -> Self {
        Self {
            configuration,
            table: target.table().clone(),
            assignments: Vec::new(),
            predicate: None,
        }
    }

    /// New value of a column
    #[must_use]
    pub fn set<T>(mut self, column: &Column<T>, value: impl IntoExpr<T>) -> Self {
        assign(&mut self.assignments, column.path().clone(), value.into_expr());
        self
    }

    /// Restrict the updated rows; repeated calls are combined with `and`
    #[must_use]
    pub fn where_(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(combine_and(self.predicate.take(), predicate.into_expr()));
        self
    }

    /// Statement text and bindings
    pub fn to_sql(&self) -> Result<SqlBindings> {
        bindings(self.configuration, |serializer| {
            serializer.serialize_update(&self.table, &self.assignments, self.predicate.as_ref())
        })
    }

    /// Execute and return the number of updated rows
    pub async fn execute(&self, pool: &DatabasePool) -> std::result::Result<u64, DatabaseError> {
        execute(pool, self.to_sql()).await
    }
}

/// `delete from table where ..`
#[derive(Debug, Clone)]
pub struct SqlDeleteClause<'c> {
    configuration: &'c Configuration,
    table: Table,
    predicate: Option<Expr>,
}

impl<'c> SqlDeleteClause<'c> {
    /// Delete rows of `target`
    #[must_use]
    pub fn new(configuration: &'c Configuration, target: &impl TableSource) -> Self {
        Self {
            configuration,
            table: target.table().clone(),
            predicate: None,
        }
    }

    /// Restrict the deleted rows; repeated calls are combined with `and`
    #[must_use]
    pub fn where_(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(combine_and(self.predicate.take(), predicate.into_expr()));
        self
    }

    /// Statement text and bindings
    pub fn to_sql(&self) -> Result<SqlBindings> {
        bindings(self.configuration, |serializer| {
            serializer.serialize_delete(&self.table, self.predicate.as_ref())
        })
    }

    /// Execute and return the number of deleted rows
    pub async fn execute(&self, pool: &DatabasePool) -> std::result::Result<u64, DatabaseError> {
        execute(pool, self.to_sql()).await
    }
}

/// Insert a row, or update it when a row with the same key exists
///
/// Keys default to the primary key of the target table.
#[derive(Debug, Clone)]
pub struct SqlMergeClause<'c> {
    configuration: &'c Configuration,
    table: Table,
    keys: Vec<ColumnPath>,
    assignments: Vec<Assignment>,
}

impl<'c> SqlMergeClause<'c> {
    /// Merge into `target`
    #[must_use]
    pub fn new(configuration: &'c Configuration, target: &impl TableSource) -> Self {
        Self {
            configuration,
            table: target.table().clone(),
            keys: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Add a key column identifying the row
    #[must_use]
    pub fn key<T>(mut self, column: &Column<T>) -> Self {
        self.keys.push(column.path().clone());
        self
    }

    /// Value of a column
    #[must_use]
    pub fn set<T>(mut self, column: &Column<T>, value: impl IntoExpr<T>) -> Self {
        assign(&mut self.assignments, column.path().clone(), value.into_expr());
        self
    }

    /// Key columns in effect
    #[must_use]
    pub fn keys(&self) -> Vec<ColumnPath> {
        if self.keys.is_empty() {
            self.table.primary_key()
        } else {
            self.keys.clone()
        }
    }

    /// Statement text and bindings
    pub fn to_sql(&self) -> Result<SqlBindings> {
        let keys = self.keys();
        bindings(self.configuration, |serializer| {
            serializer.serialize_merge(&self.table, &keys, &self.assignments)
        })
    }

    /// Execute and return the number of affected rows
    pub async fn execute(&self, pool: &DatabasePool) -> std::result::Result<u64, DatabaseError> {
        execute(pool, self.to_sql()).await
    }
}
