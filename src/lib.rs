//! `qsql` - Typed SQL query construction and serialization
//!
//! Queries are assembled from typed column handles into [`QueryMetadata`],
//! rendered by [`SqlSerializer`] with the [`SqlTemplates`] of a dialect, and
//! executed through a pooled `PostgreSQL` connection.
//!
//! ```
//! use qsql::{Configuration, Expression, SqlQuery, SqlTemplates, Table};
//!
//! let companies = Table::new("COMPANIES", "COMPANIES");
//! let id = companies.column::<i64>("ID");
//! let name = companies.column::<String>("NAME");
//!
//! let configuration = Configuration::new(SqlTemplates::h2());
//! let bindings = SqlQuery::new(&configuration)
//!     .from(&companies)
//!     .where_(id.eq(1))
//!     .to_sql(&name)
//!     .unwrap();
//! assert_eq!(
//!     bindings.sql,
//!     "select COMPANIES.NAME\nfrom COMPANIES COMPANIES\nwhere COMPANIES.ID = ?"
//! );
//! ```

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/// Query performance harness
pub mod bench;
/// Command line interface definitions
pub mod cli;
/// Command handlers
pub mod commands;
/// Configuration management for qsql
pub mod config;
/// Database connection and pooling
pub mod database;
pub mod dml;
/// Query construction errors
pub mod error;
/// Typed expression model
pub mod expr;
pub mod metadata;
pub mod query;
/// SQL text generation
pub mod serializer;
/// Dialect rendering rules
pub mod templates;
/// Bind values
pub mod value;

pub use config::{Config, Configuration};
pub use database::{DatabaseError, DatabasePool};
pub use dml::{SqlDeleteClause, SqlInsertClause, SqlMergeClause, SqlUpdateClause};
pub use error::QueryError;
pub use expr::{
    constant, count_all, Column, ColumnPath, Expr, Expression, IntoExpr, NumericExpression, Op,
    OrderSpecifier, Predicate, Projection, StringExpression, Table, TableSource, TypedExpr,
};
pub use metadata::{JoinType, QueryMetadata};
pub use query::SqlQuery;
pub use serializer::{SqlBindings, SqlSerializer};
pub use templates::{Dialect, SqlTemplates};
pub use value::Value;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
