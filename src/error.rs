use crate::expr::Op;
use thiserror::Error;

/// Errors raised while building or serializing a query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A column refers to a source that is not part of the query
    #[error("Unknown source '{alias}' referenced by column '{column}'")]
    UnknownSource {
        /// Alias of the missing source
        alias: String,
        /// Referencing column
        column: String,
    },

    /// A join condition was given before any join
    #[error("Join condition given without a preceding join")]
    ConditionWithoutJoin,

    /// A select query needs at least one projected expression
    #[error("Query has an empty projection")]
    EmptyProjection,

    /// A select query needs at least one source
    #[error("Query has no from clause")]
    MissingFrom,

    /// No template is registered for an operator
    #[error("No template registered for {op:?}")]
    MissingTemplate {
        /// Operator being rendered
        op: Op,
    },

    /// A template referenced an operand the expression does not have
    #[error("Template for {op:?} references argument {index} but only {arity} given")]
    TemplateArgument {
        /// Operator being rendered
        op: Op,
        /// Referenced argument index
        index: usize,
        /// Number of operands available
        arity: usize,
    },

    /// A DML clause was executed without any column to write
    #[error("{clause} clause on '{table}' sets no columns")]
    EmptyClause {
        /// Clause kind
        clause: &'static str,
        /// Target table
        table: String,
    },

    /// A merge clause has neither explicit keys nor a primary key
    #[error("Merge into '{table}' has no key columns")]
    MissingMergeKeys {
        /// Target table
        table: String,
    },

    /// A merge key column has no value
    #[error("Merge key '{column}' has no value")]
    MergeKeyNotSet {
        /// Key column
        column: String,
    },

    /// Serialization produced no text
    #[error("Serializer produced an empty statement")]
    EmptyStatement,
}

/// Result type alias for query construction
pub type Result<T> = std::result::Result<T, QueryError>;
