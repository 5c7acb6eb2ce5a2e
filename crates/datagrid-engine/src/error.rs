//! Error types for the datagrid engine.

use thiserror::Error;

/// Problems found while validating a column schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate column id: {0}")]
    DuplicateColumn(String),

    #[error("Column {column} depends on unknown column {dependency}")]
    UnknownDependency { column: String, dependency: String },

    #[error("Circular formula dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
