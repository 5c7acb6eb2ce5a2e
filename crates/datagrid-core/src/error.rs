//! Error types for datagrid core.

use thiserror::Error;

use datagrid_engine::SchemaError;

/// Errors that can occur while building or driving a data table.
#[derive(Error, Debug)]
pub enum DataGridError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid column schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Row {index} has no value for key field {key_field}")]
    MissingRowKey { index: usize, key_field: String },

    #[error("Duplicate row key: {0}")]
    DuplicateRowKey(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("No columns to export")]
    NoColumns,
}

pub type Result<T> = std::result::Result<T, DataGridError>;
