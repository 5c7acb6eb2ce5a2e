//! Error types for the datagrid application

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading table definitions and settings
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Refusing to read {path}: file too large ({size} bytes, max {max})")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Table definition has no columns")]
    NoColumns,

    #[error("Key field {0} is not a column")]
    UnknownKeyField(String),

    #[error("No config directory available")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, AppError>;
