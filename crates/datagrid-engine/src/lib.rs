//! datagrid-engine - pure filtering, sorting and formatting stages of the data grid.

pub mod engine;
pub mod error;

pub use error::{Result, SchemaError};
