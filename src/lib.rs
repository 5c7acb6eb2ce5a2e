//! datagrid - table definitions, settings persistence and the system
//! clipboard for the headless data grid.

#[cfg(feature = "clipboard")]
pub mod clipboard;
pub mod config;
pub mod error;
pub mod settings_store;

pub use config::{TableDefinition, load_table_definition};
pub use error::{AppError, Result};
pub use settings_store::{default_settings_path, load_settings, persisting_listener, save_settings};
