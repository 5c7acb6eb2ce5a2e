//! datagrid-core - UI-agnostic table orchestrator, export and import.

pub mod clipboard;
pub mod error;
pub mod formula;
pub mod pagination;
pub mod selection;
pub mod settings;
pub mod storage;
pub mod table;
pub mod virtualization;

pub use clipboard::{ClipboardProvider, MemoryClipboard};
pub use error::{DataGridError, Result};
pub use formula::{FormulaContext, FormulaEvaluator};
pub use pagination::{PageInfo, PaginationConfig, PaginationState};
pub use selection::SelectionState;
pub use settings::{ColumnSettings, SettingsListener, TableSettings};
pub use storage::{ExportFile, ExportFormat, ExportOptions, ImportIssue, ImportResult};
pub use table::{DataTable, Features, SubscriptionId, TableConfig, TableSnapshot, TableStats};
pub use virtualization::{Align, VirtualWindow, Virtualizer, VirtualizerConfig};

pub use datagrid_engine::engine::{
    CellColors, ColorCondition, ColorRule, ColorTarget, ColumnConfig, ColumnType, Row, RowColors, RowKey,
    Value,
};
