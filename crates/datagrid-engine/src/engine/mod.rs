//! Data-grid engine API.
//!
//! This module provides the pure pipeline stages of the grid:
//!
//! - [`Value`], [`Row`], [`RowKey`] - Loosely typed records and their identity
//! - [`ColumnConfig`], [`ColumnRegistry`] - Column schema and lookup
//! - [`detect_cycle`] - Circular dependency detection for formula columns
//! - [`filter_rows`], [`FilterSet`] - Rule groups and global search
//! - [`ColorRule`], [`resolve_row_colors`] - Conditional cell and row colours
//! - [`sort_indices`], [`SortSpec`] - Stable multi-column sorting
//! - [`format_cell`] - Export formatting of cell values
//! - [`strip_html`], [`parse_number_token`] and friends - String helpers

mod coerce;
mod color;
mod column;
mod cycle;
mod filter;
mod format;
mod html;
mod registry;
mod row;
mod sort;
mod value;

pub use coerce::{parse_bool_token, parse_date, parse_date_time, parse_number_token};
pub use color::{
    CellColors, ColorCondition, ColorRule, ColorTarget, RowColors, ordered_rules, resolve_row_colors,
};
pub use column::{
    CellRenderer, ColumnConfig, ColumnType, FormatSpec, FormatTransform, FormulaSpec,
    SelectOption, Validation, ValueAccessor,
};
pub use cycle::detect_cycle;
pub use filter::{
    FilterGroup, FilterOperator, FilterRule, FilterSet, Logic, Patterns, compare_ordered,
    evaluate_rule, filter_rows, matches_search,
};
pub use format::{format_cell, format_cell_text, format_number};
pub use html::{looks_like_html, plain_text, strip_html};
pub use registry::ColumnRegistry;
pub use row::{Row, RowKey};
pub use sort::{SortDirection, SortEntry, SortSpec, compare_values, sort_indices, sort_rows};
pub use value::{Value, format_plain_number};
