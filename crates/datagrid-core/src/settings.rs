//! Persisted view state and column layout.
//!
//! [`TableSettings`] is what a host stores between sessions: per-column
//! visibility, width and order overrides, plus the last sort, filters, page
//! size and colour rules. The table never stores it itself; it hands every change to the
//! listener the host registered.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use datagrid_engine::engine::{ColorRule, ColumnConfig, ColumnRegistry, FilterSet, SortSpec};

/// Order of columns without an explicit override.
pub const DEFAULT_COLUMN_ORDER: usize = 999;

/// Called with the full settings after every change.
pub type SettingsListener = Box<dyn FnMut(&TableSettings)>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub color_rules: Vec<ColorRule>,
}

impl TableSettings {
    pub fn column(&self, id: &str) -> Option<&ColumnSettings> {
        self.columns.get(id)
    }

    fn column_mut(&mut self, id: &str) -> &mut ColumnSettings {
        self.columns.entry(id.to_string()).or_default()
    }

    pub fn is_visible(&self, column: &ColumnConfig) -> bool {
        self.column(&column.id)
            .and_then(|s| s.visible)
            .unwrap_or(column.visible)
    }

    pub fn width(&self, column: &ColumnConfig) -> Option<f32> {
        self.column(&column.id)
            .and_then(|s| s.width)
            .or(column.width)
    }

    fn order(&self, id: &str) -> usize {
        self.column(id)
            .and_then(|s| s.order)
            .unwrap_or(DEFAULT_COLUMN_ORDER)
    }

    pub fn set_column_visible(&mut self, id: &str, visible: bool) {
        self.column_mut(id).visible = Some(visible);
    }

    /// Store a width clamped to the column's bounds. Returns the stored width.
    pub fn resize_column(&mut self, column: &ColumnConfig, width: f32) -> f32 {
        let width = column.clamp_width(width.max(0.0));
        self.column_mut(&column.id).width = Some(width);
        width
    }

    /// Move a column to a position among the visible columns.
    ///
    /// Locked columns never move, and a move that would shift a locked column
    /// is refused. Returns whether the order changed.
    pub fn reorder_column(&mut self, registry: &ColumnRegistry, id: &str, to_index: usize) -> bool {
        let all: Vec<&ColumnConfig> = ordered_columns(registry, self);
        let visible: Vec<&str> = all
            .iter()
            .filter(|c| self.is_visible(c))
            .map(|c| c.id.as_str())
            .collect();

        let Some(from) = all.iter().position(|c| c.id == id) else {
            return false;
        };
        if all[from].locked || visible.is_empty() {
            return false;
        }
        let target = visible[to_index.min(visible.len() - 1)];
        let Some(to) = all.iter().position(|c| c.id == target) else {
            return false;
        };
        if from == to {
            return false;
        }

        let mut next: Vec<&ColumnConfig> = all.clone();
        let moved = next.remove(from);
        next.insert(to, moved);
        if all
            .iter()
            .zip(next.iter())
            .any(|(before, after)| before.locked && before.id != after.id)
        {
            return false;
        }

        let ids: Vec<String> = next.iter().map(|c| c.id.clone()).collect();
        for (position, id) in ids.iter().enumerate() {
            self.column_mut(id).order = Some(position);
        }
        true
    }

    /// Drop every per-column override.
    pub fn reset_columns(&mut self) {
        self.columns.clear();
    }
}

/// All columns in display order: explicit order first, declaration order on ties.
pub fn ordered_columns<'a>(registry: &'a ColumnRegistry, settings: &TableSettings) -> Vec<&'a ColumnConfig> {
    let mut columns: Vec<&ColumnConfig> = registry.iter().collect();
    columns.sort_by_key(|c| settings.order(&c.id));
    columns
}

/// Visible columns in display order.
pub fn ordered_visible_columns<'a>(
    registry: &'a ColumnRegistry,
    settings: &TableSettings,
) -> Vec<&'a ColumnConfig> {
    ordered_columns(registry, settings)
        .into_iter()
        .filter(|c| settings.is_visible(c))
        .collect()
}
