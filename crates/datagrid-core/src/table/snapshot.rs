use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

use datagrid_engine::engine::{CellColors, FilterSet, Row, RowColors, SortSpec};

use crate::pagination::PageInfo;
use crate::selection::SelectionState;
use crate::virtualization::VirtualWindow;

/// Receives every published snapshot.
pub type SnapshotListener = Box<dyn FnMut(&Arc<TableSnapshot>)>;

/// Handle returned by [`DataTable::subscribe`](super::DataTable::subscribe).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) usize);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub total_rows: usize,
    pub processed_rows: usize,
    /// Selected keys that still have a live row.
    pub selected_rows: usize,
    pub visible_columns: usize,
    pub has_filters: bool,
}

/// Immutable view of the table after an action.
#[derive(Clone, Debug)]
pub struct TableSnapshot {
    /// Filtered and sorted rows.
    pub rows: Arc<Vec<Row>>,
    /// Indices into `rows` to render: the current page or the virtual window.
    pub display: Range<usize>,
    pub visible_columns: Vec<String>,
    pub page: Option<PageInfo>,
    pub window: Option<VirtualWindow>,
    pub selection: SelectionState,
    pub sort: SortSpec,
    pub filters: FilterSet,
    pub search: String,
    pub stats: TableStats,
    /// Colour rule results for the display rows, aligned with
    /// [`display_rows`](Self::display_rows). Empty when no rule is enabled.
    pub row_colors: Vec<RowColors>,
}

impl TableSnapshot {
    /// Rows in the display range.
    pub fn display_rows(&self) -> &[Row] {
        &self.rows[self.display.clone()]
    }

    /// Colours of a cell, by position among the display rows.
    pub fn cell_colors(&self, display_index: usize, column_id: &str) -> CellColors {
        self.row_colors
            .get(display_index)
            .map(|colors| colors.cell(column_id))
            .unwrap_or_default()
    }
}
