use std::ops::Range;
use std::sync::Arc;

use datagrid_engine::engine::{
    ColumnConfig, FilterSet, Row, RowColors, RowKey, filter_rows, resolve_row_colors, sort_indices,
};

use super::snapshot::{SnapshotListener, SubscriptionId, TableSnapshot, TableStats};
use super::DataTable;
use crate::formula::apply_formulas;
use crate::pagination::PageInfo;
use crate::settings::ordered_visible_columns;
use crate::virtualization::VirtualWindow;

impl DataTable {
    /// Re-run filter, sort and formulas if anything they depend on changed.
    pub(crate) fn ensure_processed(&mut self) {
        if !self.dirty {
            return;
        }

        let search_columns: Vec<&ColumnConfig> = if self.features.searchable {
            ordered_visible_columns(&self.registry, &self.settings)
        } else {
            Vec::new()
        };
        let mut indices = if self.features.filterable || self.features.searchable {
            let no_filters = FilterSet::default();
            let filters = if self.features.filterable {
                &self.filters
            } else {
                &no_filters
            };
            let search = self.features.searchable.then_some(self.search.as_str());
            filter_rows(&self.rows, &self.registry, filters, search, &search_columns)
        } else {
            (0..self.rows.len()).collect()
        };

        if self.features.sortable && !self.sort.is_empty() {
            sort_indices(&self.rows, &mut indices, &self.registry, &self.sort);
        }

        let mut processed: Vec<Row> = indices.iter().map(|&i| self.rows[i].clone()).collect();
        if let Some(evaluator) = &self.formula_evaluator {
            apply_formulas(&mut processed, &self.registry, evaluator.as_ref());
        }

        self.processed_keys = processed
            .iter()
            .filter_map(|row| row.key(&self.key_field))
            .collect();
        self.processed = Arc::new(processed);
        self.dirty = false;

        let count = self.processed.len();
        self.pagination.clamp(count);
        self.virtualizer.set_row_count(count);
        log::trace!("processed {} of {} rows", count, self.rows.len());
    }

    /// Filtered and sorted rows.
    pub fn processed_rows(&mut self) -> Arc<Vec<Row>> {
        self.ensure_processed();
        Arc::clone(&self.processed)
    }

    /// Keys of the processed rows, in processed order.
    pub fn processed_keys(&mut self) -> &[RowKey] {
        self.ensure_processed();
        &self.processed_keys
    }

    /// Visible columns in display order.
    pub fn visible_columns(&self) -> Vec<&ColumnConfig> {
        ordered_visible_columns(&self.registry, &self.settings)
    }

    /// Current page metadata. `None` when pagination is disabled.
    pub fn page_info(&mut self) -> Option<PageInfo> {
        self.pagination_config.as_ref()?;
        self.ensure_processed();
        Some(self.pagination.info(self.processed.len()))
    }

    /// Current virtual window. `None` when the table is paginated.
    pub fn virtual_window(&mut self) -> Option<VirtualWindow> {
        if self.pagination_config.is_some() {
            return None;
        }
        self.ensure_processed();
        Some(self.virtualizer.window())
    }

    /// Index range of processed rows to render.
    pub fn display_range(&mut self) -> Range<usize> {
        self.ensure_processed();
        if self.pagination_config.is_some() {
            self.pagination.range(self.processed.len())
        } else {
            self.virtualizer.window().range()
        }
    }

    /// Processed rows in the display range.
    pub fn display_rows(&mut self) -> Vec<Row> {
        let range = self.display_range();
        self.processed[range].to_vec()
    }

    /// Colour rule results for processed rows in `range`.
    fn resolve_colors(&self, range: Range<usize>) -> Vec<RowColors> {
        if !self.color_rules.iter().any(|r| r.enabled) {
            return Vec::new();
        }
        let columns: Vec<&ColumnConfig> = self.registry.iter().collect();
        self.processed[range]
            .iter()
            .map(|row| resolve_row_colors(&self.color_rules, row, &columns))
            .collect()
    }

    /// Selected rows from the live data, in data order. Stale keys are skipped.
    pub fn selected_data(&self) -> Vec<&Row> {
        self.selection.selected_rows(&self.rows, &self.key_field)
    }

    pub fn stats(&mut self) -> TableStats {
        self.ensure_processed();
        TableStats {
            total_rows: self.rows.len(),
            processed_rows: self.processed.len(),
            selected_rows: self.selection.live_keys(&self.rows, &self.key_field).len(),
            visible_columns: self.visible_columns().len(),
            has_filters: self.features.filterable && self.filters.is_active(),
        }
    }

    /// Current immutable state. Rebuilt only after something changed.
    pub fn snapshot(&mut self) -> Arc<TableSnapshot> {
        if let Some(snapshot) = &self.snapshot {
            return Arc::clone(snapshot);
        }
        self.ensure_processed();

        let (page, window) = if self.pagination_config.is_some() {
            (Some(self.pagination.info(self.processed.len())), None)
        } else {
            (None, Some(self.virtualizer.window()))
        };
        let display = match (&page, &window) {
            (Some(_), _) => self.pagination.range(self.processed.len()),
            (None, Some(w)) => w.range(),
            (None, None) => 0..0,
        };
        let row_colors = self.resolve_colors(display.clone());

        let snapshot = Arc::new(TableSnapshot {
            rows: Arc::clone(&self.processed),
            display,
            visible_columns: self.visible_columns().iter().map(|c| c.id.clone()).collect(),
            page,
            window,
            selection: self.selection.clone(),
            sort: self.sort.clone(),
            filters: self.filters.clone(),
            search: self.search.clone(),
            stats: self.stats(),
            row_colors,
        });
        self.snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Call `listener` with every snapshot published from now on.
    pub fn subscribe(&mut self, listener: SnapshotListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Hand the current snapshot to every subscriber.
    pub(crate) fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, listener) in self.subscribers.iter_mut() {
            listener(&snapshot);
        }
    }
}
