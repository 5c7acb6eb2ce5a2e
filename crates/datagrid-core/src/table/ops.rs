use datagrid_engine::engine::{ColorRule, FilterGroup, FilterSet, Row, RowKey, SortDirection, SortSpec};

use super::DataTable;
use crate::error::Result;
use crate::selection::SelectionState;
use crate::virtualization::Align;

impl DataTable {
    /// Replace the rows, keeping filters, sort, selection and page.
    /// The page is clamped to the new row count.
    pub fn set_data(&mut self, rows: Vec<Row>) -> Result<()> {
        Self::validate_keys(&rows, &self.key_field)?;
        log::debug!("set_data: {} rows", rows.len());
        self.rows = rows;
        self.invalidate();
        self.publish();
        Ok(())
    }

    /// Swap in a new data source and reset all session state.
    pub fn replace_data_source(&mut self, rows: Vec<Row>) -> Result<()> {
        Self::validate_keys(&rows, &self.key_field)?;
        log::debug!("replace_data_source: {} rows, session state reset", rows.len());
        self.rows = rows;
        self.search.clear();
        self.filters = FilterSet::default();
        self.sort.clear();
        self.selection = SelectionState::new();
        self.pagination.first();
        self.virtualizer.reset_measurements();
        self.invalidate();
        self.emit_settings();
        self.publish();
        Ok(())
    }

    // --- search and filters ---

    pub fn set_search(&mut self, term: impl Into<String>) {
        if !self.features.searchable {
            return;
        }
        let term = term.into();
        if term == self.search {
            return;
        }
        log::debug!("search: {:?}", term);
        self.search = term;
        self.pagination.first();
        self.invalidate();
        self.publish();
    }

    pub fn clear_search(&mut self) {
        self.set_search(String::new());
    }

    pub fn set_filters(&mut self, filters: FilterSet) {
        if !self.features.filterable {
            return;
        }
        log::debug!(
            "filters applied: {} groups, active {}",
            filters.groups.len(),
            filters.is_active()
        );
        self.filters = filters;
        self.filters_changed();
    }

    pub fn add_filter_group(&mut self, group: FilterGroup) {
        if !self.features.filterable {
            return;
        }
        self.filters.groups.push(group);
        self.filters_changed();
    }

    /// Enable or disable a rule by id. Returns whether the rule exists.
    pub fn set_rule_enabled(&mut self, rule_id: &str, enabled: bool) -> bool {
        if !self.features.filterable || !self.filters.set_rule_enabled(rule_id, enabled) {
            return false;
        }
        self.filters_changed();
        true
    }

    pub fn remove_filter_rule(&mut self, rule_id: &str) -> bool {
        if !self.features.filterable || !self.filters.remove_rule(rule_id) {
            return false;
        }
        self.filters_changed();
        true
    }

    pub fn clear_filters(&mut self) {
        if self.filters.groups.is_empty() {
            return;
        }
        self.filters = FilterSet::default();
        self.filters_changed();
    }

    fn filters_changed(&mut self) {
        self.invalidate();
        self.emit_settings();
        self.publish();
    }

    // --- sorting ---

    fn can_sort(&self, column_id: &str) -> bool {
        self.features.sortable && self.registry.get(column_id).is_some_and(|c| c.sortable)
    }

    /// Cycle a column through descending, ascending and unsorted.
    /// Returns the column's new direction.
    pub fn toggle_sort(&mut self, column_id: &str, additive: bool) -> Option<SortDirection> {
        if !self.can_sort(column_id) {
            return None;
        }
        let direction = self.sort.toggle(column_id, additive);
        log::debug!(
            "sort {}: {}",
            column_id,
            direction.map(|d| d.as_str()).unwrap_or("none")
        );
        self.sort_changed();
        direction
    }

    /// Force a direction for a column, or remove it with `None`.
    pub fn set_sort(&mut self, column_id: &str, direction: Option<SortDirection>, additive: bool) {
        if !self.can_sort(column_id) {
            return;
        }
        self.sort.set(column_id, direction, additive);
        self.sort_changed();
    }

    /// Replace the whole sort spec. Entries naming unknown or unsortable
    /// columns are dropped.
    pub fn sort_by(&mut self, mut spec: SortSpec) {
        if !self.features.sortable {
            return;
        }
        spec.retain_columns(|id| self.registry.get(id).is_some_and(|c| c.sortable));
        self.sort = spec;
        self.sort_changed();
    }

    pub fn clear_sort(&mut self) {
        if self.sort.is_empty() {
            return;
        }
        self.sort.clear();
        self.sort_changed();
    }

    fn sort_changed(&mut self) {
        self.invalidate();
        self.emit_settings();
        self.publish();
    }

    // --- selection ---

    fn selection_changed(&mut self) {
        self.touch();
        self.publish();
    }

    pub fn toggle_row(&mut self, key: &RowKey) {
        if !self.features.selectable {
            return;
        }
        self.ensure_processed();
        self.selection.toggle_row(key, &self.processed_keys);
        self.selection_changed();
    }

    pub fn select_row(&mut self, key: &RowKey) {
        if !self.features.selectable {
            return;
        }
        self.ensure_processed();
        self.selection.select_row(key, &self.processed_keys);
        self.selection_changed();
    }

    pub fn deselect_row(&mut self, key: &RowKey) {
        if !self.features.selectable {
            return;
        }
        self.ensure_processed();
        self.selection.deselect_row(key, &self.processed_keys);
        self.selection_changed();
    }

    /// Select every processed row. Rows hidden by filters stay unselected.
    pub fn select_all(&mut self) {
        if !self.features.selectable {
            return;
        }
        self.ensure_processed();
        self.selection.select_all(&self.processed_keys);
        self.selection_changed();
    }

    pub fn deselect_all(&mut self) {
        if !self.features.selectable {
            return;
        }
        self.selection.deselect_all();
        self.selection_changed();
    }

    pub fn toggle_all(&mut self) {
        if !self.features.selectable {
            return;
        }
        self.ensure_processed();
        self.selection.toggle_all(&self.processed_keys);
        self.selection_changed();
    }

    /// Select the processed rows between two keys. No-op when either is absent.
    pub fn select_range(&mut self, start: &RowKey, end: &RowKey) -> bool {
        if !self.features.selectable {
            return false;
        }
        self.ensure_processed();
        if !self.selection.select_range(start, end, &self.processed_keys) {
            return false;
        }
        self.selection_changed();
        true
    }

    // --- pagination ---

    fn page_changed(&mut self, before: usize) {
        if self.pagination.current_page != before {
            log::debug!("page {} -> {}", before, self.pagination.current_page);
            self.touch();
            self.publish();
        }
    }

    pub fn go_to_page(&mut self, page: usize) {
        if !self.is_paginated() {
            return;
        }
        self.ensure_processed();
        let before = self.pagination.current_page;
        self.pagination.go_to(page, self.processed.len());
        self.page_changed(before);
    }

    pub fn next_page(&mut self) {
        if !self.is_paginated() {
            return;
        }
        self.ensure_processed();
        let before = self.pagination.current_page;
        self.pagination.next(self.processed.len());
        self.page_changed(before);
    }

    pub fn prev_page(&mut self) {
        if !self.is_paginated() {
            return;
        }
        self.ensure_processed();
        let before = self.pagination.current_page;
        self.pagination.prev(self.processed.len());
        self.page_changed(before);
    }

    pub fn first_page(&mut self) {
        if !self.is_paginated() {
            return;
        }
        let before = self.pagination.current_page;
        self.pagination.first();
        self.page_changed(before);
    }

    pub fn last_page(&mut self) {
        if !self.is_paginated() {
            return;
        }
        self.ensure_processed();
        let before = self.pagination.current_page;
        self.pagination.last(self.processed.len());
        self.page_changed(before);
    }

    /// Change the page size, keeping the first visible row on screen.
    pub fn set_page_size(&mut self, page_size: usize) {
        if !self.is_paginated() || page_size == 0 || page_size == self.pagination.page_size {
            return;
        }
        self.ensure_processed();
        self.pagination.set_page_size(page_size, self.processed.len());
        log::debug!(
            "page size {} (page {})",
            page_size,
            self.pagination.current_page
        );
        self.touch();
        self.emit_settings();
        self.publish();
    }

    // --- virtualization ---

    /// Record a rendered row's height. Repeated measurements are no-ops.
    pub fn measure_row(&mut self, index: usize, height: f64) {
        self.ensure_processed();
        if self.virtualizer.measure(index, height) {
            self.touch();
            self.publish();
        }
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.ensure_processed();
        self.virtualizer.set_viewport_height(height);
        self.touch();
        self.publish();
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.ensure_processed();
        let before = self.virtualizer.scroll_offset();
        self.virtualizer.set_scroll_offset(offset);
        if self.virtualizer.scroll_offset() != before {
            self.touch();
            self.publish();
        }
    }

    /// Scroll a processed row into view. Returns the new scroll offset.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> f64 {
        self.ensure_processed();
        let offset = self.virtualizer.scroll_to_index(index, align);
        self.touch();
        self.publish();
        offset
    }

    // --- columns ---

    pub fn set_column_visible(&mut self, column_id: &str, visible: bool) -> bool {
        if !self.registry.contains(column_id) {
            return false;
        }
        self.settings.set_column_visible(column_id, visible);
        self.columns_changed();
        true
    }

    /// Resize a column within its bounds. Returns the stored width.
    pub fn resize_column(&mut self, column_id: &str, width: f32) -> Option<f32> {
        let column = self.registry.get(column_id)?;
        let width = self.settings.resize_column(column, width);
        self.touch();
        self.emit_settings();
        self.publish();
        Some(width)
    }

    /// Move a column to a position among the visible columns.
    pub fn reorder_column(&mut self, column_id: &str, to_index: usize) -> bool {
        if !self.settings.reorder_column(&self.registry, column_id, to_index) {
            return false;
        }
        self.touch();
        self.emit_settings();
        self.publish();
        true
    }

    /// Drop all visibility, width and order overrides.
    pub fn reset_columns(&mut self) {
        self.settings.reset_columns();
        self.columns_changed();
    }

    fn columns_changed(&mut self) {
        // Global search only looks at visible columns.
        if self.search.trim().is_empty() {
            self.touch();
        } else {
            self.invalidate();
        }
        self.emit_settings();
        self.publish();
    }

    // --- colour rules ---

    pub fn set_color_rules(&mut self, rules: Vec<ColorRule>) {
        log::debug!("colour rules applied: {}", rules.len());
        self.color_rules = rules;
        self.color_rules_changed();
    }

    /// Add a rule, replacing any rule with the same id.
    pub fn add_color_rule(&mut self, rule: ColorRule) {
        match self.color_rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => self.color_rules.push(rule),
        }
        self.color_rules_changed();
    }

    pub fn remove_color_rule(&mut self, rule_id: &str) -> bool {
        let before = self.color_rules.len();
        self.color_rules.retain(|r| r.id != rule_id);
        if self.color_rules.len() == before {
            return false;
        }
        self.color_rules_changed();
        true
    }

    /// Enable or disable a colour rule by id. Returns whether the rule exists.
    pub fn set_color_rule_enabled(&mut self, rule_id: &str, enabled: bool) -> bool {
        let Some(rule) = self.color_rules.iter_mut().find(|r| r.id == rule_id) else {
            return false;
        };
        rule.enabled = enabled;
        self.color_rules_changed();
        true
    }

    fn color_rules_changed(&mut self) {
        // Colours never change which rows are processed.
        self.touch();
        self.emit_settings();
        self.publish();
    }

    // --- settings ---

    /// Copy the session state into the settings and notify the listener.
    pub(crate) fn emit_settings(&mut self) {
        self.settings.sort = (!self.sort.is_empty()).then(|| self.sort.clone());
        self.settings.filters = (!self.filters.groups.is_empty()).then(|| self.filters.clone());
        self.settings.page_size = self.is_paginated().then_some(self.pagination.page_size);
        self.settings.color_rules = self.color_rules.clone();

        match self.settings_listener.as_mut() {
            Some(listener) => listener(&self.settings),
            None => {
                if !self.warned_no_listener {
                    log::warn!("settings changed but no settings listener is registered");
                    self.warned_no_listener = true;
                }
            }
        }
    }
}
