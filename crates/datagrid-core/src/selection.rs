//! Row selection.
//!
//! Selection is a set of row keys. Range and select-all operations work on the
//! processed (filtered and sorted) ordering, which the caller passes in. Keys
//! that no longer exist in the data are never an error: they are simply
//! dropped when the selected rows are read back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use datagrid_engine::engine::{Row, RowKey};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    selected: BTreeSet<RowKey>,
    /// True right after an action left every processed row selected.
    select_all: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.selected.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.selected.iter()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_select_all(&self) -> bool {
        self.select_all
    }

    fn equals_processed(&self, processed: &[RowKey]) -> bool {
        !processed.is_empty()
            && self.selected.len() == processed.len()
            && processed.iter().all(|k| self.selected.contains(k))
    }

    fn refresh_flag(&mut self, processed: &[RowKey]) {
        self.select_all = self.equals_processed(processed);
    }

    pub fn toggle_row(&mut self, key: &RowKey, processed: &[RowKey]) {
        if !self.selected.remove(key) {
            self.selected.insert(key.clone());
        }
        self.refresh_flag(processed);
    }

    pub fn select_row(&mut self, key: &RowKey, processed: &[RowKey]) {
        self.selected.insert(key.clone());
        self.refresh_flag(processed);
    }

    pub fn deselect_row(&mut self, key: &RowKey, processed: &[RowKey]) {
        self.selected.remove(key);
        self.refresh_flag(processed);
    }

    /// Select exactly the processed rows.
    pub fn select_all(&mut self, processed: &[RowKey]) {
        self.selected = processed.iter().cloned().collect();
        self.refresh_flag(processed);
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
        self.select_all = false;
    }

    /// Clear when the selection is exactly the processed rows, otherwise
    /// select them.
    pub fn toggle_all(&mut self, processed: &[RowKey]) {
        if self.equals_processed(processed) {
            self.deselect_all();
        } else {
            self.select_all(processed);
        }
    }

    /// Add the contiguous processed slice between two keys, in either order.
    /// No-op when either key is not in the processed ordering.
    pub fn select_range(&mut self, start: &RowKey, end: &RowKey, processed: &[RowKey]) -> bool {
        let from = processed.iter().position(|k| k == start);
        let to = processed.iter().position(|k| k == end);
        let (Some(from), Some(to)) = (from, to) else {
            return false;
        };
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        self.selected.extend(processed[lo..=hi].iter().cloned());
        self.refresh_flag(processed);
        true
    }

    /// Drop every key the predicate rejects.
    pub fn retain(&mut self, keep: impl Fn(&RowKey) -> bool) {
        self.selected.retain(|k| keep(k));
    }

    /// Selected rows, in data order. Keys without a live row are skipped.
    pub fn selected_rows<'a>(&self, rows: &'a [Row], key_field: &str) -> Vec<&'a Row> {
        if self.selected.is_empty() {
            return Vec::new();
        }
        rows.iter()
            .filter(|row| row.key(key_field).is_some_and(|k| self.selected.contains(&k)))
            .collect()
    }

    /// Selected keys that still have a live row.
    pub fn live_keys(&self, rows: &[Row], key_field: &str) -> HashSet<RowKey> {
        rows.iter()
            .filter_map(|row| row.key(key_field))
            .filter(|k| self.selected.contains(k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ids: &[i32]) -> Vec<RowKey> {
        ids.iter().map(|&i| RowKey::from(i)).collect()
    }

    fn selected(state: &SelectionState) -> Vec<String> {
        state.keys().map(|k| k.0.clone()).collect()
    }

    #[test]
    fn test_select_range_in_processed_order() {
        let processed = keys(&[1, 2, 3, 4, 5]);
        let mut state = SelectionState::new();
        assert!(state.select_range(&RowKey::from(2), &RowKey::from(4), &processed));
        assert_eq!(selected(&state), vec!["2", "3", "4"]);
    }

    #[test]
    fn test_select_range_reversed_and_sorted_view() {
        let processed = keys(&[5, 3, 1, 4, 2]);
        let mut state = SelectionState::new();
        state.select_range(&RowKey::from(4), &RowKey::from(3), &processed);
        assert_eq!(selected(&state), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_select_range_unknown_id_is_noop() {
        let processed = keys(&[1, 2, 3, 4, 5]);
        let mut state = SelectionState::new();
        state.select_row(&RowKey::from(1), &processed);
        let before = state.clone();
        assert!(!state.select_range(&RowKey::from(2), &RowKey::from(99), &processed));
        assert_eq!(state, before);
    }

    #[test]
    fn test_toggle_all_twice_is_identity() {
        let processed = keys(&[1, 2, 3]);

        let mut state = SelectionState::new();
        let before = state.clone();
        state.toggle_all(&processed);
        assert!(state.is_select_all());
        state.toggle_all(&processed);
        assert_eq!(state, before);

        let mut state = SelectionState::new();
        state.select_all(&processed);
        let before = state.clone();
        state.toggle_all(&processed);
        assert!(state.is_empty());
        state.toggle_all(&processed);
        assert_eq!(state, before);
    }

    #[test]
    fn test_toggle_all_scoped_to_processed() {
        let filtered = keys(&[2, 4]);
        let mut state = SelectionState::new();
        state.toggle_all(&filtered);
        assert_eq!(selected(&state), vec!["2", "4"]);
    }

    #[test]
    fn test_individual_actions_track_flag() {
        let processed = keys(&[1, 2]);
        let mut state = SelectionState::new();
        state.toggle_row(&RowKey::from(1), &processed);
        assert!(!state.is_select_all());
        state.toggle_row(&RowKey::from(2), &processed);
        assert!(state.is_select_all());
        state.deselect_row(&RowKey::from(2), &processed);
        assert!(!state.is_select_all());
        state.toggle_row(&RowKey::from(1), &processed);
        assert!(state.is_empty());
    }

    #[test]
    fn test_selected_rows_drop_stale_keys() {
        let rows = vec![
            Row::new().with("id", 1).with("name", "a"),
            Row::new().with("id", 3).with("name", "c"),
        ];
        let mut state = SelectionState::new();
        state.select_all(&keys(&[1, 2, 3]));
        let live: Vec<_> = state
            .selected_rows(&rows, "id")
            .iter()
            .map(|r| r.get("name").to_plain_string())
            .collect();
        assert_eq!(live, vec!["a", "c"]);
        assert_eq!(state.live_keys(&rows, "id").len(), 2);
    }
}
