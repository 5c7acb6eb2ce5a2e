//! Pagination.
//!
//! Pages are 1-based. Navigation clamps to `[1, total_pages]` instead of
//! failing, and there is always at least one page.

use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
        }
    }
}

/// `max(1, ceil(total_items / page_size))`.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1)).max(1)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub current_page: usize,
    pub page_size: usize,
}

impl PaginationState {
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        total_pages(total_items, self.page_size)
    }

    /// Pull the current page back into range after the item count changed.
    pub fn clamp(&mut self, total_items: usize) {
        self.current_page = self.current_page.clamp(1, self.total_pages(total_items));
    }

    pub fn go_to(&mut self, page: usize, total_items: usize) {
        self.current_page = page.clamp(1, self.total_pages(total_items));
    }

    pub fn next(&mut self, total_items: usize) {
        self.go_to(self.current_page.saturating_add(1), total_items);
    }

    pub fn prev(&mut self, total_items: usize) {
        self.go_to(self.current_page.saturating_sub(1), total_items);
    }

    pub fn first(&mut self) {
        self.current_page = 1;
    }

    pub fn last(&mut self, total_items: usize) {
        self.current_page = self.total_pages(total_items);
    }

    /// Change the page size, keeping the first visible item on screen.
    pub fn set_page_size(&mut self, page_size: usize, total_items: usize) {
        let page_size = page_size.max(1);
        let first_index = (self.current_page - 1) * self.page_size;
        self.page_size = page_size;
        self.go_to(first_index / page_size + 1, total_items);
    }

    /// Index range of the current page within the processed rows.
    pub fn range(&self, total_items: usize) -> Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(total_items);
        let end = (start + self.page_size).min(total_items);
        start..end
    }

    pub fn info(&self, total_items: usize) -> PageInfo {
        let total_pages = self.total_pages(total_items);
        let range = self.range(total_items);
        let (start_index, end_index) = if range.is_empty() {
            (0, 0)
        } else {
            (range.start + 1, range.end)
        };
        PageInfo {
            current_page: self.current_page,
            page_size: self.page_size,
            total_items,
            total_pages,
            start_index,
            end_index,
            has_next_page: self.current_page < total_pages,
            has_prev_page: self.current_page > 1,
        }
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Derived page metadata. `start_index`/`end_index` are 1-based and
/// inclusive, or both 0 when there are no items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    /// "Showing X-Y of Z" label.
    pub fn label(&self) -> String {
        format!(
            "Showing {}-{} of {}",
            self.start_index, self.end_index, self.total_items
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_minimum_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut state = PaginationState::new(10);
        state.go_to(99, 25);
        assert_eq!(state.current_page, 3);
        state.next(25);
        assert_eq!(state.current_page, 3);
        state.go_to(0, 25);
        assert_eq!(state.current_page, 1);
        state.prev(25);
        assert_eq!(state.current_page, 1);
        state.last(25);
        assert_eq!(state.current_page, 3);
    }

    #[test]
    fn test_page_size_change_keeps_position() {
        let mut state = PaginationState::new(10);
        state.go_to(4, 100); // first item index 30
        state.set_page_size(25, 100);
        assert_eq!(state.current_page, 2);
        state.set_page_size(50, 100); // first index 25
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn test_pages_concatenate_to_whole() {
        let n = 23;
        let mut state = PaginationState::new(5);
        let mut seen = Vec::new();
        for page in 1..=state.total_pages(n) {
            state.go_to(page, n);
            seen.extend(state.range(n));
        }
        assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_info_indices() {
        let mut state = PaginationState::new(10);
        state.go_to(3, 25);
        let info = state.info(25);
        assert_eq!((info.start_index, info.end_index), (21, 25));
        assert!(!info.has_next_page);
        assert!(info.has_prev_page);
        assert_eq!(info.label(), "Showing 21-25 of 25");

        let empty = PaginationState::new(10).info(0);
        assert_eq!((empty.start_index, empty.end_index, empty.total_pages), (0, 0, 1));
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut state = PaginationState::new(10);
        state.go_to(5, 50);
        state.clamp(12);
        assert_eq!(state.current_page, 2);
    }
}
