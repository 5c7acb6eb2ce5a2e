//! Row virtualization.
//!
//! Only a window of rows around the scroll position is materialised. Every row
//! has a height, seeded with an estimate and refined by measurement, and the
//! rows outside the window are represented by two paddings so the scroll
//! extent stays exact.

use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: usize = 100;
pub const DEFAULT_ROW_HEIGHT: f64 = 48.0;
pub const DEFAULT_OVERSCAN: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualizerConfig {
    /// Row count at which virtualization switches on.
    pub threshold: usize,
    pub estimated_row_height: f64,
    /// Extra rows kept above and below the visible range.
    pub overscan: usize,
    /// Virtualize regardless of the row count.
    pub force: bool,
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            estimated_row_height: DEFAULT_ROW_HEIGHT,
            overscan: DEFAULT_OVERSCAN,
            force: false,
        }
    }
}

/// Where a row should land when scrolled to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Start,
    Center,
    End,
    /// Scroll only as far as needed to bring the row into view.
    #[default]
    Auto,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f64,
    pub size: f64,
}

/// The rows to materialise and the space around them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualWindow {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub items: Vec<VirtualItem>,
    pub padding_top: f64,
    pub padding_bottom: f64,
    pub total_height: f64,
    pub virtualized: bool,
}

impl VirtualWindow {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

#[derive(Clone, Debug)]
pub struct Virtualizer {
    config: VirtualizerConfig,
    heights: Vec<f64>,
    /// Prefix sums of `heights`, one longer than it. Rebuilt lazily.
    offsets: Vec<f64>,
    offsets_dirty: bool,
    scroll_offset: f64,
    viewport_height: f64,
}

impl Virtualizer {
    pub fn new(config: VirtualizerConfig) -> Self {
        Self {
            config,
            heights: Vec::new(),
            offsets: vec![0.0],
            offsets_dirty: false,
            scroll_offset: 0.0,
            viewport_height: 0.0,
        }
    }

    pub fn config(&self) -> &VirtualizerConfig {
        &self.config
    }

    pub fn row_count(&self) -> usize {
        self.heights.len()
    }

    pub fn is_active(&self) -> bool {
        self.config.force || self.heights.len() >= self.config.threshold
    }

    /// Resize to the row count. Existing measurements are kept.
    pub fn set_row_count(&mut self, count: usize) {
        if count != self.heights.len() {
            self.heights.resize(count, self.config.estimated_row_height);
            self.offsets_dirty = true;
            self.clamp_scroll();
        }
    }

    /// Forget all measurements.
    pub fn reset_measurements(&mut self) {
        let estimate = self.config.estimated_row_height;
        self.heights.iter_mut().for_each(|h| *h = estimate);
        self.offsets_dirty = true;
        self.scroll_offset = 0.0;
    }

    /// Record a measured height. Repeating a measurement is a no-op.
    /// Returns whether anything changed.
    pub fn measure(&mut self, index: usize, height: f64) -> bool {
        if !height.is_finite() || height < 0.0 {
            return false;
        }
        match self.heights.get_mut(index) {
            Some(h) if *h != height => {
                *h = height;
                self.offsets_dirty = true;
                true
            }
            _ => false,
        }
    }

    pub fn row_height(&self, index: usize) -> Option<f64> {
        self.heights.get(index).copied()
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        self.clamp_scroll();
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = if offset.is_finite() { offset } else { 0.0 };
        self.clamp_scroll();
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    fn rebuild_offsets(&mut self) {
        if !self.offsets_dirty && self.offsets.len() == self.heights.len() + 1 {
            return;
        }
        self.offsets.clear();
        self.offsets.reserve(self.heights.len() + 1);
        let mut acc = 0.0;
        self.offsets.push(acc);
        for h in &self.heights {
            acc += h;
            self.offsets.push(acc);
        }
        self.offsets_dirty = false;
    }

    /// Total scroll extent: measured heights where known, estimates elsewhere.
    pub fn total_height(&mut self) -> f64 {
        if self.is_active() {
            self.rebuild_offsets();
            self.offsets[self.heights.len()]
        } else {
            self.heights.len() as f64 * self.config.estimated_row_height
        }
    }

    fn clamp_scroll(&mut self) {
        let total = self.total_height();
        let max = (total - self.viewport_height).max(0.0);
        self.scroll_offset = self.scroll_offset.clamp(0.0, max);
    }

    /// Start and size of a row. Non-virtualized rows use the estimate.
    fn item_bounds(&mut self, index: usize) -> (f64, f64) {
        if self.is_active() {
            self.rebuild_offsets();
            (self.offsets[index], self.heights[index])
        } else {
            let h = self.config.estimated_row_height;
            (index as f64 * h, h)
        }
    }

    /// Compute the window for the current scroll position.
    pub fn window(&mut self) -> VirtualWindow {
        let count = self.heights.len();
        if count == 0 {
            return VirtualWindow {
                virtualized: self.is_active(),
                ..VirtualWindow::default()
            };
        }

        if !self.is_active() {
            let h = self.config.estimated_row_height;
            return VirtualWindow {
                start: 0,
                end: count,
                items: (0..count)
                    .map(|index| VirtualItem {
                        index,
                        start: index as f64 * h,
                        size: h,
                    })
                    .collect(),
                padding_top: 0.0,
                padding_bottom: 0.0,
                total_height: count as f64 * h,
                virtualized: false,
            };
        }

        self.rebuild_offsets();
        let starts = &self.offsets[..count];
        let top = self.scroll_offset;
        let bottom = top + self.viewport_height;

        let first = starts.partition_point(|&o| o <= top).saturating_sub(1);
        let last = starts.partition_point(|&o| o < bottom).max(first + 1);

        let start = first.saturating_sub(self.config.overscan);
        let end = (last + self.config.overscan).min(count);
        let total = self.offsets[count];

        VirtualWindow {
            start,
            end,
            items: (start..end)
                .map(|index| VirtualItem {
                    index,
                    start: self.offsets[index],
                    size: self.heights[index],
                })
                .collect(),
            padding_top: self.offsets[start],
            padding_bottom: total - self.offsets[end],
            total_height: total,
            virtualized: true,
        }
    }

    /// Scroll so that `index` is placed per `align`. Returns the new offset.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> f64 {
        let count = self.heights.len();
        if count == 0 {
            self.scroll_offset = 0.0;
            return 0.0;
        }
        let index = index.min(count - 1);
        let (start, size) = self.item_bounds(index);
        let viewport = self.viewport_height;

        let target = match align {
            Align::Start => start,
            Align::End => start + size - viewport,
            Align::Center => start + size / 2.0 - viewport / 2.0,
            Align::Auto => {
                if start < self.scroll_offset {
                    start
                } else if start + size > self.scroll_offset + viewport {
                    start + size - viewport
                } else {
                    self.scroll_offset
                }
            }
        };
        self.set_scroll_offset(target);
        self.scroll_offset
    }
}

impl Default for Virtualizer {
    fn default() -> Self {
        Self::new(VirtualizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn virtualizer(rows: usize, viewport: f64) -> Virtualizer {
        let mut v = Virtualizer::default();
        v.set_row_count(rows);
        v.set_viewport_height(viewport);
        v
    }

    fn window_height(w: &VirtualWindow) -> f64 {
        w.padding_top + w.items.iter().map(|i| i.size).sum::<f64>() + w.padding_bottom
    }

    #[test]
    fn test_threshold_activation() {
        assert!(!virtualizer(99, 480.0).is_active());
        assert!(virtualizer(100, 480.0).is_active());

        let mut forced = Virtualizer::new(VirtualizerConfig {
            force: true,
            ..VirtualizerConfig::default()
        });
        forced.set_row_count(3);
        assert!(forced.is_active());
    }

    #[test]
    fn test_padding_preserves_total_height() {
        let mut v = virtualizer(1000, 480.0);
        let w = v.window();
        assert_eq!(window_height(&w), 1000.0 * 48.0);
        assert_eq!(w.padding_top, 0.0);

        v.set_scroll_offset(24_000.0);
        let w = v.window();
        assert_eq!(window_height(&w), 1000.0 * 48.0);
        assert!(w.padding_top > 0.0 && w.padding_bottom > 0.0);
    }

    #[test]
    fn test_window_includes_overscan() {
        let mut v = virtualizer(1000, 480.0);
        v.set_scroll_offset(48.0 * 100.0);
        let w = v.window();
        assert_eq!(w.start, 95);
        assert_eq!(w.end, 115);
        assert_eq!(w.padding_top, 95.0 * 48.0);
    }

    #[test]
    fn test_measure_is_idempotent() {
        let mut v = virtualizer(200, 480.0);
        assert!(v.measure(0, 60.0));
        assert!(!v.measure(0, 60.0));
        assert!(!v.measure(999, 60.0));
        assert!(!v.measure(1, f64::NAN));
        assert_eq!(v.total_height(), 199.0 * 48.0 + 60.0);
        let w = v.window();
        assert_eq!(window_height(&w), 199.0 * 48.0 + 60.0);
    }

    #[test]
    fn test_non_virtualized_window_is_everything() {
        let mut v = virtualizer(10, 100.0);
        let w = v.window();
        assert!(!w.virtualized);
        assert_eq!(w.range(), 0..10);
        assert_eq!((w.padding_top, w.padding_bottom), (0.0, 0.0));
    }

    #[test]
    fn test_scroll_to_index_alignments() {
        let mut v = virtualizer(1000, 480.0);
        assert_eq!(v.scroll_to_index(100, Align::Start), 4800.0);
        assert_eq!(v.scroll_to_index(100, Align::End), 4848.0 - 480.0);
        assert_eq!(v.scroll_to_index(100, Align::Center), 4824.0 - 240.0);

        v.set_scroll_offset(4800.0);
        assert_eq!(v.scroll_to_index(102, Align::Auto), 4800.0);
        assert_eq!(v.scroll_to_index(50, Align::Auto), 2400.0);
        assert_eq!(v.scroll_to_index(5000, Align::Start), 1000.0 * 48.0 - 480.0);
    }

    #[test]
    fn test_scroll_to_index_without_virtualization() {
        let mut v = virtualizer(50, 240.0);
        assert!(!v.is_active());
        assert_eq!(v.scroll_to_index(10, Align::Start), 480.0);
    }
}
