//! Clipboard abstraction layer.
//!
//! Copy and paste go through [`ClipboardProvider`] so the table never talks to
//! a platform clipboard directly. Hosts plug in a system implementation; tests
//! use [`MemoryClipboard`].

/// Trait for clipboard operations.
pub trait ClipboardProvider {
    /// Get text from clipboard.
    fn get_text(&mut self) -> Option<String>;

    /// Set text to clipboard. Returns false when the write was refused.
    fn set_text(&mut self, text: String) -> bool;
}

/// In-process clipboard.
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
    /// Refuse writes, like a platform clipboard without permission.
    pub deny_writes: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            deny_writes: false,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn get_text(&mut self) -> Option<String> {
        self.text.clone()
    }

    fn set_text(&mut self, text: String) -> bool {
        if self.deny_writes {
            return false;
        }
        self.text = Some(text);
        true
    }
}
