//! System clipboard backed by arboard.

use datagrid_core::ClipboardProvider;

/// Platform clipboard. A fresh handle is opened per call, so a missing
/// display only fails the operation that needed it.
pub struct SystemClipboard;

impl ClipboardProvider for SystemClipboard {
    fn get_text(&mut self) -> Option<String> {
        let mut cb = arboard::Clipboard::new().ok()?;
        cb.get_text().ok()
    }

    fn set_text(&mut self, text: String) -> bool {
        let mut cb = match arboard::Clipboard::new() {
            Ok(cb) => cb,
            Err(e) => {
                log::warn!("clipboard unavailable: {}", e);
                return false;
            }
        };
        cb.set_text(text).is_ok()
    }
}
