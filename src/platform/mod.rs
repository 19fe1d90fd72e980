//! Window-system capability interface.
//!
//! The capture pipeline never calls the OS directly. Everything it needs from
//! the windowing system goes through [`WindowSystem`], which has one Win32
//! implementation and a scripted fake for tests.

#[cfg(test)]
pub mod fake;
#[cfg(windows)]
pub mod win32;

use serde::Serialize;

use crate::capture::{Bitmap, CaptureError, Rect, WindowId};

/// A joined pair of thread input queues, released by [`WindowSystem::detach_input`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputAttachment {
    pub from_thread: u32,
    pub to_thread: u32,
}

/// Primitive window operations used by the activator and the strategies.
///
/// All calls are synchronous and must tolerate the window disappearing
/// between calls.
pub trait WindowSystem: Send + Sync {
    /// Whether the handle still refers to an existing window. Never fails.
    fn is_valid(&self, window: WindowId) -> bool;

    /// Screen-space bounds of the whole window.
    fn rect(&self, window: WindowId) -> Result<Rect, CaptureError>;

    fn is_minimized(&self, window: WindowId) -> bool;

    /// Restores a minimized window. With `activate == false` the window is
    /// shown without taking focus.
    fn restore(&self, window: WindowId, activate: bool) -> Result<(), CaptureError>;

    fn show(&self, window: WindowId) -> Result<(), CaptureError>;

    fn set_foreground(&self, window: WindowId) -> Result<(), CaptureError>;

    /// Moves the window to the top of the Z-order without moving or resizing it.
    fn bring_to_top(&self, window: WindowId) -> Result<(), CaptureError>;

    /// Joins the calling thread's input queue to the thread owning `window`.
    ///
    /// Returns `Ok(None)` when the calling thread already owns the window.
    fn attach_input(&self, window: WindowId) -> Result<Option<InputAttachment>, CaptureError>;

    /// Must be called from the thread that made the attachment.
    fn detach_input(&self, attachment: InputAttachment);

    /// Grabs whatever is on screen inside `rect`.
    fn capture_region(&self, rect: Rect) -> Result<Bitmap, CaptureError>;

    /// Copies the window's own device context, sized to its current rect.
    fn capture_window(&self, window: WindowId) -> Result<Bitmap, CaptureError>;
}

/// One candidate window produced by a [`WindowLocator`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WindowRecord {
    pub process_id: u32,
    pub process_name: String,
    pub window_title: String,
    pub window: WindowId,
}

/// Finds windows by process name or title.
pub trait WindowLocator {
    fn find(&self, keyword: &str) -> Vec<WindowRecord>;

    /// Process details of a known window, if it still exists.
    fn describe(&self, _window: WindowId) -> Option<WindowRecord> {
        None
    }
}

/// Case-insensitive keyword match against the process name or window title.
pub fn matches_keyword(process_name: &str, window_title: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    process_name.to_lowercase().contains(&keyword)
        || window_title.to_lowercase().contains(&keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_keyword() {
        assert!(matches_keyword("Notepad.exe", "Untitled - Notepad", "notepad"));
        assert!(matches_keyword("chrome.exe", "Inbox - Mail", "INBOX"));
        assert!(!matches_keyword("chrome.exe", "Inbox - Mail", "firefox"));
        assert!(!matches_keyword("chrome.exe", "Inbox - Mail", "  "));
    }
}
