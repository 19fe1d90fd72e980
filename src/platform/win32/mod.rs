//! Win32 implementation of the window-system interface.

mod gdi;
mod window;

pub use window::{Win32WindowLocator, enumerate_windows};

use std::ffi::c_void;

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::System::Threading::{AttachThreadInput, GetCurrentThreadId};
use windows::Win32::UI::HiDpi::{PROCESS_PER_MONITOR_DPI_AWARE, SetProcessDpiAwareness};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, GetWindowRect, GetWindowThreadProcessId, IsIconic, IsWindow,
    SW_RESTORE, SW_SHOW, SW_SHOWNOACTIVATE, SetForegroundWindow, ShowWindow,
};

use super::{InputAttachment, WindowSystem};
use crate::capture::{Bitmap, CaptureError, Rect, WindowId};

fn hwnd(window: WindowId) -> HWND {
    HWND(window.0 as *mut c_void)
}

/// Makes window rectangles and screen copies use physical pixels.
///
/// Must run before any window is measured. Failure (already set, e.g. by a
/// manifest) is logged and ignored.
pub fn enable_dpi_awareness() {
    unsafe {
        if let Err(e) = SetProcessDpiAwareness(PROCESS_PER_MONITOR_DPI_AWARE) {
            log::debug!("SetProcessDpiAwareness: {}", e);
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Win32WindowSystem;

impl Win32WindowSystem {
    pub fn new() -> Self {
        Self
    }

    fn ensure_valid(&self, window: WindowId) -> Result<HWND, CaptureError> {
        if !self.is_valid(window) {
            return Err(CaptureError::WindowInvalid);
        }
        Ok(hwnd(window))
    }
}

impl WindowSystem for Win32WindowSystem {
    fn is_valid(&self, window: WindowId) -> bool {
        window.0 != 0 && unsafe { IsWindow(hwnd(window)).as_bool() }
    }

    fn rect(&self, window: WindowId) -> Result<Rect, CaptureError> {
        let hwnd = self.ensure_valid(window)?;
        let mut r = RECT::default();
        if let Err(e) = unsafe { GetWindowRect(hwnd, &mut r) } {
            // The window may have been destroyed since the validity check.
            if !self.is_valid(window) {
                return Err(CaptureError::WindowInvalid);
            }
            return Err(CaptureError::RectUnavailable(format!(
                "GetWindowRect failed: {}",
                e
            )));
        }
        Rect::new(r.left, r.top, r.right, r.bottom)
    }

    fn is_minimized(&self, window: WindowId) -> bool {
        unsafe { IsIconic(hwnd(window)).as_bool() }
    }

    fn restore(&self, window: WindowId, activate: bool) -> Result<(), CaptureError> {
        let hwnd = self.ensure_valid(window)?;
        let command = if activate { SW_RESTORE } else { SW_SHOWNOACTIVATE };
        // Return value is the previous visibility, not success.
        let _ = unsafe { ShowWindow(hwnd, command) };
        Ok(())
    }

    fn show(&self, window: WindowId) -> Result<(), CaptureError> {
        let hwnd = self.ensure_valid(window)?;
        let _ = unsafe { ShowWindow(hwnd, SW_SHOW) };
        Ok(())
    }

    fn set_foreground(&self, window: WindowId) -> Result<(), CaptureError> {
        let hwnd = self.ensure_valid(window)?;
        if !unsafe { SetForegroundWindow(hwnd).as_bool() } {
            return Err(CaptureError::CaptureFailed(
                "SetForegroundWindow was refused".to_string(),
            ));
        }
        Ok(())
    }

    fn bring_to_top(&self, window: WindowId) -> Result<(), CaptureError> {
        let hwnd = self.ensure_valid(window)?;
        unsafe { BringWindowToTop(hwnd) }
            .map_err(|e| CaptureError::CaptureFailed(format!("BringWindowToTop failed: {}", e)))
    }

    fn attach_input(&self, window: WindowId) -> Result<Option<InputAttachment>, CaptureError> {
        let hwnd = self.ensure_valid(window)?;
        let (current, target) =
            unsafe { (GetCurrentThreadId(), GetWindowThreadProcessId(hwnd, None)) };

        if target == 0 {
            return Err(CaptureError::CaptureFailed(
                "could not resolve the window's owning thread".to_string(),
            ));
        }
        if target == current {
            return Ok(None);
        }

        if !unsafe { AttachThreadInput(current, target, true).as_bool() } {
            return Err(CaptureError::CaptureFailed(format!(
                "AttachThreadInput({} -> {}) failed",
                current, target
            )));
        }
        Ok(Some(InputAttachment {
            from_thread: current,
            to_thread: target,
        }))
    }

    fn detach_input(&self, attachment: InputAttachment) {
        let ok = unsafe {
            AttachThreadInput(attachment.from_thread, attachment.to_thread, false).as_bool()
        };
        if !ok {
            log::warn!(
                "AttachThreadInput detach ({} -> {}) failed",
                attachment.from_thread,
                attachment.to_thread
            );
        }
    }

    fn capture_region(&self, rect: Rect) -> Result<Bitmap, CaptureError> {
        gdi::capture_screen_region(rect.left, rect.top, rect.width(), rect.height())
    }

    fn capture_window(&self, window: WindowId) -> Result<Bitmap, CaptureError> {
        let rect = self.rect(window)?;
        gdi::capture_window_dc(hwnd(window), rect.width(), rect.height())
    }
}
