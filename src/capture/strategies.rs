//! Primitive acquisition strategies.
//!
//! Each one turns a window (or its rectangle) into a bitmap, or a typed error.
//! The adaptive Smart chain is composed from these in the orchestrator.

use std::time::Duration;

use super::activator::settle;
use super::error::CaptureError;
use super::types::{Bitmap, Rect, WindowId};
use super::validator::FrameValidator;
use crate::platform::WindowSystem;

/// Screen-region grab. Only correct when the window is on screen and unoccluded.
pub fn capture_standard(system: &dyn WindowSystem, rect: Rect) -> Result<Bitmap, CaptureError> {
    let bitmap = system.capture_region(rect)?;
    ensure_dimensions(&bitmap, rect)?;
    log::info!("Standard capture complete: {}", rect);
    Ok(bitmap)
}

/// Screen-region grab of `window`'s rectangle.
///
/// A screen grab succeeds even when the window is gone, so the window is
/// checked again once the pixels are in hand.
pub fn capture_window_region(
    system: &dyn WindowSystem,
    window: WindowId,
    rect: Rect,
) -> Result<Bitmap, CaptureError> {
    let bitmap = capture_standard(system, rect)?;
    if !system.is_valid(window) {
        log::warn!("{} closed during capture", window);
        return Err(CaptureError::WindowInvalid);
    }
    Ok(bitmap)
}

/// Block copy from the window's own device context.
///
/// Ignores occlusion, but still yields black for protected or GPU-composited
/// windows and for minimized ones.
pub fn capture_handle(system: &dyn WindowSystem, window: WindowId) -> Result<Bitmap, CaptureError> {
    let rect = system.rect(window)?;
    let bitmap = system.capture_window(window)?;
    ensure_dimensions(&bitmap, rect)?;
    log::info!("Handle capture of {} complete: {}", window, rect);
    Ok(bitmap)
}

/// Restores a minimized window without giving it focus, then captures it by
/// handle. A black result is reported as [`CaptureError::BlackFrame`].
pub fn capture_background(
    system: &dyn WindowSystem,
    window: WindowId,
    validator: &FrameValidator,
    restore_settle: Duration,
) -> Result<Bitmap, CaptureError> {
    if system.is_minimized(window) {
        log::info!("{} is minimized; restoring without activation", window);
        system.restore(window, false)?;
        settle(restore_settle);
    }

    let bitmap = capture_handle(system, window)?;
    validator.validate(bitmap)
}

fn ensure_dimensions(bitmap: &Bitmap, rect: Rect) -> Result<(), CaptureError> {
    if bitmap.width() != rect.width() || bitmap.height() != rect.height() {
        return Err(CaptureError::CaptureFailed(format!(
            "captured {}x{} but the window is {}x{}",
            bitmap.width(),
            bitmap.height(),
            rect.width(),
            rect.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{Call, FakeWindowSystem, Frame};

    const WINDOW: WindowId = WindowId(0x200);

    fn rect() -> Rect {
        Rect::new(100, 100, 500, 400).unwrap()
    }

    #[test]
    fn test_standard_matches_rect_size() {
        let system = FakeWindowSystem::with_window(WINDOW, rect());
        system.push_frames([Frame::Content(90)]);

        let bitmap = capture_standard(&system, rect()).unwrap();

        assert_eq!((bitmap.width(), bitmap.height()), (400, 300));
        assert_eq!(system.calls(), vec![Call::CaptureRegion(rect())]);
    }

    #[test]
    fn test_window_region_rejects_closed_window() {
        let system = FakeWindowSystem::with_window(WINDOW, rect());
        system.push_frames([Frame::Content(90), Frame::Content(90)]);

        assert!(capture_window_region(&system, WINDOW, rect()).is_ok());

        system.destroy(WINDOW);
        let err = capture_window_region(&system, WINDOW, rect()).unwrap_err();
        assert_eq!(err, CaptureError::WindowInvalid);
    }

    #[test]
    fn test_handle_matches_window_size() {
        let odd = Rect::new(-7, 13, 1018, 781).unwrap();
        let system = FakeWindowSystem::with_window(WINDOW, odd);
        system.push_frames([Frame::Content(90)]);

        let bitmap = capture_handle(&system, WINDOW).unwrap();

        assert_eq!((bitmap.width(), bitmap.height()), (odd.width(), odd.height()));
    }

    #[test]
    fn test_handle_failure_is_typed() {
        let system = FakeWindowSystem::with_window(WINDOW, rect());
        system.push_frames([Frame::Fail]);

        let err = capture_handle(&system, WINDOW).unwrap_err();
        assert_eq!(err.kind(), "capture-failed");
    }

    #[test]
    fn test_background_restores_without_activation() {
        let system = FakeWindowSystem::with_window(WINDOW, rect());
        system.minimize(WINDOW);
        system.push_frames([Frame::Content(120)]);

        let bitmap =
            capture_background(&system, WINDOW, &FrameValidator::default(), Duration::ZERO)
                .unwrap();

        assert_eq!((bitmap.width(), bitmap.height()), (400, 300));
        assert_eq!(system.count(&Call::Restore { activate: false }), 1);
        assert_eq!(system.count(&Call::SetForeground), 0);
    }

    #[test]
    fn test_background_black_is_an_error_value() {
        let system = FakeWindowSystem::with_window(WINDOW, rect());
        system.push_frames([Frame::Black]);

        let err = capture_background(&system, WINDOW, &FrameValidator::default(), Duration::ZERO)
            .unwrap_err();

        assert!(matches!(err, CaptureError::BlackFrame { .. }));
        assert_eq!(system.count(&Call::Restore { activate: false }), 0);
    }
}
