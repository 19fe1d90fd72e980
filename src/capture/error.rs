//! Failure taxonomy for capture requests.

use thiserror::Error;

/// Why a capture request (or one stage of it) did not produce a usable bitmap.
///
/// Every OS-level failure is converted into one of these at the platform
/// boundary, so nothing lower-level escapes the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// The handle no longer refers to an existing window.
    #[error("window no longer exists")]
    WindowInvalid,

    /// The geometry query failed or produced an empty rectangle.
    #[error("window geometry unavailable: {0}")]
    RectUnavailable(String),

    /// An OS call did not produce bits.
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// Bits were produced but the frame is degenerate (unpainted or protected).
    #[error("black frame (mean luminance {mean_luminance:.1})")]
    BlackFrame { mean_luminance: f32 },

    /// Another capture is already running against the same window.
    #[error("a capture is already in progress for this window")]
    Busy,
}

impl CaptureError {
    /// Returns true when no further strategy can help for this request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::WindowInvalid | CaptureError::RectUnavailable(_) | CaptureError::Busy
        )
    }

    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::WindowInvalid => "window-invalid",
            CaptureError::RectUnavailable(_) => "rect-unavailable",
            CaptureError::CaptureFailed(_) => "capture-failed",
            CaptureError::BlackFrame { .. } => "black-frame",
            CaptureError::Busy => "busy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        assert!(CaptureError::WindowInvalid.is_fatal());
        assert!(CaptureError::RectUnavailable("gone".into()).is_fatal());
        assert!(CaptureError::Busy.is_fatal());
        assert!(!CaptureError::CaptureFailed("BitBlt".into()).is_fatal());
        assert!(!CaptureError::BlackFrame { mean_luminance: 0.0 }.is_fatal());
    }

    #[test]
    fn test_black_frame_message() {
        let err = CaptureError::BlackFrame {
            mean_luminance: 3.21,
        };
        assert_eq!(err.to_string(), "black frame (mean luminance 3.2)");
        assert_eq!(err.kind(), "black-frame");
    }
}
