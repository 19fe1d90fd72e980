//! Black-frame detection.
//!
//! Protected or GPU-composited windows often hand back an all-black buffer
//! without any error, so every candidate frame goes through this check.

use super::error::CaptureError;
use super::types::Bitmap;

/// Default mean-luminance threshold on a 0-255 scale.
pub const DEFAULT_BLACK_THRESHOLD: f32 = 10.0;

/// Classifies captured frames as usable or degenerate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameValidator {
    threshold: f32,
}

impl Default for FrameValidator {
    fn default() -> Self {
        Self::new(DEFAULT_BLACK_THRESHOLD)
    }
}

impl FrameValidator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Mean of the R, G and B values over all pixels (alpha ignored).
    ///
    /// Returns 0.0 for an empty bitmap.
    pub fn mean_luminance(bitmap: &Bitmap) -> f32 {
        let pixel_count = bitmap.width() as u64 * bitmap.height() as u64;
        if pixel_count == 0 {
            return 0.0;
        }

        let total: u64 = bitmap
            .pixels()
            .chunks_exact(4)
            .map(|px| px[0] as u64 + px[1] as u64 + px[2] as u64)
            .sum();

        (total as f64 / (pixel_count * 3) as f64) as f32
    }

    pub fn is_black(&self, bitmap: &Bitmap) -> bool {
        Self::mean_luminance(bitmap) < self.threshold
    }

    /// Passes a usable frame through, or reports it as [`CaptureError::BlackFrame`].
    pub fn validate(&self, bitmap: Bitmap) -> Result<Bitmap, CaptureError> {
        let mean_luminance = Self::mean_luminance(&bitmap);
        if mean_luminance < self.threshold {
            log::info!(
                "Black frame detected: mean luminance {:.1} below {:.1}",
                mean_luminance,
                self.threshold
            );
            return Err(CaptureError::BlackFrame { mean_luminance });
        }
        Ok(bitmap)
    }
}
