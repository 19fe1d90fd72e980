//! Value types passed through the capture pipeline.

use image::{ImageBuffer, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::error::CaptureError;

/// Opaque identifier of a window owned by another process.
///
/// On Windows this is the raw `HWND` value. It is plain data so it can cross
/// thread boundaries; the window it names may be destroyed at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub isize);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("invalid window handle '{0}' (expected decimal or 0x-prefixed hex)")]
pub struct ParseWindowIdError(String);

impl FromStr for WindowId {
    type Err = ParseWindowIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => isize::from_str_radix(hex, 16),
            None => trimmed.parse::<isize>(),
        };
        match parsed {
            Ok(value) if value != 0 => Ok(WindowId(value)),
            _ => Err(ParseWindowIdError(s.to_string())),
        }
    }
}

/// Screen-space rectangle. Always has a positive width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Builds a rectangle, rejecting zero or negative area.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self, CaptureError> {
        if right <= left || bottom <= top {
            return Err(CaptureError::RectUnavailable(format!(
                "empty rectangle ({}, {}, {}, {})",
                left, top, right, bottom
            )));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn width(&self) -> u32 {
        (i64::from(self.right) - i64::from(self.left)) as u32
    }

    pub fn height(&self) -> u32 {
        (i64::from(self.bottom) - i64::from(self.top)) as u32
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width(),
            self.height(),
            self.left,
            self.top
        )
    }
}

/// Layout of the bytes held by a [`Bitmap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, row-major, R G B A.
    Rgba8,
}

/// Immutable captured frame.
///
/// Produced by exactly one strategy invocation; ownership passes to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    /// Builds a bitmap from top-down 32-bit rows in B G R X order, as GDI
    /// returns them. The fourth byte is ignored and written as opaque alpha.
    pub fn from_bgrx(width: u32, height: u32, mut data: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CaptureError::CaptureFailed(format!(
                "pixel buffer holds {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }

        for pixel in data.chunks_exact_mut(4) {
            pixel.swap(0, 2);
            pixel[3] = 255;
        }

        ImageBuffer::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| CaptureError::CaptureFailed("pixel buffer rejected".to_string()))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    /// Raw row-major pixel bytes in [`PixelFormat::Rgba8`].
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Which strategy, or chain of strategies, a capture request runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMethod {
    /// Screen-region grab of the window's rectangle.
    Standard,
    /// Block copy from the window's own device context.
    Handle,
    /// Plain grab first, then basic and forced activation.
    Auto,
    /// Restore without focus, then handle capture. Never activates.
    Background,
    /// Background first, escalating to basic then forced activation.
    #[default]
    Smart,
}

impl CaptureMethod {
    pub const ALL: [CaptureMethod; 5] = [
        CaptureMethod::Standard,
        CaptureMethod::Handle,
        CaptureMethod::Auto,
        CaptureMethod::Background,
        CaptureMethod::Smart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMethod::Standard => "standard",
            CaptureMethod::Handle => "handle",
            CaptureMethod::Auto => "auto",
            CaptureMethod::Background => "background",
            CaptureMethod::Smart => "smart",
        }
    }
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized method name. This is a caller error, not a capture failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capture method '{input}' (expected one of: standard, handle, auto, background, smart)")]
pub struct ParseMethodError {
    pub input: String,
}

impl FromStr for CaptureMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CaptureMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == wanted)
            .ok_or_else(|| ParseMethodError {
                input: s.to_string(),
            })
    }
}
