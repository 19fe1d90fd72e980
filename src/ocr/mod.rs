//! Text recognition on captured bitmaps.

pub mod annotate;
pub mod engine;
pub mod setup;

pub use annotate::annotate;
pub use engine::TesseractRecognizer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::Bitmap;

/// Position in bitmap pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// One recognised word.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub text: String,
    /// 0.0 to 1.0
    pub confidence: f32,
    /// Corners clockwise from top-left.
    pub polygon: [Point; 4],
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("tesseract executable not found (configure ocr.tesseract_path or add it to PATH)")]
    ExecutableNotFound,

    #[error("failed to encode image for recognition: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error during recognition: {0}")]
    Io(#[from] std::io::Error),

    #[error("tesseract exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Turns a bitmap into text records.
pub trait TextRecognizer {
    fn recognize(&self, bitmap: &Bitmap) -> Result<Vec<TextRecord>, RecognitionError>;
}
