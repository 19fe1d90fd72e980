//! Window capture pipeline.
//!
//! This module provides:
//! - Capture strategies (`Standard`, `Handle`, `Background`) and the adaptive
//!   `Smart` and `Auto` chains (`CaptureOrchestrator`)
//! - Black-frame detection (`FrameValidator`)
//! - Escalating window activation (`WindowActivator`)
//! - A periodic capture loop (`AutoCapture`)

pub mod activator;
pub mod auto;
pub mod error;
pub mod orchestrator;
pub mod strategies;
pub mod types;
pub mod validator;

pub use activator::SettleDelays;
pub use auto::{AutoCapture, AutoCaptureEvent, AutoCaptureSettings};
pub use error::CaptureError;
pub use orchestrator::{ActivatedCapture, CaptureOrchestrator, CaptureReport, CaptureSettings};
pub use types::{Bitmap, CaptureMethod, Rect, WindowId};
pub use validator::DEFAULT_BLACK_THRESHOLD;
