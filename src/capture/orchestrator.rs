//! Strategy selection, validation and escalation for one capture request.
//!
//! The Smart chain runs: resolve rect → background capture → basic
//! activation + capture → forced activation + capture, stopping at the first
//! usable frame. Activation is never touched when the background frame is
//! good. Each stage is timed and logged, and the timings are returned to the
//! caller in the [`CaptureReport`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::activator::{SettleDelays, WindowActivator};
use super::error::CaptureError;
use super::strategies::{capture_background, capture_handle, capture_window_region};
use super::types::{Bitmap, CaptureMethod, Rect, WindowId};
use super::validator::{DEFAULT_BLACK_THRESHOLD, FrameValidator};
use crate::platform::WindowSystem;

/// Result of a capture request. A degenerate frame is never a success.
pub type CaptureOutcome = Result<Bitmap, CaptureError>;

/// Strategy used once the window has been activated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivatedCapture {
    /// Screen grab of the now-current rect.
    #[default]
    Standard,
    /// Device-context copy of the window.
    Handle,
}

/// Tunables for the orchestrator. Tests use [`SettleDelays::none`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureSettings {
    pub black_threshold: f32,
    pub delays: SettleDelays,
    pub activated_capture: ActivatedCapture,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            black_threshold: DEFAULT_BLACK_THRESHOLD,
            delays: SettleDelays::default(),
            activated_capture: ActivatedCapture::default(),
        }
    }
}

/// A step of the capture state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    ResolveRect,
    Standard,
    Handle,
    Background,
    BasicActivation,
    ActivatedCapture,
    ForcedActivation,
    ForcedCapture,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResolveRect => "resolve rect",
            Stage::Standard => "standard capture",
            Stage::Handle => "handle capture",
            Stage::Background => "background capture",
            Stage::BasicActivation => "basic activation",
            Stage::ActivatedCapture => "capture after activation",
            Stage::ForcedActivation => "forced activation",
            Stage::ForcedCapture => "capture after forced activation",
        };
        f.write_str(name)
    }
}

/// Elapsed time and result of one stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
    pub error: Option<CaptureError>,
}

impl StageTiming {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a caller learns from one request.
#[derive(Debug)]
pub struct CaptureReport {
    pub window: WindowId,
    pub method: CaptureMethod,
    pub outcome: CaptureOutcome,
    pub stages: Vec<StageTiming>,
    pub elapsed: Duration,
}

impl CaptureReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn ran(&self, stage: Stage) -> usize {
        self.stages.iter().filter(|t| t.stage == stage).count()
    }

    /// One human-readable line: the chain attempted and where it stopped.
    pub fn summary(&self) -> String {
        let chain = self
            .stages
            .iter()
            .map(|t| t.stage.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");

        match &self.outcome {
            Ok(bitmap) => format!(
                "{} capture of {} succeeded ({}x{}) in {:.3}s via {}",
                self.method,
                self.window,
                bitmap.width(),
                bitmap.height(),
                self.elapsed.as_secs_f64(),
                chain
            ),
            Err(e) => {
                let stopped_at = self
                    .stages
                    .last()
                    .map(|t| t.stage.to_string())
                    .unwrap_or_else(|| "admission".to_string());
                let chain = if chain.is_empty() { "nothing".to_string() } else { chain };
                format!(
                    "{} capture of {} failed after {:.3}s: {}; attempted {}; stopped at {}",
                    self.method,
                    self.window,
                    self.elapsed.as_secs_f64(),
                    e,
                    chain,
                    stopped_at
                )
            }
        }
    }
}

/// Times, logs and records each stage of a request.
struct StageLog {
    window: WindowId,
    stages: Vec<StageTiming>,
}

impl StageLog {
    fn new(window: WindowId) -> Self {
        Self {
            window,
            stages: Vec::new(),
        }
    }

    fn run<T>(
        &mut self,
        stage: Stage,
        f: impl FnOnce() -> Result<T, CaptureError>,
    ) -> Result<T, CaptureError> {
        let started = Instant::now();
        let result = f();
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => log::info!(
                "[{}] {} ok in {:.3}s",
                self.window,
                stage,
                elapsed.as_secs_f64()
            ),
            Err(e) => log::info!(
                "[{}] {} failed in {:.3}s: {}",
                self.window,
                stage,
                elapsed.as_secs_f64(),
                e
            ),
        }

        self.stages.push(StageTiming {
            stage,
            elapsed,
            error: result.as_ref().err().cloned(),
        });
        result
    }
}

/// Removes a window from the in-flight set when the request ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<WindowId>>,
    window: WindowId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.window);
    }
}

pub struct CaptureOrchestrator {
    system: Arc<dyn WindowSystem>,
    activator: WindowActivator,
    validator: FrameValidator,
    settings: CaptureSettings,
    in_flight: Mutex<HashSet<WindowId>>,
}

impl CaptureOrchestrator {
    pub fn new(system: Arc<dyn WindowSystem>, settings: CaptureSettings) -> Self {
        Self {
            activator: WindowActivator::new(system.clone(), settings.delays),
            validator: FrameValidator::new(settings.black_threshold),
            system,
            settings,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn system(&self) -> &dyn WindowSystem {
        self.system.as_ref()
    }

    pub fn activator(&self) -> &WindowActivator {
        &self.activator
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Runs one capture request. Blocks for OS calls and settle delays, so
    /// call it from a worker thread.
    ///
    /// A second request for a window that already has one in flight is
    /// rejected with [`CaptureError::Busy`].
    pub fn capture(&self, window: WindowId, method: CaptureMethod) -> CaptureReport {
        let started = Instant::now();
        let mut log = StageLog::new(window);
        log::info!("Starting {} capture of {}", method, window);

        let outcome = match self.admit(window) {
            Some(_in_flight) => self.run_method(window, method, &mut log),
            None => {
                log::warn!("Rejected {} capture of {}: already in progress", method, window);
                Err(CaptureError::Busy)
            }
        };

        let report = CaptureReport {
            window,
            method,
            outcome,
            stages: log.stages,
            elapsed: started.elapsed(),
        };
        if report.is_success() {
            log::info!("{}", report.summary());
        } else {
            log::error!("{}", report.summary());
        }
        report
    }

    fn admit(&self, window: WindowId) -> Option<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(window) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            window,
        })
    }

    fn run_method(
        &self,
        window: WindowId,
        method: CaptureMethod,
        log: &mut StageLog,
    ) -> CaptureOutcome {
        let rect = log.run(Stage::ResolveRect, || self.resolve_rect(window))?;

        match method {
            CaptureMethod::Standard => log.run(Stage::Standard, || {
                capture_window_region(self.system(), window, rect)
                    .and_then(|b| self.validator.validate(b))
            }),
            CaptureMethod::Handle => log.run(Stage::Handle, || {
                capture_handle(self.system(), window).and_then(|b| self.validator.validate(b))
            }),
            CaptureMethod::Background => log.run(Stage::Background, || self.background(window)),
            CaptureMethod::Smart => self.run_smart(window, log),
            CaptureMethod::Auto => self.run_auto(window, rect, log),
        }
    }

    fn resolve_rect(&self, window: WindowId) -> Result<Rect, CaptureError> {
        if !self.system.is_valid(window) {
            return Err(CaptureError::WindowInvalid);
        }
        self.system.rect(window)
    }

    fn background(&self, window: WindowId) -> CaptureOutcome {
        capture_background(
            self.system(),
            window,
            &self.validator,
            self.settings.delays.restore,
        )
    }

    fn run_smart(&self, window: WindowId, log: &mut StageLog) -> CaptureOutcome {
        match log.run(Stage::Background, || self.background(window)) {
            Ok(bitmap) => return Ok(bitmap),
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => log::info!("Background capture of {} unusable; escalating", window),
        }
        self.escalate(window, log)
    }

    /// Plain grab without touching window state, then activation.
    fn run_auto(&self, window: WindowId, rect: Rect, log: &mut StageLog) -> CaptureOutcome {
        if self.system.is_minimized(window) {
            log::info!("{} is minimized; skipping plain grab", window);
        } else {
            match log.run(Stage::Standard, || {
                capture_window_region(self.system(), window, rect)
                    .and_then(|b| self.validator.validate(b))
            }) {
                Ok(bitmap) => return Ok(bitmap),
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => log::info!("Plain grab of {} unusable; escalating", window),
            }
        }
        self.escalate(window, log)
    }

    fn escalate(&self, window: WindowId, log: &mut StageLog) -> CaptureOutcome {
        if let Err(e) = log.run(Stage::BasicActivation, || {
            self.activator.activate_basic(window)
        }) {
            if e.is_fatal() {
                return Err(e);
            }
            log::warn!("Basic activation of {} failed ({}); capturing anyway", window, e);
        }

        match log.run(Stage::ActivatedCapture, || self.capture_activated(window)) {
            Ok(bitmap) => return Ok(bitmap),
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => log::info!("Capture after basic activation unusable; forcing activation"),
        }

        if let Err(e) = log.run(Stage::ForcedActivation, || {
            self.activator.activate_forced(window)
        }) {
            if e.is_fatal() {
                return Err(e);
            }
            log::warn!("Forced activation of {} failed ({}); capturing anyway", window, e);
        }

        log.run(Stage::ForcedCapture, || self.capture_activated(window))
            .map_err(|e| {
                if e.is_fatal() {
                    e
                } else {
                    CaptureError::CaptureFailed(format!(
                        "all capture methods exhausted (last attempt: {})",
                        e
                    ))
                }
            })
    }

    fn capture_activated(&self, window: WindowId) -> CaptureOutcome {
        let rect = self.resolve_rect(window)?;
        let bitmap = match self.settings.activated_capture {
            ActivatedCapture::Standard => capture_window_region(self.system(), window, rect)?,
            ActivatedCapture::Handle => capture_handle(self.system(), window)?,
        };
        self.validator.validate(bitmap)
    }
}
