//! Periodic capture of one window on a background thread.
//!
//! Captures immediately, then waits the interval in ticks, checking the stop
//! flag on every tick. Stopping is cooperative and bounded: a capture already
//! under way is allowed to finish, but [`AutoCapture::stop`] gives up waiting
//! after its timeout and detaches the thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::error::CaptureError;
use super::orchestrator::{CaptureOrchestrator, CaptureReport};
use super::types::{CaptureMethod, WindowId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoCaptureSettings {
    /// Time between the starts of two capture cycles.
    pub interval: Duration,
    /// Granularity of the stop-flag check while waiting.
    pub tick: Duration,
}

impl Default for AutoCaptureSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            tick: Duration::from_secs(1),
        }
    }
}

/// Delivered to the caller's handler once per cycle.
#[derive(Debug)]
pub enum AutoCaptureEvent {
    Captured { cycle: u64, report: CaptureReport },
    Failed { cycle: u64, report: CaptureReport },
    /// The window is gone; the loop has ended.
    WindowLost { cycle: u64 },
}

pub struct AutoCapture {
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl AutoCapture {
    /// Spawns the capture loop. `on_event` runs on the capture thread.
    pub fn start<F>(
        orchestrator: Arc<CaptureOrchestrator>,
        window: WindowId,
        method: CaptureMethod,
        settings: AutoCaptureSettings,
        mut on_event: F,
    ) -> io::Result<Self>
    where
        F: FnMut(AutoCaptureEvent) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = mpsc::channel();
        let flag = stop.clone();

        log::info!(
            "Auto-capture of {} every {:.1}s using {}",
            window,
            settings.interval.as_secs_f64(),
            method
        );

        let handle = thread::Builder::new()
            .name("auto-capture".to_string())
            .spawn(move || {
                run_loop(&orchestrator, window, method, settings, &flag, &mut on_event);
                let _ = done_tx.send(());
                log::info!("Auto-capture of {} finished", window);
            })?;

        Ok(Self {
            stop,
            done,
            handle: Some(handle),
        })
    }

    /// Asks the loop to end after the current tick or capture.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stops the loop and waits up to `timeout` for it to end.
    ///
    /// Returns `false` if the thread was still running when the timeout
    /// elapsed; it is then left detached and exits on its own.
    pub fn stop(mut self, timeout: Duration) -> bool {
        self.request_stop();

        let finished = match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };

        if let Some(handle) = self.handle.take() {
            if finished {
                if handle.join().is_err() {
                    log::error!("Auto-capture thread panicked");
                }
            } else {
                log::warn!(
                    "Auto-capture did not stop within {} ms; detaching",
                    timeout.as_millis()
                );
            }
        }
        finished
    }
}

impl Drop for AutoCapture {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn run_loop(
    orchestrator: &CaptureOrchestrator,
    window: WindowId,
    method: CaptureMethod,
    settings: AutoCaptureSettings,
    stop: &AtomicBool,
    on_event: &mut dyn FnMut(AutoCaptureEvent),
) {
    let tick = settings.tick.max(Duration::from_millis(1));
    let mut cycle = 0u64;

    while !stop.load(Ordering::SeqCst) {
        cycle += 1;
        let started = Instant::now();

        if !orchestrator.system().is_valid(window) {
            log::warn!("{} is no longer valid; stopping auto-capture", window);
            on_event(AutoCaptureEvent::WindowLost { cycle });
            return;
        }

        let report = orchestrator.capture(window, method);
        match &report.outcome {
            Ok(_) => on_event(AutoCaptureEvent::Captured { cycle, report }),
            Err(CaptureError::WindowInvalid) => {
                log::warn!("{} disappeared during capture; stopping auto-capture", window);
                on_event(AutoCaptureEvent::WindowLost { cycle });
                return;
            }
            Err(e) => {
                log::warn!("Auto-capture cycle {} failed: {}", cycle, e);
                on_event(AutoCaptureEvent::Failed { cycle, report });
            }
        }

        while !stop.load(Ordering::SeqCst) {
            let elapsed = started.elapsed();
            if elapsed >= settings.interval {
                break;
            }
            thread::sleep(tick.min(settings.interval - elapsed));
        }
    }
}
