//! Escalating focus acquisition for target windows.
//!
//! Two tiers:
//! - basic: restore, show, set foreground, wait for the compositor
//! - forced: the same, but with the calling thread's input queue attached to
//!   the target's owning thread so the foreground switch is not refused
//!
//! A forced attachment is always released before `activate_forced` returns,
//! including on error and while unwinding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::error::CaptureError;
use super::types::WindowId;
use crate::platform::{InputAttachment, WindowSystem};

/// Waits inserted after window state changes so the compositor can repaint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleDelays {
    /// After basic activation.
    pub basic: Duration,
    /// After forced activation.
    pub forced: Duration,
    /// After restoring a minimized window without activating it.
    pub restore: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            basic: Duration::from_millis(500),
            forced: Duration::from_millis(1000),
            restore: Duration::from_millis(500),
        }
    }
}

impl SettleDelays {
    /// No waiting at all; for tests and scripted callers.
    pub fn none() -> Self {
        Self {
            basic: Duration::ZERO,
            forced: Duration::ZERO,
            restore: Duration::ZERO,
        }
    }
}

pub(crate) fn settle(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Transient record of whether a forced thread-input attachment is held.
#[derive(Debug, Default)]
pub struct ActivationState {
    input_attached: AtomicBool,
}

impl ActivationState {
    pub fn is_input_attached(&self) -> bool {
        self.input_attached.load(Ordering::SeqCst)
    }
}

/// Releases a thread-input attachment when dropped.
struct HeldAttachment<'a> {
    system: &'a dyn WindowSystem,
    state: &'a ActivationState,
    attachment: Option<InputAttachment>,
}

impl Drop for HeldAttachment<'_> {
    fn drop(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            self.system.detach_input(attachment);
            self.state.input_attached.store(false, Ordering::SeqCst);
            log::debug!(
                "Detached thread input {} -> {}",
                attachment.from_thread,
                attachment.to_thread
            );
        }
    }
}

pub struct WindowActivator {
    system: Arc<dyn WindowSystem>,
    delays: SettleDelays,
    state: ActivationState,
    // Attach/detach is not reentrant.
    forced_lock: Mutex<()>,
}

impl WindowActivator {
    pub fn new(system: Arc<dyn WindowSystem>, delays: SettleDelays) -> Self {
        Self {
            system,
            delays,
            state: ActivationState::default(),
            forced_lock: Mutex::new(()),
        }
    }

    pub fn delays(&self) -> SettleDelays {
        self.delays
    }

    pub fn is_input_attached(&self) -> bool {
        self.state.is_input_attached()
    }

    /// Restores (if minimized), shows and foregrounds the window, then waits
    /// the basic settle delay.
    ///
    /// A failure here is not fatal to the caller; capture may still be attempted.
    pub fn activate_basic(&self, window: WindowId) -> Result<(), CaptureError> {
        if !self.system.is_valid(window) {
            return Err(CaptureError::WindowInvalid);
        }

        if self.system.is_minimized(window) {
            self.system.restore(window, true)?;
        }
        self.system.show(window)?;
        self.system.set_foreground(window)?;

        settle(self.delays.basic);
        log::info!("Basic activation of {} complete", window);
        Ok(())
    }

    /// Foregrounds the window with the calling thread's input queue attached
    /// to the window's owning thread, then waits the forced settle delay.
    ///
    /// The attachment is released on every exit path.
    pub fn activate_forced(&self, window: WindowId) -> Result<(), CaptureError> {
        if !self.system.is_valid(window) {
            return Err(CaptureError::WindowInvalid);
        }

        let _serialized = self.forced_lock.lock().unwrap_or_else(|e| e.into_inner());
        let _held = self.attach(window);

        if self.system.is_minimized(window) {
            self.system.restore(window, true)?;
        }
        self.system.show(window)?;
        self.system.bring_to_top(window)?;
        self.system.set_foreground(window)?;

        settle(self.delays.forced);
        log::info!("Forced activation of {} complete", window);
        Ok(())
    }

    fn attach(&self, window: WindowId) -> HeldAttachment<'_> {
        let attachment = match self.system.attach_input(window) {
            Ok(attachment) => attachment,
            Err(e) => {
                log::warn!(
                    "Thread input attach for {} failed ({}); continuing unattached",
                    window,
                    e
                );
                None
            }
        };

        if let Some(a) = attachment {
            self.state.input_attached.store(true, Ordering::SeqCst);
            log::debug!("Attached thread input {} -> {}", a.from_thread, a.to_thread);
        }

        HeldAttachment {
            system: self.system.as_ref(),
            state: &self.state,
            attachment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Rect;
    use crate::platform::fake::{Call, FakeWindowSystem};

    const WINDOW: WindowId = WindowId(0x100);

    fn setup() -> (Arc<FakeWindowSystem>, WindowActivator) {
        let system = Arc::new(FakeWindowSystem::with_window(
            WINDOW,
            Rect::new(0, 0, 640, 480).unwrap(),
        ));
        let activator = WindowActivator::new(system.clone(), SettleDelays::none());
        (system, activator)
    }

    #[test]
    fn test_basic_restores_minimized_window() {
        let (system, activator) = setup();
        system.minimize(WINDOW);

        activator.activate_basic(WINDOW).unwrap();

        assert_eq!(
            system.calls(),
            vec![
                Call::Restore { activate: true },
                Call::Show,
                Call::SetForeground
            ]
        );
        assert!(!system.is_minimized_now(WINDOW));
    }

    #[test]
    fn test_basic_never_attaches_input() {
        let (system, activator) = setup();
        activator.activate_basic(WINDOW).unwrap();
        assert_eq!(system.count(&Call::AttachInput), 0);
        assert_eq!(system.count(&Call::Restore { activate: true }), 0);
    }

    #[test]
    fn test_forced_attaches_and_detaches_once() {
        let (system, activator) = setup();

        activator.activate_forced(WINDOW).unwrap();

        assert_eq!(system.count(&Call::AttachInput), 1);
        assert_eq!(system.count(&Call::DetachInput), 1);
        assert_eq!(system.count(&Call::BringToTop), 1);
        assert_eq!(system.attached_now(), 0);
        assert!(!activator.is_input_attached());

        let calls = system.calls();
        assert_eq!(calls.first(), Some(&Call::AttachInput));
        assert_eq!(calls.last(), Some(&Call::DetachInput));
    }

    #[test]
    fn test_forced_detaches_when_foreground_refused() {
        let (system, activator) = setup();
        system.refuse_foreground(WINDOW);

        let result = activator.activate_forced(WINDOW);

        assert!(result.is_err());
        assert_eq!(system.count(&Call::DetachInput), 1);
        assert_eq!(system.attached_now(), 0);
        assert!(!activator.is_input_attached());
    }

    #[test]
    fn test_forced_same_thread_needs_no_attachment() {
        let (system, activator) = setup();
        system.same_thread(WINDOW);

        activator.activate_forced(WINDOW).unwrap();

        assert_eq!(system.count(&Call::AttachInput), 1);
        assert_eq!(system.count(&Call::DetachInput), 0);
    }

    #[test]
    fn test_forced_continues_when_attach_refused() {
        let (system, activator) = setup();
        system.refuse_attach(WINDOW);

        activator.activate_forced(WINDOW).unwrap();

        assert_eq!(system.count(&Call::SetForeground), 1);
        assert_eq!(system.count(&Call::DetachInput), 0);
        assert!(!activator.is_input_attached());
    }

    #[test]
    fn test_invalid_window_is_rejected_without_calls() {
        let (system, activator) = setup();
        system.destroy(WINDOW);

        assert_eq!(
            activator.activate_basic(WINDOW),
            Err(CaptureError::WindowInvalid)
        );
        assert_eq!(
            activator.activate_forced(WINDOW),
            Err(CaptureError::WindowInvalid)
        );
        assert!(system.calls().is_empty());
    }
}
