//! Scripted in-memory window system used by the unit tests.
//!
//! Frames are consumed in order by every capture call, whichever strategy
//! makes it. An exhausted script yields black frames.

use image::{Rgba, RgbaImage};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::{InputAttachment, WindowSystem};
use crate::capture::{Bitmap, CaptureError, Rect, WindowId};

/// Where Windows parks minimized top-level windows.
pub const MINIMIZED_RECT: Rect = Rect {
    left: -32000,
    top: -32000,
    right: -31840,
    bottom: -31972,
};

/// What the next capture call returns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Frame {
    Black,
    /// Uniform grey at the given level.
    Content(u8),
    /// The OS call fails outright.
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Restore { activate: bool },
    Show,
    SetForeground,
    BringToTop,
    AttachInput,
    DetachInput,
    CaptureRegion(Rect),
    CaptureWindow,
}

#[derive(Clone, Debug)]
struct FakeWindow {
    rect: Rect,
    minimized: bool,
    valid: bool,
    vanish_after_rect: bool,
    refuse_foreground: bool,
    refuse_attach: bool,
    same_thread: bool,
}

#[derive(Default)]
struct State {
    windows: HashMap<WindowId, FakeWindow>,
    frames: VecDeque<Frame>,
    calls: Vec<Call>,
    attached: usize,
}

#[derive(Default)]
pub struct FakeWindowSystem {
    state: Mutex<State>,
}

impl FakeWindowSystem {
    pub fn with_window(window: WindowId, rect: Rect) -> Self {
        let system = Self::default();
        system.add_window(window, rect);
        system
    }

    pub fn add_window(&self, window: WindowId, rect: Rect) {
        self.lock().windows.insert(
            window,
            FakeWindow {
                rect,
                minimized: false,
                valid: true,
                vanish_after_rect: false,
                refuse_foreground: false,
                refuse_attach: false,
                same_thread: false,
            },
        );
    }

    pub fn minimize(&self, window: WindowId) {
        self.update(window, |w| w.minimized = true);
    }

    pub fn destroy(&self, window: WindowId) {
        self.update(window, |w| w.valid = false);
    }

    /// The window is destroyed right after its next geometry query.
    pub fn vanish_after_rect(&self, window: WindowId) {
        self.update(window, |w| w.vanish_after_rect = true);
    }

    pub fn refuse_foreground(&self, window: WindowId) {
        self.update(window, |w| w.refuse_foreground = true);
    }

    pub fn refuse_attach(&self, window: WindowId) {
        self.update(window, |w| w.refuse_attach = true);
    }

    /// The window is owned by the calling thread, so no attachment is needed.
    pub fn same_thread(&self, window: WindowId) {
        self.update(window, |w| w.same_thread = true);
    }

    pub fn push_frames(&self, frames: impl IntoIterator<Item = Frame>) {
        self.lock().frames.extend(frames);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn capture_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::CaptureRegion(_) | Call::CaptureWindow))
            .count()
    }

    /// Input attachments currently held.
    pub fn attached_now(&self) -> usize {
        self.lock().attached
    }

    pub fn is_minimized_now(&self, window: WindowId) -> bool {
        self.lock()
            .windows
            .get(&window)
            .is_some_and(|w| w.minimized)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, window: WindowId, f: impl FnOnce(&mut FakeWindow)) {
        if let Some(w) = self.lock().windows.get_mut(&window) {
            f(w);
        }
    }

    fn live_window(state: &State, window: WindowId) -> Result<FakeWindow, CaptureError> {
        match state.windows.get(&window) {
            Some(w) if w.valid => Ok(w.clone()),
            _ => Err(CaptureError::WindowInvalid),
        }
    }

    fn next_frame(state: &mut State, width: u32, height: u32) -> Result<Bitmap, CaptureError> {
        match state.frames.pop_front().unwrap_or(Frame::Black) {
            Frame::Black => Ok(uniform(width, height, 0)),
            Frame::Content(level) => Ok(uniform(width, height, level)),
            Frame::Fail => Err(CaptureError::CaptureFailed(
                "scripted capture failure".to_string(),
            )),
        }
    }
}

fn uniform(width: u32, height: u32, level: u8) -> Bitmap {
    Bitmap::from_image(RgbaImage::from_pixel(
        width,
        height,
        Rgba([level, level, level, 255]),
    ))
}

fn current_rect(window: &FakeWindow) -> Rect {
    if window.minimized {
        MINIMIZED_RECT
    } else {
        window.rect
    }
}

impl WindowSystem for FakeWindowSystem {
    fn is_valid(&self, window: WindowId) -> bool {
        self.lock().windows.get(&window).is_some_and(|w| w.valid)
    }

    fn rect(&self, window: WindowId) -> Result<Rect, CaptureError> {
        let mut state = self.lock();
        let w = Self::live_window(&state, window)?;
        if w.vanish_after_rect {
            if let Some(entry) = state.windows.get_mut(&window) {
                entry.valid = false;
                entry.vanish_after_rect = false;
            }
        }
        Ok(current_rect(&w))
    }

    fn is_minimized(&self, window: WindowId) -> bool {
        self.is_minimized_now(window)
    }

    fn restore(&self, window: WindowId, activate: bool) -> Result<(), CaptureError> {
        let mut state = self.lock();
        state.calls.push(Call::Restore { activate });
        Self::live_window(&state, window)?;
        if let Some(w) = state.windows.get_mut(&window) {
            w.minimized = false;
        }
        Ok(())
    }

    fn show(&self, window: WindowId) -> Result<(), CaptureError> {
        let mut state = self.lock();
        state.calls.push(Call::Show);
        Self::live_window(&state, window).map(|_| ())
    }

    fn set_foreground(&self, window: WindowId) -> Result<(), CaptureError> {
        let mut state = self.lock();
        state.calls.push(Call::SetForeground);
        let w = Self::live_window(&state, window)?;
        if w.refuse_foreground {
            return Err(CaptureError::CaptureFailed(
                "foreground switch refused".to_string(),
            ));
        }
        Ok(())
    }

    fn bring_to_top(&self, window: WindowId) -> Result<(), CaptureError> {
        let mut state = self.lock();
        state.calls.push(Call::BringToTop);
        Self::live_window(&state, window).map(|_| ())
    }

    fn attach_input(&self, window: WindowId) -> Result<Option<InputAttachment>, CaptureError> {
        let mut state = self.lock();
        state.calls.push(Call::AttachInput);
        let w = Self::live_window(&state, window)?;
        if w.refuse_attach {
            return Err(CaptureError::CaptureFailed(
                "thread input attach refused".to_string(),
            ));
        }
        if w.same_thread {
            return Ok(None);
        }
        state.attached += 1;
        Ok(Some(InputAttachment {
            from_thread: 1,
            to_thread: 2,
        }))
    }

    fn detach_input(&self, _attachment: InputAttachment) {
        let mut state = self.lock();
        state.calls.push(Call::DetachInput);
        state.attached = state.attached.saturating_sub(1);
    }

    fn capture_region(&self, rect: Rect) -> Result<Bitmap, CaptureError> {
        let mut state = self.lock();
        state.calls.push(Call::CaptureRegion(rect));
        Self::next_frame(&mut state, rect.width(), rect.height())
    }

    fn capture_window(&self, window: WindowId) -> Result<Bitmap, CaptureError> {
        let mut state = self.lock();
        state.calls.push(Call::CaptureWindow);
        let w = Self::live_window(&state, window).map_err(|_| {
            CaptureError::CaptureFailed("window device context unavailable".to_string())
        })?;
        let rect = current_rect(&w);
        Self::next_frame(&mut state, rect.width(), rect.height())
    }
}
