//! # Platform Collaborators
//!
//! The main loop talks to the outside world through two traits:
//!
//! - [`Window`]: clock, close requests and input events. Shared by both
//!   threads (the simulation reads the clock, the render thread polls).
//! - [`RenderBackend`]: where finished frames go. Owned by the render thread.
//!
//! [`HeadlessWindow`] and [`NullBackend`] run the engine without a display,
//! for servers and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

/// Something that happened to the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    /// The drawable area changed size.
    Resized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// The user asked to close the window.
    CloseRequested,
}

/// Window and clock as seen by the main loop.
pub trait Window: Send + Sync {
    /// True once the loop should wind down.
    ///
    /// Need not reflect [`WindowEvent::CloseRequested`]: the main loop stops
    /// on that event too.
    fn should_close(&self) -> bool;

    /// Monotonic time in seconds.
    fn time_seconds(&self) -> f64;

    /// Takes the events that arrived since the last poll.
    fn poll_events(&self) -> Vec<WindowEvent>;
}

/// Consumer of finished frames.
pub trait RenderBackend: Send {
    /// Hands frame `frame_index` to the device.
    fn submit_frame(&mut self, frame_index: u64);

    /// Blocks until every submitted frame has finished.
    fn wait_idle(&mut self);
}

/// Window without a display: a monotonic clock, a close flag and an event
/// list fed by [`push_event`](Self::push_event).
#[derive(Debug)]
pub struct HeadlessWindow {
    start: Instant,
    close: AtomicBool,
    pending: Mutex<Vec<WindowEvent>>,
}

impl HeadlessWindow {
    /// Creates a window whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            close: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Makes [`Window::should_close`] return true.
    pub fn request_close(&self) {
        self.close.store(true, Ordering::Release);
    }

    /// Queues an event for the next poll.
    pub fn push_event(&self, event: WindowEvent) {
        self.pending.lock().push(event);
    }
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl Window for HeadlessWindow {
    fn should_close(&self) -> bool {
        self.close.load(Ordering::Acquire)
    }

    fn time_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn poll_events(&self) -> Vec<WindowEvent> {
        let events = std::mem::take(&mut *self.pending.lock());
        if events.contains(&WindowEvent::CloseRequested) {
            self.request_close();
        }
        events
    }
}

/// Backend that discards frames and counts them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullBackend {
    /// Frames submitted so far.
    pub frames_submitted: u64,
    /// Index of the most recent frame.
    pub last_frame: Option<u64>,
    /// Calls to `wait_idle`.
    pub idle_waits: u64,
}

impl NullBackend {
    /// Creates a backend with zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_submitted: 0,
            last_frame: None,
            idle_waits: 0,
        }
    }
}

impl RenderBackend for NullBackend {
    fn submit_frame(&mut self, frame_index: u64) {
        self.frames_submitted += 1;
        self.last_frame = Some(frame_index);
    }

    fn wait_idle(&mut self) {
        self.idle_waits += 1;
    }
}
