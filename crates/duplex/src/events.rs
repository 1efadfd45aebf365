//! # Engine Messages
//!
//! Discrete, one-shot notifications between the two threads. Continuous
//! state (positions, lights, ...) goes through the double-buffered stores;
//! these rings carry only things that happen once.
//!
//! ```text
//!   SIMULATION ──── to_render ────> RENDER
//!     • ActiveCameraChanged           • picks the camera to draw from
//!     • DebugMarker                   • annotates the frame
//!
//!   SIMULATION <──── to_sim ─────── RENDER
//!     • ViewportResized               • window size changed
//!     • FramePresented                • frame handed to the backend
//! ```
//!
//! Sending never blocks. A full ring drops the message, logs a warning and
//! bumps a counter.

use std::sync::atomic::{AtomicU64, Ordering};

use duplex_core::RingQueue;
use duplex_scene::CameraHandle;

/// Discrete message between the simulation and render threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineMessage {
    /// Sim → render: draw from this camera from now on.
    ActiveCameraChanged {
        /// The new active camera.
        camera: CameraHandle,
    },
    /// Sim → render: free-form frame annotation.
    DebugMarker {
        /// Marker text.
        label: String,
    },
    /// Render → sim: the output surface changed size.
    ViewportResized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// Render → sim: a frame was submitted to the backend.
    FramePresented {
        /// Index of the presented frame.
        frame: u64,
    },
}

/// The two message rings plus drop accounting.
pub struct MessageQueues {
    to_render: RingQueue<EngineMessage>,
    to_sim: RingQueue<EngineMessage>,
    dropped: AtomicU64,
}

impl MessageQueues {
    /// Creates both rings with `capacity` slots each.
    ///
    /// # Panics
    ///
    /// Panics if capacity is less than 2.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            to_render: RingQueue::new(capacity),
            to_sim: RingQueue::new(capacity),
            dropped: AtomicU64::new(0),
        }
    }

    /// Sends a message to the render thread.
    ///
    /// Returns false if the ring was full and the message was dropped.
    pub fn send_to_render(&self, message: EngineMessage) -> bool {
        self.send(&self.to_render, "to_render", message)
    }

    /// Sends a message to the simulation thread.
    ///
    /// Returns false if the ring was full and the message was dropped.
    pub fn send_to_sim(&self, message: EngineMessage) -> bool {
        self.send(&self.to_sim, "to_sim", message)
    }

    /// Drains every message queued for the render thread, oldest first.
    pub fn drain_to_render(&self, f: impl FnMut(EngineMessage)) -> usize {
        self.to_render.drain(f)
    }

    /// Drains every message queued for the simulation thread, oldest first.
    pub fn drain_to_sim(&self, f: impl FnMut(EngineMessage)) -> usize {
        self.to_sim.drain(f)
    }

    /// Messages waiting for the render thread.
    #[must_use]
    pub fn pending_to_render(&self) -> usize {
        self.to_render.len()
    }

    /// Messages waiting for the simulation thread.
    #[must_use]
    pub fn pending_to_sim(&self) -> usize {
        self.to_sim.len()
    }

    /// Messages dropped on a full ring, both directions.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, ring: &RingQueue<EngineMessage>, direction: &'static str, message: EngineMessage) -> bool {
        match ring.push(message) {
            Ok(()) => true,
            Err(message) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(direction, ?message, "message ring full, message dropped");
                false
            }
        }
    }
}

impl std::fmt::Debug for MessageQueues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueues")
            .field("to_render", &self.to_render.len())
            .field("to_sim", &self.to_sim.len())
            .field("capacity", &self.to_render.capacity())
            .field("dropped", &self.dropped())
            .finish()
    }
}
