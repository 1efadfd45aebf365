//! # Synchronization Primitives for the Sim/Render Split
//!
//! ## The Problem
//!
//! ```text
//! Thread 1 (Simulation):  WRITE entity state every tick
//! Thread 2 (Render):      READ entity state every frame
//!
//! Without synchronization: RACE CONDITION → TORN FRAMES
//! With a Mutex per entity: LOCK CONTENTION → STALLS
//! ```
//!
//! ## The Pieces
//!
//! - [`ThreadRegistry`] hands each thread a capability token
//!   ([`SimThread`] / [`RenderThread`]) that every store operation checks.
//! - [`Fence`] parks one loop until the other reaches the swap point.
//! - [`RingQueue`] carries discrete, ordered messages that do not belong in
//!   per-tick state.
//!
//! The double-buffered state itself lives in [`crate::state`].

mod fence;
mod ring_queue;
mod thread_role;

pub use fence::Fence;
pub use ring_queue::RingQueue;
pub use thread_role::{RenderThread, SimThread, ThreadRegistry};
