//! # DUPLEX Core
//!
//! Double-buffered entity state shared by two long-running threads:
//! - The simulation thread writes at a fixed tick rate
//! - The render thread reads at its own frame rate
//! - Neither ever waits on a lock to touch entity state
//!
//! ## Architecture Rules
//!
//! 1. **Single writer, single reader** - Every store operation checks the
//!    calling thread through a capability token
//! 2. **Pre-allocated** - Stores never grow; all slots exist up front
//! 3. **Atomic publication** - A tick becomes visible to render all at once,
//!    across every store, at the next `begin_frame`
//! 4. **Misuse is fatal** - Contract violations log and abort
//!
//! ## Example
//!
//! ```rust,ignore
//! use duplex_core::{StateStore, ThreadRegistry};
//!
//! let registry = ThreadRegistry::new();
//! let mut sim = registry.register_sim();
//!
//! store.begin_tick(&mut sim);
//! let h = store.create(&sim, config);
//! store.edit_dynamic(&mut sim, h).value += 1.0;
//! store.end_tick(&mut sim);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod state;
pub mod sync;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{fatal, ContractViolation, ThreadRole};
pub use state::{
    CoordinatorBuilder, Handle, Lifecycle, LifecycleCoordinator, StateKind, StateStore, StoreStats,
};
pub use sync::{Fence, RenderThread, RingQueue, SimThread, ThreadRegistry};
