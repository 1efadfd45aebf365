//! # Double-Buffered Entity State
//!
//! ```text
//! StateKind ──► StateStore<K> ──► Handle<K>
//!                    │
//!                    └── impl Lifecycle ──► LifecycleCoordinator
//! ```
//!
//! A [`StateStore`] holds every entity of one kind. The simulation thread
//! writes the back half of each slot during a tick; the render thread reads
//! the front half during a frame; `begin_frame` swaps the halves once a tick
//! has committed. The [`LifecycleCoordinator`] brackets all stores together.

mod dirty;
mod handle;
mod kind;
mod lifecycle;
mod store;

pub use handle::Handle;
pub use kind::StateKind;
pub use lifecycle::{CoordinatorBuilder, Lifecycle, LifecycleCoordinator};
pub use store::{StateStore, StoreStats};
