//! # DUPLEX
//!
//! The engine crate: scene managers, a simulation thread and a render
//! thread, wired together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              DUPLEX                                  │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │   SIMULATION THREAD                            RENDER THREAD         │
//! │   ┌────────────────┐                         ┌────────────────┐      │
//! │   │ Simulation     │  writes back halves     │ FrameRenderer  │      │
//! │   │  ::tick        │───────┐       ┌────────>│  ::render      │      │
//! │   └────────────────┘       v       │         └───────┬────────┘      │
//! │                     ┌──────────────┴──┐              v               │
//! │                     │  duplex_scene   │       ┌──────────────┐       │
//! │                     │  transforms     │       │ RenderBackend│       │
//! │                     │  cameras        │       └──────────────┘       │
//! │                     │  lights         │                              │
//! │                     │  static meshes  │  swapped in lockstep by the  │
//! │                     └─────────────────┘  lifecycle coordinator       │
//! │                                                                      │
//! │   to_render / to_sim message rings for one-shot events               │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML engine configuration
//! - `context`: shared engine state
//! - `events`: cross-thread messages
//! - `game_loop`: the fenced two-thread loop
//! - `platform`: window and render backend traits
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = EngineConfig::load("engine.toml")?;
//! let engine = EngineContext::new(&config)?;
//! let report = MainLoop::new(config.main_loop.clone()).run(
//!     &engine,
//!     &HeadlessWindow::new(),
//!     &mut my_game,
//!     &mut my_renderer,
//!     &mut NullBackend::new(),
//! );
//! report.log_summary();
//! engine.shutdown();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod context;
pub mod events;
pub mod game_loop;
pub mod platform;

// Re-export the layers below
pub use duplex_core as core;
pub use duplex_scene as scene;
pub use duplex_shared as shared;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, LoopConfig, QueueConfig, StoreCapacities};
pub use context::EngineContext;
pub use events::{EngineMessage, MessageQueues};
pub use game_loop::{
    FrameInfo, FrameRenderer, LoopReport, MainLoop, Simulation, TickInfo, TimingAccumulator,
};
pub use platform::{HeadlessWindow, NullBackend, RenderBackend, Window, WindowEvent};
