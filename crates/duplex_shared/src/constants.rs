//! # Engine Constants
//!
//! Defaults used when a config file leaves a value out.

/// Nominal simulation rate (ticks per second).
pub const TICK_RATE: u32 = 60;

/// Largest delta time handed to gameplay, in seconds.
///
/// Anything longer (debugger pause, window drag) is clamped.
pub const DEFAULT_MAX_DELTA_SECONDS: f32 = 0.1;

/// Default slot count of the transform store.
pub const DEFAULT_TRANSFORM_CAPACITY: usize = 4096;

/// Default slot count of the camera store.
pub const DEFAULT_CAMERA_CAPACITY: usize = 16;

/// Default slot count of the light store.
pub const DEFAULT_LIGHT_CAPACITY: usize = 256;

/// Default slot count of the static mesh store.
pub const DEFAULT_STATIC_MESH_CAPACITY: usize = 4096;

/// Default ring size of each cross-thread message queue.
///
/// One slot is reserved, so this holds 255 messages.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
