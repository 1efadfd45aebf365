//! # DUPLEX Shared
//!
//! Plain payload types used by the state managers.
//!
//! ## RULE
//!
//! This crate must stay free of engine state. Everything in here is `Copy`
//! data that can live in a double-buffered slot.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    DEFAULT_CAMERA_CAPACITY, DEFAULT_LIGHT_CAPACITY, DEFAULT_MAX_DELTA_SECONDS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_STATIC_MESH_CAPACITY, DEFAULT_TRANSFORM_CAPACITY, TICK_RATE,
};
pub use math::{Quaternion, Transform, Vec3};
