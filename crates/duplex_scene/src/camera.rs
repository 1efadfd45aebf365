//! # Cameras
//!
//! A camera follows a transform (its view is the transform's world
//! placement) and double-buffers its projection.

use std::sync::Arc;

use duplex_core::{Handle, RenderThread, SimThread, StateKind, StateStore};
use duplex_shared::Transform;

use crate::transform::{TransformHandle, TransformManager};

/// Entity kind marker for cameras.
pub struct CameraKind;

/// Handle to a camera.
pub type CameraHandle = Handle<CameraKind>;

/// Projection model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Perspective frustum.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
    /// Orthographic box.
    Orthographic {
        /// Visible height in world units.
        height: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
}

impl Projection {
    /// Near and far clip distances.
    #[must_use]
    pub const fn clip_range(&self) -> (f32, f32) {
        match *self {
            Self::Perspective { near, far, .. } | Self::Orthographic { near, far, .. } => {
                (near, far)
            }
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective {
            fov_y: std::f32::consts::FRAC_PI_3,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Per-tick camera payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    /// Projection model.
    pub projection: Projection,
    /// Viewport width / height.
    pub aspect_ratio: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            aspect_ratio: 16.0 / 9.0,
        }
    }
}

impl CameraState {
    /// Right-handed projection matrix, column-major, depth range `0..=1`.
    #[must_use]
    pub fn projection_matrix(&self) -> [[f32; 4]; 4] {
        match self.projection {
            Projection::Perspective { fov_y, near, far } => {
                let h = 1.0 / (fov_y * 0.5).tan();
                let w = h / self.aspect_ratio;
                let r = far / (near - far);
                [
                    [w, 0.0, 0.0, 0.0],
                    [0.0, h, 0.0, 0.0],
                    [0.0, 0.0, r, -1.0],
                    [0.0, 0.0, r * near, 0.0],
                ]
            }
            Projection::Orthographic { height, near, far } => {
                let half_h = height * 0.5;
                let half_w = half_h * self.aspect_ratio;
                let r = 1.0 / (near - far);
                [
                    [1.0 / half_w, 0.0, 0.0, 0.0],
                    [0.0, 1.0 / half_h, 0.0, 0.0],
                    [0.0, 0.0, r, 0.0],
                    [0.0, 0.0, r * near, 1.0],
                ]
            }
        }
    }
}

/// Write-once part of a camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraStatic {
    /// Transform the camera views from.
    pub transform: TransformHandle,
}

/// Creation arguments for a camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    /// Transform the camera views from.
    pub transform: TransformHandle,
    /// Initial projection and aspect ratio.
    pub state: CameraState,
}

impl StateKind for CameraKind {
    const NAME: &'static str = "camera";
    type Static = CameraStatic;
    type Dynamic = CameraState;
    type Config = CameraConfig;

    fn split(config: CameraConfig) -> (CameraStatic, CameraState) {
        (CameraStatic { transform: config.transform }, config.state)
    }
}

/// Double-buffered store of cameras.
pub struct CameraManager {
    store: StateStore<CameraKind>,
    transforms: Arc<TransformManager>,
}

delegate_store!(CameraManager, CameraKind);

impl CameraManager {
    /// Creates a manager with `capacity` pre-allocated cameras, attached to
    /// `transforms`.
    #[must_use]
    pub fn new(capacity: usize, transforms: Arc<TransformManager>) -> Self {
        Self {
            store: StateStore::new(capacity),
            transforms,
        }
    }

    /// Creates a camera.
    ///
    /// # Panics
    ///
    /// Fatal if the transform is not in the attached transform store, plus
    /// the store's creation contract.
    pub fn create(&self, sim: &SimThread, config: CameraConfig) -> CameraHandle {
        let _ = self.transforms.get_static(config.transform);
        self.store.create(sim, config)
    }

    /// Transform the camera views from.
    #[must_use]
    pub fn transform(&self, handle: CameraHandle) -> TransformHandle {
        self.store.get_static(handle).transform
    }

    /// Camera payload as written so far this tick.
    #[must_use]
    pub fn state(&self, sim: &SimThread, handle: CameraHandle) -> CameraState {
        *self.store.read_dynamic_sim(sim, handle)
    }

    /// Replaces the camera payload.
    pub fn set_state(&self, sim: &mut SimThread, handle: CameraHandle, state: CameraState) {
        *self.store.edit_dynamic(sim, handle) = state;
    }

    /// Replaces the projection, keeping the aspect ratio.
    pub fn set_projection(&self, sim: &mut SimThread, handle: CameraHandle, projection: Projection) {
        self.store.edit_dynamic(sim, handle).projection = projection;
    }

    /// Sets the aspect ratio, typically after a viewport resize.
    ///
    /// Zero, negative and non-finite ratios (a minimised window reports a
    /// zero height) are ignored with a warning and the previous ratio is
    /// kept.
    pub fn set_aspect_ratio(&self, sim: &mut SimThread, handle: CameraHandle, aspect_ratio: f32) {
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
            tracing::warn!(id = handle.id(), aspect_ratio, "invalid camera aspect ratio ignored");
            return;
        }
        self.store.edit_dynamic(sim, handle).aspect_ratio = aspect_ratio;
    }

    /// Camera payload as of the last published tick.
    #[must_use]
    pub fn state_rend(&self, rend: &RenderThread, handle: CameraHandle) -> CameraState {
        *self.store.read_dynamic_rend(rend, handle)
    }

    /// World placement of the camera's eye as of the last published tick.
    #[must_use]
    pub fn eye_rend(&self, rend: &RenderThread, handle: CameraHandle) -> Transform {
        self.transforms.world_transform_rend(rend, self.transform(handle))
    }
}
