//! # Lights
//!
//! Point and directional lights, attached to transforms. The light kind is
//! part of the dynamic payload, so a light may switch kind between ticks;
//! the render thread discriminates on the published variant.
//!
//! A point light sits at its transform's world translation. A directional
//! light shines along its transform's world forward axis (-Z).

use std::sync::Arc;

use duplex_core::{Handle, RenderThread, SimThread, StateKind, StateStore};
use duplex_shared::Vec3;

use crate::transform::{TransformHandle, TransformManager};

/// Entity kind marker for lights.
pub struct LightKind;

/// Handle to a light.
pub type LightHandle = Handle<LightKind>;

/// Omnidirectional light with finite range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    /// Linear RGB color.
    pub color: Vec3,
    /// Luminous intensity multiplier.
    pub intensity: f32,
    /// Distance at which the contribution reaches zero.
    pub range: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self { color: Vec3::ONE, intensity: 1.0, range: 10.0 }
    }
}

/// Infinitely distant light (sun).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Linear RGB color.
    pub color: Vec3,
    /// Illuminance multiplier.
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self { color: Vec3::ONE, intensity: 1.0 }
    }
}

/// Per-tick light payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightState {
    /// See [`PointLight`].
    Point(PointLight),
    /// See [`DirectionalLight`].
    Directional(DirectionalLight),
}

impl Default for LightState {
    fn default() -> Self {
        Self::Point(PointLight::default())
    }
}

impl LightState {
    /// Light color regardless of kind.
    #[must_use]
    pub const fn color(&self) -> Vec3 {
        match self {
            Self::Point(p) => p.color,
            Self::Directional(d) => d.color,
        }
    }

    /// Intensity regardless of kind.
    #[must_use]
    pub const fn intensity(&self) -> f32 {
        match self {
            Self::Point(p) => p.intensity,
            Self::Directional(d) => d.intensity,
        }
    }
}

/// Write-once part of a light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightStatic {
    /// Transform the light is attached to.
    pub transform: TransformHandle,
}

/// Creation arguments for a light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightConfig {
    /// Transform the light is attached to.
    pub transform: TransformHandle,
    /// Initial kind and parameters.
    pub state: LightState,
}

impl StateKind for LightKind {
    const NAME: &'static str = "light";
    type Static = LightStatic;
    type Dynamic = LightState;
    type Config = LightConfig;

    fn split(config: LightConfig) -> (LightStatic, LightState) {
        (LightStatic { transform: config.transform }, config.state)
    }
}

/// Double-buffered store of lights.
pub struct LightManager {
    store: StateStore<LightKind>,
    transforms: Arc<TransformManager>,
}

delegate_store!(LightManager, LightKind);

impl LightManager {
    /// Creates a manager with `capacity` pre-allocated lights, attached to
    /// `transforms`.
    #[must_use]
    pub fn new(capacity: usize, transforms: Arc<TransformManager>) -> Self {
        Self {
            store: StateStore::new(capacity),
            transforms,
        }
    }

    /// Creates a light.
    ///
    /// # Panics
    ///
    /// Fatal if the transform is not in the attached transform store, plus
    /// the store's creation contract.
    pub fn create(&self, sim: &SimThread, config: LightConfig) -> LightHandle {
        let _ = self.transforms.get_static(config.transform);
        let handle = self.store.create(sim, config);
        tracing::trace!(?handle, transform = ?config.transform, "light created");
        handle
    }

    /// Transform the light is attached to.
    #[must_use]
    pub fn transform(&self, handle: LightHandle) -> TransformHandle {
        self.store.get_static(handle).transform
    }

    // ------------------------------------------------------------------
    // Simulation side
    // ------------------------------------------------------------------

    /// Light payload as written so far this tick.
    #[must_use]
    pub fn state(&self, sim: &SimThread, handle: LightHandle) -> LightState {
        *self.store.read_dynamic_sim(sim, handle)
    }

    /// Replaces the light payload, possibly changing its kind.
    pub fn set_state(&self, sim: &mut SimThread, handle: LightHandle, state: LightState) {
        *self.store.edit_dynamic(sim, handle) = state;
    }

    /// Sets the color, keeping the kind.
    pub fn set_color(&self, sim: &mut SimThread, handle: LightHandle, color: Vec3) {
        match self.store.edit_dynamic(sim, handle) {
            LightState::Point(p) => p.color = color,
            LightState::Directional(d) => d.color = color,
        }
    }

    /// Sets the intensity, keeping the kind.
    pub fn set_intensity(&self, sim: &mut SimThread, handle: LightHandle, intensity: f32) {
        match self.store.edit_dynamic(sim, handle) {
            LightState::Point(p) => p.intensity = intensity,
            LightState::Directional(d) => d.intensity = intensity,
        }
    }

    // ------------------------------------------------------------------
    // Render side
    // ------------------------------------------------------------------

    /// Light payload as of the last published tick.
    #[must_use]
    pub fn state_rend(&self, rend: &RenderThread, handle: LightHandle) -> LightState {
        *self.store.read_dynamic_rend(rend, handle)
    }

    /// Checks if the published light is a point light.
    #[must_use]
    pub fn is_point_light_rend(&self, rend: &RenderThread, handle: LightHandle) -> bool {
        matches!(self.store.read_dynamic_rend(rend, handle), LightState::Point(_))
    }

    /// Checks if the published light is a directional light.
    #[must_use]
    pub fn is_directional_light_rend(&self, rend: &RenderThread, handle: LightHandle) -> bool {
        matches!(self.store.read_dynamic_rend(rend, handle), LightState::Directional(_))
    }

    /// Point light parameters, if the published light is one.
    #[must_use]
    pub fn point_light_rend<'a>(
        &'a self,
        rend: &'a RenderThread,
        handle: LightHandle,
    ) -> Option<&'a PointLight> {
        match self.store.read_dynamic_rend(rend, handle) {
            LightState::Point(p) => Some(p),
            LightState::Directional(_) => None,
        }
    }

    /// Directional light parameters, if the published light is one.
    #[must_use]
    pub fn directional_light_rend<'a>(
        &'a self,
        rend: &'a RenderThread,
        handle: LightHandle,
    ) -> Option<&'a DirectionalLight> {
        match self.store.read_dynamic_rend(rend, handle) {
            LightState::Directional(d) => Some(d),
            LightState::Point(_) => None,
        }
    }

    /// World position of the light's transform as of the last published
    /// tick.
    #[must_use]
    pub fn world_position_rend(&self, rend: &RenderThread, handle: LightHandle) -> Vec3 {
        self.transforms
            .world_transform_rend(rend, self.transform(handle))
            .translation
    }

    /// World direction the light shines along as of the last published
    /// tick.
    #[must_use]
    pub fn world_direction_rend(&self, rend: &RenderThread, handle: LightHandle) -> Vec3 {
        self.transforms
            .world_transform_rend(rend, self.transform(handle))
            .forward()
    }

    /// Published point lights, in creation order.
    pub fn point_lights_rend<'a>(
        &'a self,
        rend: &'a RenderThread,
    ) -> impl Iterator<Item = LightHandle> + 'a {
        self.store
            .handles_rend(rend)
            .filter(move |&h| self.is_point_light_rend(rend, h))
    }

    /// Published directional lights, in creation order.
    pub fn directional_lights_rend<'a>(
        &'a self,
        rend: &'a RenderThread,
    ) -> impl Iterator<Item = LightHandle> + 'a {
        self.store
            .handles_rend(rend)
            .filter(move |&h| self.is_directional_light_rend(rend, h))
    }
}
