//! # Transforms
//!
//! Local translation/rotation/scale, optionally parented to another
//! transform. Parents are fixed at creation and must already exist, so the
//! hierarchy is a forest by construction.

use duplex_core::{Handle, RenderThread, SimThread, StateKind, StateStore};
use duplex_shared::{Quaternion, Transform, Vec3};

/// Entity kind marker for transforms.
pub struct TransformKind;

/// Handle to a transform.
pub type TransformHandle = Handle<TransformKind>;

/// Write-once part of a transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformStatic {
    /// Parent transform, if any. The local transform is relative to it.
    pub parent: Option<TransformHandle>,
}

/// Creation arguments for a transform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransformConfig {
    /// Parent transform, if any.
    pub parent: Option<TransformHandle>,
    /// Initial local transform.
    pub local: Transform,
}

impl TransformConfig {
    /// Root transform at `translation`.
    #[must_use]
    pub const fn at(translation: Vec3) -> Self {
        Self {
            parent: None,
            local: Transform::from_translation(translation),
        }
    }

    /// Root transform with a full local transform.
    #[must_use]
    pub const fn new(local: Transform) -> Self {
        Self { parent: None, local }
    }

    /// Parents the transform to `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: TransformHandle) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl StateKind for TransformKind {
    const NAME: &'static str = "transform";
    type Static = TransformStatic;
    type Dynamic = Transform;
    type Config = TransformConfig;

    fn split(config: TransformConfig) -> (TransformStatic, Transform) {
        (TransformStatic { parent: config.parent }, config.local)
    }
}

/// Double-buffered store of transforms.
pub struct TransformManager {
    store: StateStore<TransformKind>,
}

delegate_store!(TransformManager, TransformKind);

impl TransformManager {
    /// Creates a manager with `capacity` pre-allocated transforms.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            store: StateStore::new(capacity),
        }
    }

    /// Creates a transform.
    ///
    /// # Panics
    ///
    /// Fatal if the parent is not a transform of this manager, plus the
    /// store's creation contract.
    pub fn create(&self, sim: &SimThread, config: TransformConfig) -> TransformHandle {
        if let Some(parent) = config.parent {
            // Validates the parent; fatal on a foreign or invalid handle
            let _ = self.store.get_static(parent);
        }
        let handle = self.store.create(sim, config);
        tracing::trace!(?handle, parent = ?config.parent, "transform created");
        handle
    }

    /// Parent of a transform.
    #[must_use]
    pub fn parent(&self, handle: TransformHandle) -> Option<TransformHandle> {
        self.store.get_static(handle).parent
    }

    // ------------------------------------------------------------------
    // Simulation side
    // ------------------------------------------------------------------

    /// Local transform as written so far this tick.
    #[must_use]
    pub fn local(&self, sim: &SimThread, handle: TransformHandle) -> Transform {
        *self.store.read_dynamic_sim(sim, handle)
    }

    /// Replaces the local transform.
    pub fn set_local(&self, sim: &mut SimThread, handle: TransformHandle, local: Transform) {
        *self.store.edit_dynamic(sim, handle) = local;
    }

    /// Local translation.
    #[must_use]
    pub fn translation(&self, sim: &SimThread, handle: TransformHandle) -> Vec3 {
        self.store.read_dynamic_sim(sim, handle).translation
    }

    /// Sets the local translation.
    pub fn set_translation(&self, sim: &mut SimThread, handle: TransformHandle, translation: Vec3) {
        self.store.edit_dynamic(sim, handle).translation = translation;
    }

    /// Local rotation.
    #[must_use]
    pub fn rotation(&self, sim: &SimThread, handle: TransformHandle) -> Quaternion {
        self.store.read_dynamic_sim(sim, handle).rotation
    }

    /// Sets the local rotation.
    pub fn set_rotation(&self, sim: &mut SimThread, handle: TransformHandle, rotation: Quaternion) {
        self.store.edit_dynamic(sim, handle).rotation = rotation;
    }

    /// Local scale.
    #[must_use]
    pub fn scale(&self, sim: &SimThread, handle: TransformHandle) -> Vec3 {
        self.store.read_dynamic_sim(sim, handle).scale
    }

    /// Sets the local scale.
    pub fn set_scale(&self, sim: &mut SimThread, handle: TransformHandle, scale: Vec3) {
        self.store.edit_dynamic(sim, handle).scale = scale;
    }

    /// World transform from this tick's values.
    #[must_use]
    pub fn world_transform(&self, sim: &SimThread, handle: TransformHandle) -> Transform {
        self.compose_chain(handle, |h| *self.store.read_dynamic_sim(sim, h))
    }

    // ------------------------------------------------------------------
    // Render side
    // ------------------------------------------------------------------

    /// Local transform as of the last published tick.
    #[must_use]
    pub fn local_rend(&self, rend: &RenderThread, handle: TransformHandle) -> Transform {
        *self.store.read_dynamic_rend(rend, handle)
    }

    /// Local translation as of the last published tick.
    #[must_use]
    pub fn translation_rend(&self, rend: &RenderThread, handle: TransformHandle) -> Vec3 {
        self.store.read_dynamic_rend(rend, handle).translation
    }

    /// Local rotation as of the last published tick.
    #[must_use]
    pub fn rotation_rend(&self, rend: &RenderThread, handle: TransformHandle) -> Quaternion {
        self.store.read_dynamic_rend(rend, handle).rotation
    }

    /// Local scale as of the last published tick.
    #[must_use]
    pub fn scale_rend(&self, rend: &RenderThread, handle: TransformHandle) -> Vec3 {
        self.store.read_dynamic_rend(rend, handle).scale
    }

    /// World transform as of the last published tick.
    #[must_use]
    pub fn world_transform_rend(&self, rend: &RenderThread, handle: TransformHandle) -> Transform {
        self.compose_chain(handle, |h| *self.store.read_dynamic_rend(rend, h))
    }

    /// Walks the parent chain from `handle` to its root.
    fn compose_chain(
        &self,
        handle: TransformHandle,
        local: impl Fn(TransformHandle) -> Transform,
    ) -> Transform {
        let mut world = local(handle);
        let mut next = self.parent(handle);
        while let Some(parent) = next {
            world = local(parent).compose(&world);
            next = self.parent(parent);
        }
        world
    }
}
