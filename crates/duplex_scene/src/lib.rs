//! # DUPLEX Scene
//!
//! The four entity kinds of a scene, each a double-buffered store plus typed
//! accessors:
//!
//! | Manager               | Static (write-once)          | Dynamic (per tick)        |
//! |-----------------------|------------------------------|---------------------------|
//! | [`TransformManager`]  | parent transform             | translation/rotation/scale |
//! | [`CameraManager`]     | attached transform           | projection, aspect ratio  |
//! | [`LightManager`]      | attached transform           | point or directional      |
//! | [`StaticMeshManager`] | transform, mesh, material    | visibility, shadows       |
//!
//! Every manager dereferences to its [`StateStore`](duplex_core::StateStore), so the generic operations
//! (`create`, `edit_dynamic`, `read_dynamic_rend`, ...) are available too,
//! and implements [`Lifecycle`](duplex_core::Lifecycle) so it can be
//! registered with the coordinator.
//!
//! Cameras, lights and meshes hold transform handles. Reading their world
//! placement on the render thread dereferences the transform store; that is
//! consistent only because all managers swap in the same `begin_frame`.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

/// Implements `Lifecycle` and `Deref<Target = StateStore<_>>` for a manager
/// whose store lives in a field named `store`.
macro_rules! delegate_store {
    ($manager:ty, $kind:ty) => {
        impl ::std::ops::Deref for $manager {
            type Target = ::duplex_core::StateStore<$kind>;

            fn deref(&self) -> &Self::Target {
                &self.store
            }
        }

        impl ::duplex_core::Lifecycle for $manager {
            fn name(&self) -> &'static str {
                ::duplex_core::Lifecycle::name(&self.store)
            }

            fn begin_tick(&self, sim: &mut ::duplex_core::SimThread) {
                self.store.begin_tick(sim);
            }

            fn end_tick(&self, sim: &mut ::duplex_core::SimThread) {
                self.store.end_tick(sim);
            }

            fn begin_frame(&self, rend: &mut ::duplex_core::RenderThread) {
                self.store.begin_frame(rend);
            }

            fn end_frame(&self, rend: &mut ::duplex_core::RenderThread) {
                self.store.end_frame(rend);
            }
        }
    };
}

pub mod camera;
pub mod light;
pub mod static_mesh;
pub mod transform;

pub use camera::{
    CameraConfig, CameraHandle, CameraKind, CameraManager, CameraState, CameraStatic, Projection,
};
pub use light::{
    DirectionalLight, LightConfig, LightHandle, LightKind, LightManager, LightState, LightStatic,
    PointLight,
};
pub use static_mesh::{
    DrawItem, MaterialId, MeshId, StaticMeshConfig, StaticMeshHandle, StaticMeshKind,
    StaticMeshManager, StaticMeshState, StaticMeshStatic,
};
pub use transform::{TransformConfig, TransformHandle, TransformKind, TransformManager, TransformStatic};

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use duplex_core::testing::RenderWorker;
    use duplex_core::{SimThread, ThreadRegistry};

    /// Test thread as sim, a worker as render.
    pub(crate) fn threads() -> (SimThread, RenderWorker) {
        let registry = Arc::new(ThreadRegistry::new());
        let sim = registry.register_sim();
        (sim, RenderWorker::spawn(registry))
    }
}
