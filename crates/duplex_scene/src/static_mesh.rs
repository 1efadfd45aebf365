//! # Static Meshes
//!
//! Mesh and material are fixed at creation; only visibility and shadow
//! casting change per tick. The render thread walks the published, visible
//! meshes as [`DrawItem`]s with their world transforms resolved.

use std::sync::Arc;

use duplex_core::{Handle, RenderThread, SimThread, StateKind, StateStore};
use duplex_shared::Transform;

use crate::transform::{TransformHandle, TransformManager};

/// Entity kind marker for static meshes.
pub struct StaticMeshKind;

/// Handle to a static mesh.
pub type StaticMeshHandle = Handle<StaticMeshKind>;

/// Opaque mesh asset id, resolved by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Opaque material asset id, resolved by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Write-once part of a static mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticMeshStatic {
    /// Transform the mesh is placed by.
    pub transform: TransformHandle,
    /// Mesh asset.
    pub mesh: MeshId,
    /// Material asset.
    pub material: MaterialId,
}

/// Per-tick static mesh payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticMeshState {
    /// Drawn at all.
    pub visible: bool,
    /// Drawn into shadow maps.
    pub cast_shadows: bool,
}

impl Default for StaticMeshState {
    fn default() -> Self {
        Self { visible: true, cast_shadows: true }
    }
}

/// Creation arguments for a static mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticMeshConfig {
    /// Transform the mesh is placed by.
    pub transform: TransformHandle,
    /// Mesh asset.
    pub mesh: MeshId,
    /// Material asset.
    pub material: MaterialId,
    /// Initial visibility flags.
    pub state: StaticMeshState,
}

impl StateKind for StaticMeshKind {
    const NAME: &'static str = "static_mesh";
    type Static = StaticMeshStatic;
    type Dynamic = StaticMeshState;
    type Config = StaticMeshConfig;

    fn split(config: StaticMeshConfig) -> (StaticMeshStatic, StaticMeshState) {
        (
            StaticMeshStatic {
                transform: config.transform,
                mesh: config.mesh,
                material: config.material,
            },
            config.state,
        )
    }
}

/// One visible mesh, ready to submit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    /// The mesh entity.
    pub handle: StaticMeshHandle,
    /// Mesh asset.
    pub mesh: MeshId,
    /// Material asset.
    pub material: MaterialId,
    /// World transform as of the last published tick.
    pub world: Transform,
    /// Drawn into shadow maps.
    pub cast_shadows: bool,
}

/// Double-buffered store of static meshes.
pub struct StaticMeshManager {
    store: StateStore<StaticMeshKind>,
    transforms: Arc<TransformManager>,
}

delegate_store!(StaticMeshManager, StaticMeshKind);

impl StaticMeshManager {
    /// Creates a manager with `capacity` pre-allocated meshes, attached to
    /// `transforms`.
    #[must_use]
    pub fn new(capacity: usize, transforms: Arc<TransformManager>) -> Self {
        Self {
            store: StateStore::new(capacity),
            transforms,
        }
    }

    /// Creates a static mesh.
    ///
    /// # Panics
    ///
    /// Fatal if the transform is not in the attached transform store, plus
    /// the store's creation contract.
    pub fn create(&self, sim: &SimThread, config: StaticMeshConfig) -> StaticMeshHandle {
        let _ = self.transforms.get_static(config.transform);
        self.store.create(sim, config)
    }

    /// Shows or hides a mesh.
    pub fn set_visible(&self, sim: &mut SimThread, handle: StaticMeshHandle, visible: bool) {
        self.store.edit_dynamic(sim, handle).visible = visible;
    }

    /// Enables or disables shadow casting.
    pub fn set_cast_shadows(&self, sim: &mut SimThread, handle: StaticMeshHandle, cast_shadows: bool) {
        self.store.edit_dynamic(sim, handle).cast_shadows = cast_shadows;
    }

    /// Visibility as written so far this tick.
    #[must_use]
    pub fn is_visible(&self, sim: &SimThread, handle: StaticMeshHandle) -> bool {
        self.store.read_dynamic_sim(sim, handle).visible
    }

    /// Visibility as of the last published tick.
    #[must_use]
    pub fn is_visible_rend(&self, rend: &RenderThread, handle: StaticMeshHandle) -> bool {
        self.store.read_dynamic_rend(rend, handle).visible
    }

    /// Published visible meshes with world transforms resolved, in creation
    /// order.
    pub fn draw_items_rend<'a>(&'a self, rend: &'a RenderThread) -> impl Iterator<Item = DrawItem> + 'a {
        self.store.handles_rend(rend).filter_map(move |handle| {
            let state = self.store.read_dynamic_rend(rend, handle);
            if !state.visible {
                return None;
            }
            let fixed = self.store.get_static(handle);
            Some(DrawItem {
                handle,
                mesh: fixed.mesh,
                material: fixed.material,
                world: self.transforms.world_transform_rend(rend, fixed.transform),
                cast_shadows: state.cast_shadows,
            })
        })
    }

    /// Published visible meshes that cast shadows.
    pub fn shadow_casters_rend<'a>(
        &'a self,
        rend: &'a RenderThread,
    ) -> impl Iterator<Item = DrawItem> + 'a {
        self.draw_items_rend(rend).filter(|item| item.cast_shadows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::threads;
    use crate::transform::TransformConfig;
    use duplex_core::LifecycleCoordinator;
    use duplex_shared::Vec3;

    #[test]
    fn test_visibility_and_draw_items() {
        let (mut sim, render) = threads();
        let transforms = Arc::new(TransformManager::new(4));
        let meshes = Arc::new(StaticMeshManager::new(4, Arc::clone(&transforms)));
        let coordinator = Arc::new(
            LifecycleCoordinator::builder()
                .register(Arc::clone(&transforms))
                .register(Arc::clone(&meshes))
                .build(),
        );

        coordinator.begin_tick(&mut sim);
        let at = transforms.create(&sim, TransformConfig::at(Vec3::new(0.0, 0.0, -4.0)));
        let mesh = |id| StaticMeshConfig {
            transform: at,
            mesh: MeshId(id),
            material: MaterialId(id * 10),
            state: StaticMeshState::default(),
        };
        let rock = meshes.create(&sim, mesh(1));
        let tree = meshes.create(&sim, mesh(2));
        let bush = meshes.create(&sim, mesh(3));
        meshes.set_visible(&mut sim, tree, false);
        meshes.set_cast_shadows(&mut sim, bush, false);
        assert!(!meshes.is_visible(&sim, tree));
        coordinator.end_tick(&mut sim);

        let (c, m) = (Arc::clone(&coordinator), Arc::clone(&meshes));
        let (items, casters, tree_visible) = render.run(move |rend| {
            c.begin_frame(rend);
            let items: Vec<DrawItem> = m.draw_items_rend(rend).collect();
            let casters: Vec<MeshId> = m.shadow_casters_rend(rend).map(|i| i.mesh).collect();
            let tree_visible = m.is_visible_rend(rend, tree);
            c.end_frame(rend);
            (items, casters, tree_visible)
        });

        assert!(!tree_visible);
        assert_eq!(items.iter().map(|i| i.handle).collect::<Vec<_>>(), vec![rock, bush]);
        assert_eq!(items[0].material, MaterialId(10));
        assert_eq!(items[1].world.translation, Vec3::new(0.0, 0.0, -4.0));
        assert_eq!(casters, vec![MeshId(1)]);
    }

    #[test]
    fn test_static_fields_fixed_at_creation() {
        let (mut sim, _render) = threads();
        let transforms = Arc::new(TransformManager::new(1));
        let meshes = StaticMeshManager::new(1, Arc::clone(&transforms));

        transforms.begin_tick(&mut sim);
        meshes.begin_tick(&mut sim);
        let at = transforms.create(&sim, TransformConfig::default());
        let config = StaticMeshConfig {
            transform: at,
            mesh: MeshId(7),
            material: MaterialId(8),
            state: StaticMeshState { visible: false, cast_shadows: false },
        };
        let h = meshes.create(&sim, config);
        meshes.set_visible(&mut sim, h, true);
        meshes.end_tick(&mut sim);
        transforms.end_tick(&mut sim);

        assert_eq!(
            *meshes.get_static(h),
            StaticMeshStatic { transform: at, mesh: MeshId(7), material: MaterialId(8) }
        );
    }
}
