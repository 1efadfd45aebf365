//! # Engine Context
//!
//! Everything both threads share: the thread registry, the four scene
//! managers, the coordinator that swaps them together and the message rings.
//!
//! ```text
//! EngineContext
//!   ├─ registry       one sim + one render token, ever
//!   ├─ transforms ─┐
//!   ├─ cameras ────┤  registered with the coordinator in this order
//!   ├─ lights ─────┤
//!   ├─ meshes ─────┘
//!   ├─ coordinator    begin/end tick, begin/end frame for all of the above
//!   └─ messages       to_render / to_sim rings
//! ```

use std::sync::Arc;

use duplex_core::{LifecycleCoordinator, StoreStats, ThreadRegistry};
use duplex_scene::{CameraManager, LightManager, StaticMeshManager, TransformManager};

use crate::config::{ConfigError, EngineConfig};
use crate::events::MessageQueues;

/// Shared engine state, borrowed by both loop threads.
pub struct EngineContext {
    registry: Arc<ThreadRegistry>,
    transforms: Arc<TransformManager>,
    cameras: Arc<CameraManager>,
    lights: Arc<LightManager>,
    static_meshes: Arc<StaticMeshManager>,
    coordinator: LifecycleCoordinator,
    messages: MessageQueues,
}

impl EngineContext {
    /// Allocates every store and ring from `config`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`EngineConfig::validate`].
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let stores = &config.stores;

        let transforms = Arc::new(TransformManager::new(stores.transforms));
        let cameras = Arc::new(CameraManager::new(stores.cameras, Arc::clone(&transforms)));
        let lights = Arc::new(LightManager::new(stores.lights, Arc::clone(&transforms)));
        let static_meshes = Arc::new(StaticMeshManager::new(
            stores.static_meshes,
            Arc::clone(&transforms),
        ));

        let coordinator = LifecycleCoordinator::builder()
            .register(Arc::clone(&transforms))
            .register(Arc::clone(&cameras))
            .register(Arc::clone(&lights))
            .register(Arc::clone(&static_meshes))
            .build();

        tracing::info!(
            transforms = stores.transforms,
            cameras = stores.cameras,
            lights = stores.lights,
            static_meshes = stores.static_meshes,
            queue = config.queue.capacity,
            "engine context initialized"
        );

        Ok(Self {
            registry: Arc::new(ThreadRegistry::new()),
            transforms,
            cameras,
            lights,
            static_meshes,
            coordinator,
            messages: MessageQueues::new(config.queue.capacity),
        })
    }

    /// Thread registry the loop threads register with.
    #[must_use]
    pub fn registry(&self) -> &Arc<ThreadRegistry> {
        &self.registry
    }

    /// Transform manager.
    #[must_use]
    pub fn transforms(&self) -> &Arc<TransformManager> {
        &self.transforms
    }

    /// Camera manager.
    #[must_use]
    pub fn cameras(&self) -> &Arc<CameraManager> {
        &self.cameras
    }

    /// Light manager.
    #[must_use]
    pub fn lights(&self) -> &Arc<LightManager> {
        &self.lights
    }

    /// Static mesh manager.
    #[must_use]
    pub fn static_meshes(&self) -> &Arc<StaticMeshManager> {
        &self.static_meshes
    }

    /// Coordinator over all four managers.
    #[must_use]
    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    /// Message rings between the threads.
    #[must_use]
    pub fn messages(&self) -> &MessageQueues {
        &self.messages
    }

    /// Counters of every store, in coordinator order.
    #[must_use]
    pub fn store_stats(&self) -> [(&'static str, StoreStats); 4] {
        [
            (self.transforms.name(), self.transforms.stats()),
            (self.cameras.name(), self.cameras.stats()),
            (self.lights.name(), self.lights.stats()),
            (self.static_meshes.name(), self.static_meshes.stats()),
        ]
    }

    /// Tears the context down, logging final store counters.
    pub fn shutdown(self) {
        for (store, stats) in self.store_stats() {
            tracing::info!(
                store,
                entities = stats.len,
                capacity = stats.capacity,
                swaps = stats.swaps,
                copied_slots = stats.copied_slots,
                "store closed"
            );
        }
        tracing::info!(
            ticks = self.coordinator.tick_count(),
            frames = self.coordinator.frame_count(),
            dropped_messages = self.messages.dropped(),
            "engine context shut down"
        );
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("coordinator", &self.coordinator)
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreCapacities;
    use duplex_core::testing::RenderWorker;
    use duplex_scene::{LightConfig, LightState, TransformConfig};
    use duplex_shared::Vec3;

    fn small_config() -> EngineConfig {
        EngineConfig {
            stores: StoreCapacities { transforms: 8, cameras: 1, lights: 2, static_meshes: 2 },
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_members_in_order() {
        let engine = EngineContext::new(&small_config()).unwrap();
        assert_eq!(
            engine.coordinator().member_names().collect::<Vec<_>>(),
            vec!["transform", "camera", "light", "static_mesh"]
        );
        assert_eq!(engine.cameras().capacity(), 1);
        assert_eq!(engine.transforms().capacity(), 8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.stores.cameras = 0;
        assert!(matches!(
            EngineContext::new(&config),
            Err(ConfigError::InvalidCapacity { field: "stores.cameras", .. })
        ));
    }

    #[test]
    fn test_light_follows_transform_across_stores() {
        let engine = Arc::new(EngineContext::new(&small_config()).unwrap());
        let mut sim = engine.registry().register_sim();
        let render = RenderWorker::spawn(Arc::clone(engine.registry()));

        engine.coordinator().begin_tick(&mut sim);
        let pivot = engine.transforms().create(&sim, TransformConfig::at(Vec3::new(1.0, 0.0, 0.0)));
        let lamp = engine.lights().create(
            &sim,
            LightConfig { transform: pivot, state: LightState::default() },
        );
        engine.coordinator().end_tick(&mut sim);

        engine.coordinator().begin_tick(&mut sim);
        engine.transforms().set_translation(&mut sim, pivot, Vec3::new(2.0, 0.0, 0.0));
        engine.coordinator().end_tick(&mut sim);

        let e = Arc::clone(&engine);
        let at = render.run(move |rend| {
            e.coordinator().begin_frame(rend);
            let at = e.lights().world_position_rend(rend, lamp);
            e.coordinator().end_frame(rend);
            at
        });
        assert_eq!(at, Vec3::new(2.0, 0.0, 0.0));

        let stats = engine.store_stats();
        assert_eq!(stats[0].0, "transform");
        assert_eq!(stats[0].1.len, 1);
        assert_eq!(stats[2].1.swaps, 1);
        assert_eq!(engine.coordinator().tick_count(), 2);
    }
}
