//! # Lifecycle Fan-Out
//!
//! The main loop brackets every tick and every frame. Each bracket has to
//! reach every store, in a fixed order:
//!
//! ```text
//! coordinator.begin_tick(&mut sim)
//!   ├── transforms.begin_tick
//!   ├── cameras.begin_tick
//!   ├── lights.begin_tick
//!   └── static_meshes.begin_tick
//! ```
//!
//! Order is registration order. Stores whose entities refer to other stores
//! (lights parented to transforms, say) still swap in the same
//! `begin_frame`, so the render thread never sees one half of a cross-store
//! edit.
//!
//! The two threads are not required to alternate. A gate is held across the
//! tick brackets and the `begin_frame` fan-out, so a frame finds either every
//! member ticking (no store swaps, the last commit stays on screen) or every
//! member idle (all pending stores swap). A tick that starts during that
//! fan-out waits for it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::sync::{RenderThread, SimThread};

use super::kind::StateKind;
use super::store::StateStore;

/// Something that participates in tick and frame brackets.
pub trait Lifecycle: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Called at the start of every simulation tick.
    fn begin_tick(&self, sim: &mut SimThread);

    /// Called at the end of every simulation tick.
    fn end_tick(&self, sim: &mut SimThread);

    /// Called at the start of every render frame.
    fn begin_frame(&self, rend: &mut RenderThread);

    /// Called at the end of every render frame.
    fn end_frame(&self, rend: &mut RenderThread);
}

impl<K: StateKind> Lifecycle for StateStore<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn begin_tick(&self, sim: &mut SimThread) {
        StateStore::begin_tick(self, sim);
    }

    fn end_tick(&self, sim: &mut SimThread) {
        StateStore::end_tick(self, sim);
    }

    fn begin_frame(&self, rend: &mut RenderThread) {
        StateStore::begin_frame(self, rend);
    }

    fn end_frame(&self, rend: &mut RenderThread) {
        StateStore::end_frame(self, rend);
    }
}

/// Builder for [`LifecycleCoordinator`].
#[derive(Default)]
pub struct CoordinatorBuilder {
    members: Vec<Arc<dyn Lifecycle>>,
}

impl CoordinatorBuilder {
    /// Appends a member. Brackets reach members in registration order.
    #[must_use]
    pub fn register<L: Lifecycle + 'static>(mut self, member: Arc<L>) -> Self {
        self.members.push(member);
        self
    }

    /// Finishes the coordinator.
    ///
    /// # Panics
    ///
    /// Panics if the same member was registered twice; its brackets would
    /// nest.
    #[must_use]
    pub fn build(self) -> LifecycleCoordinator {
        for (i, member) in self.members.iter().enumerate() {
            let duplicate = self.members[..i]
                .iter()
                .any(|earlier| Arc::as_ptr(earlier).cast::<()>() == Arc::as_ptr(member).cast::<()>());
            assert!(!duplicate, "Lifecycle member `{}` registered twice", member.name());
        }

        tracing::debug!(
            members = ?self.members.iter().map(|m| m.name()).collect::<Vec<_>>(),
            "lifecycle coordinator built"
        );

        LifecycleCoordinator {
            members: self.members.into_boxed_slice(),
            gate: Mutex::new(()),
            ticks: AtomicU64::new(0),
            frames: AtomicU64::new(0),
        }
    }
}

/// Forwards tick and frame brackets to every registered member.
pub struct LifecycleCoordinator {
    members: Box<[Arc<dyn Lifecycle>]>,
    /// Serializes tick brackets against the frame-opening fan-out.
    gate: Mutex<()>,
    ticks: AtomicU64,
    frames: AtomicU64,
}

impl LifecycleCoordinator {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Opens a tick on every member. Blocks while a frame is swapping.
    pub fn begin_tick(&self, sim: &mut SimThread) {
        let _gate = self.gate.lock();
        for member in self.members.iter() {
            member.begin_tick(sim);
        }
    }

    /// Commits the tick on every member.
    pub fn end_tick(&self, sim: &mut SimThread) {
        {
            let _gate = self.gate.lock();
            for member in self.members.iter() {
                member.end_tick(sim);
            }
        }
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(tick, "tick committed");
    }

    /// Opens a frame on every member, swapping any committed tick in.
    ///
    /// If a tick is open, no member swaps and the frame presents the last
    /// commit.
    pub fn begin_frame(&self, rend: &mut RenderThread) {
        let _gate = self.gate.lock();
        for member in self.members.iter() {
            member.begin_frame(rend);
        }
    }

    /// Closes the frame on every member.
    pub fn end_frame(&self, rend: &mut RenderThread) {
        for member in self.members.iter() {
            member.end_frame(rend);
        }
        let frame = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(frame, "frame finished");
    }

    /// Ticks committed so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Frames finished so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Member names in bracket order.
    pub fn member_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().map(|m| m.name())
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Checks if no member is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("members", &self.member_names().collect::<Vec<_>>())
            .field("ticks", &self.tick_count())
            .field("frames", &self.frame_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Handle;
    use crate::sync::ThreadRegistry;
    use crate::testing::RenderWorker;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn push(&self, event: &str) {
            self.log.lock().push(format!("{}.{event}", self.name));
        }
    }

    impl Lifecycle for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }
        fn begin_tick(&self, _: &mut SimThread) {
            self.push("begin_tick");
        }
        fn end_tick(&self, _: &mut SimThread) {
            self.push("end_tick");
        }
        fn begin_frame(&self, _: &mut RenderThread) {
            self.push("begin_frame");
        }
        fn end_frame(&self, _: &mut RenderThread) {
            self.push("end_frame");
        }
    }

    struct Anchor;
    impl StateKind for Anchor {
        const NAME: &'static str = "anchor";
        type Static = ();
        type Dynamic = f32;
        type Config = f32;
        fn split(x: f32) -> ((), f32) {
            ((), x)
        }
    }

    /// Follows an anchor: static link, dynamic offset.
    struct Follower;
    impl StateKind for Follower {
        const NAME: &'static str = "follower";
        type Static = Handle<Anchor>;
        type Dynamic = f32;
        type Config = (Handle<Anchor>, f32);
        fn split(config: Self::Config) -> (Handle<Anchor>, f32) {
            config
        }
    }

    #[test]
    fn test_brackets_follow_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = |name| Arc::new(Recorder { name, log: Arc::clone(&log) });
        let coordinator = LifecycleCoordinator::builder()
            .register(recorder("a"))
            .register(recorder("b"))
            .build();
        assert_eq!(coordinator.member_names().collect::<Vec<_>>(), ["a", "b"]);

        let registry = Arc::new(ThreadRegistry::new());
        let mut sim = registry.register_sim();
        coordinator.begin_tick(&mut sim);
        coordinator.end_tick(&mut sim);

        let coordinator = Arc::new(coordinator);
        let render = RenderWorker::spawn(registry);
        let c = Arc::clone(&coordinator);
        render.run(move |rend| {
            c.begin_frame(rend);
            c.end_frame(rend);
        });

        assert_eq!(
            *log.lock(),
            [
                "a.begin_tick",
                "b.begin_tick",
                "a.end_tick",
                "b.end_tick",
                "a.begin_frame",
                "b.begin_frame",
                "a.end_frame",
                "b.end_frame",
            ]
        );
        assert_eq!(coordinator.tick_count(), 1);
        assert_eq!(coordinator.frame_count(), 1);
    }

    #[test]
    fn test_cross_store_edit_published_together() {
        let anchors = Arc::new(StateStore::<Anchor>::new(4));
        let followers = Arc::new(StateStore::<Follower>::new(4));
        let coordinator = Arc::new(
            LifecycleCoordinator::builder()
                .register(Arc::clone(&anchors))
                .register(Arc::clone(&followers))
                .build(),
        );

        let registry = Arc::new(ThreadRegistry::new());
        let mut sim = registry.register_sim();
        let render = RenderWorker::spawn(registry);

        coordinator.begin_tick(&mut sim);
        let anchor = anchors.create(&sim, 1.0);
        let follower = followers.create(&sim, (anchor, 0.5));
        coordinator.end_tick(&mut sim);

        coordinator.begin_tick(&mut sim);
        *anchors.edit_dynamic(&mut sim, anchor) = 10.0;
        *followers.edit_dynamic(&mut sim, follower) = 2.0;
        coordinator.end_tick(&mut sim);

        let (c, a, f) = (Arc::clone(&coordinator), Arc::clone(&anchors), Arc::clone(&followers));
        let world = render.run(move |rend| {
            c.begin_frame(rend);
            let link = *f.get_static(follower);
            let world = *a.read_dynamic_rend(rend, link) + *f.read_dynamic_rend(rend, follower);
            c.end_frame(rend);
            world
        });
        assert!((world - 12.0).abs() < f32::EPSILON);
        assert_eq!(anchors.stats().swaps, 1);
        assert_eq!(followers.stats().swaps, 1);
    }

    #[test]
    fn test_unfenced_threads_keep_stores_in_lockstep() {
        const TICKS: u16 = 20_000;

        let anchors = Arc::new(StateStore::<Anchor>::new(1));
        let followers = Arc::new(StateStore::<Follower>::new(1));
        let coordinator = Arc::new(
            LifecycleCoordinator::builder()
                .register(Arc::clone(&anchors))
                .register(Arc::clone(&followers))
                .build(),
        );

        let registry = Arc::new(ThreadRegistry::new());
        let mut sim = registry.register_sim();
        coordinator.begin_tick(&mut sim);
        let anchor = anchors.create(&sim, 0.0);
        let follower = followers.create(&sim, (anchor, 0.0));
        coordinator.end_tick(&mut sim);

        let done = Arc::new(AtomicBool::new(false));
        let render = {
            let (registry, c, a, f, done) = (
                Arc::clone(&registry),
                Arc::clone(&coordinator),
                Arc::clone(&anchors),
                Arc::clone(&followers),
                Arc::clone(&done),
            );
            thread::spawn(move || {
                let mut rend = registry.register_rend();
                let mut last = 0.0f32;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    c.begin_frame(&mut rend);
                    let lead = *a.read_dynamic_rend(&rend, anchor);
                    let trail = *f.read_dynamic_rend(&rend, follower);
                    c.end_frame(&mut rend);
                    assert_eq!(lead, trail, "stores published different ticks");
                    assert!(lead >= last, "publication went back from {last} to {lead}");
                    last = lead;
                    if finished {
                        return last;
                    }
                }
            })
        };

        // No fences: ticks and frames overlap freely
        for i in 1..=TICKS {
            coordinator.begin_tick(&mut sim);
            *anchors.edit_dynamic(&mut sim, anchor) = f32::from(i);
            *followers.edit_dynamic(&mut sim, follower) = f32::from(i);
            coordinator.end_tick(&mut sim);
        }
        done.store(true, Ordering::Release);

        assert_eq!(render.join().unwrap(), f32::from(TICKS));
        assert_eq!(anchors.stats().swaps, followers.stats().swaps);
        assert_eq!(coordinator.tick_count(), u64::from(TICKS) + 1);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_member_panics() {
        let store = Arc::new(StateStore::<Anchor>::new(1));
        let _ = LifecycleCoordinator::builder()
            .register(Arc::clone(&store))
            .register(store)
            .build();
    }
}
