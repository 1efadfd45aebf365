//! # Double-Buffered State Store
//!
//! One store per entity kind. Every entity owns one slot:
//!
//! ```text
//!              ┌─────────────── slot i ───────────────┐
//!              │ header: (id, static)   write-once    │
//!              │ dynamic[0] ◄── back  (sim writes)    │
//!              │ dynamic[1] ◄── front (render reads)  │
//!              └──────────────────────────────────────┘
//!
//! SIM:    begin_tick ── create / edit_dynamic / read_dynamic_sim ── end_tick
//!                                                                      │
//!                                                          pending_commit = true
//!                                                                      │
//! RENDER: begin_frame ── [swap: flip write_index, re-sync dirty] ── read_dynamic_rend ── end_frame
//! ```
//!
//! ## Access rules
//!
//! - Back slots are touched by the simulation thread only, inside a tick.
//! - Front slots are touched by the render thread only.
//! - The swap runs on the render thread, at the start of `begin_frame`, and
//!   only when a tick committed since the last swap. It flips `write_index`
//!   and copies every slot edited during the tick from the new front into
//!   the new back, so the next tick starts from committed state.
//! - A phase word (`IDLE` / `TICKING` / `SWAPPING`) keeps the swap and the
//!   tick apart. A frame that starts while a tick is open skips the swap and
//!   keeps presenting the previous commit, which stays pending. A tick that
//!   starts while a swap is running waits for it to finish.
//!
//! References handed out by the store borrow the thread token, so the
//! closing bracket of each side (`end_tick(&mut sim)`, `begin_frame(&mut
//! rend)`) cannot be called while any of them is alive.
//!
//! ## Storage
//!
//! Slots are pre-allocated at construction and never move. Creating past
//! capacity is fatal. Nothing is ever destroyed.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::error::{fatal, ContractViolation};
use crate::sync::{RenderThread, SimThread};

use super::dirty::DirtySet;
use super::handle::{next_handle_id, Handle};
use super::kind::StateKind;

const IDLE: u8 = 0;
const TICKING: u8 = 1;
const SWAPPING: u8 = 2;

struct SlotHeader<S> {
    id: u64,
    value: S,
}

struct Slot<S, D> {
    /// Set once by `create`. A slot without a header has no handle.
    header: OnceLock<SlotHeader<S>>,
    dynamic: [UnsafeCell<D>; 2],
}

impl<S, D: Default> Slot<S, D> {
    fn vacant() -> Self {
        Self {
            header: OnceLock::new(),
            dynamic: [UnsafeCell::new(D::default()), UnsafeCell::new(D::default())],
        }
    }
}

/// Counters for diagnostics and benchmarks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Entities created so far.
    pub len: usize,
    /// Entities visible to the render thread (created before the last swap).
    pub published: usize,
    /// Pre-allocated slot count.
    pub capacity: usize,
    /// Buffer swaps performed.
    pub swaps: u64,
    /// Dirty slots copied front → back across all swaps.
    pub copied_slots: u64,
}

/// Handle-indexed, double-buffered storage for one entity kind.
///
/// Safe to share between the simulation and render threads (typically in an
/// `Arc`); which side may touch which half is enforced by the thread tokens
/// and the tick/frame brackets.
pub struct StateStore<K: StateKind> {
    slots: Box<[Slot<K::Static, K::Dynamic>]>,
    /// Slots with a header. Written by the simulation thread.
    len: AtomicUsize,
    /// `len` as of the last swap. Bounds render-side enumeration.
    published_len: AtomicUsize,
    /// Index into `Slot::dynamic` of the back (writable) half.
    write_index: AtomicUsize,
    phase: AtomicU8,
    pending_commit: AtomicBool,
    frame_active: AtomicBool,
    /// Registry that issued the first token seen by this store.
    owner: OnceLock<u64>,
    dirty: DirtySet,
    swaps: AtomicU64,
    copied_slots: AtomicU64,
}

// SAFETY: The cells in `slots` are only reached through methods that take a
// thread token and check it against the current thread. Back cells are
// written by the simulation thread while the phase word is TICKING, front
// cells are read by the render thread, and the swap (the only code that
// touches both halves) runs on the render thread while the phase word is
// SWAPPING. Release/acquire on `phase` orders the simulation thread's writes
// before the swap that publishes them, and the swap's copies before the next
// tick.
unsafe impl<K: StateKind> Sync for StateStore<K> {}

impl<K: StateKind> StateStore<K> {
    /// Creates a store with `capacity` pre-allocated slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or does not fit a handle index.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Store `{}` needs at least one slot", K::NAME);
        assert!(
            capacity <= u32::MAX as usize,
            "Store `{}` capacity {capacity} exceeds handle index range",
            K::NAME
        );

        tracing::debug!(store = K::NAME, capacity, "state store allocated");

        Self {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            len: AtomicUsize::new(0),
            published_len: AtomicUsize::new(0),
            write_index: AtomicUsize::new(0),
            phase: AtomicU8::new(IDLE),
            pending_commit: AtomicBool::new(false),
            frame_active: AtomicBool::new(false),
            owner: OnceLock::new(),
            dirty: DirtySet::new(capacity),
            swaps: AtomicU64::new(0),
            copied_slots: AtomicU64::new(0),
        }
    }

    /// Store name (the entity kind).
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        K::NAME
    }

    /// Pre-allocated slot count.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of entities created so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Checks if no entity was created yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if a simulation tick is open on this store.
    #[inline]
    #[must_use]
    pub fn is_tick_active(&self) -> bool {
        self.phase.load(Ordering::Acquire) == TICKING
    }

    /// Snapshot of the store counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            len: self.len(),
            published: self.published_len.load(Ordering::Acquire),
            capacity: self.capacity(),
            swaps: self.swaps.load(Ordering::Relaxed),
            copied_slots: self.copied_slots.load(Ordering::Relaxed),
        }
    }

    // ------------------------------------------------------------------
    // Simulation side
    // ------------------------------------------------------------------

    /// Creates an entity and returns its handle.
    ///
    /// Both halves of the new slot start from the config's dynamic payload,
    /// so the render thread reads the initial value until the first commit
    /// that changes it. The entity becomes enumerable on the render side
    /// after the next swap.
    ///
    /// # Panics
    ///
    /// Fatal outside a tick, off the simulation thread, or when the store is
    /// full.
    pub fn create(&self, sim: &SimThread, config: K::Config) -> Handle<K> {
        self.check_sim(sim, "create");
        self.require_tick("create");

        let index = self.len.load(Ordering::Relaxed);
        let Some(slot) = self.slots.get(index) else {
            fatal(ContractViolation::CapacityExhausted {
                store: K::NAME,
                capacity: self.slots.len(),
            });
        };

        let (value, dynamic) = K::split(config);
        // SAFETY: `index >= len`, so no handle to this slot exists and no
        // reference into either cell has been handed out. Only the
        // simulation thread creates, and it is the current thread.
        unsafe {
            *slot.dynamic[0].get() = dynamic.clone();
            *slot.dynamic[1].get() = dynamic;
        }

        let id = next_handle_id();
        assert!(
            slot.header.set(SlotHeader { id, value }).is_ok(),
            "Slot {index} of `{}` initialized twice",
            K::NAME
        );
        self.len.store(index + 1, Ordering::Release);

        tracing::trace!(store = K::NAME, id, index, "entity created");
        Handle::new(id, index as u32)
    }

    /// Mutable access to the back half of an entity's dynamic state.
    ///
    /// The edit becomes visible to the render thread after the next swap.
    ///
    /// # Panics
    ///
    /// Fatal outside a tick, off the simulation thread, or for a handle this
    /// store did not produce.
    pub fn edit_dynamic<'a>(
        &'a self,
        sim: &'a mut SimThread,
        handle: Handle<K>,
    ) -> &'a mut K::Dynamic {
        self.check_sim(sim, "edit_dynamic");
        self.require_tick("edit_dynamic");
        let (index, slot) = self.lookup("edit_dynamic", handle);

        self.dirty.mark(index);
        let back = self.write_index.load(Ordering::Relaxed);
        // SAFETY: Back cells belong to the simulation thread (checked above)
        // and the swap cannot run while the phase word is TICKING. The
        // result borrows `sim` mutably, so no other simulation-side
        // reference into this store coexists with it.
        unsafe { &mut *slot.dynamic[back].get() }
    }

    /// Reads the back half: the simulation's own view, including edits
    /// made earlier in the current tick.
    ///
    /// # Panics
    ///
    /// Fatal outside a tick, off the simulation thread, or for a handle this
    /// store did not produce.
    pub fn read_dynamic_sim<'a>(&'a self, sim: &'a SimThread, handle: Handle<K>) -> &'a K::Dynamic {
        self.check_sim(sim, "read_dynamic_sim");
        self.require_tick("read_dynamic_sim");
        let (_, slot) = self.lookup("read_dynamic_sim", handle);

        let back = self.write_index.load(Ordering::Relaxed);
        // SAFETY: Shared borrow of `sim` excludes `edit_dynamic` for as
        // long as this reference lives. The render thread never touches
        // the back half.
        unsafe { &*slot.dynamic[back].get() }
    }

    /// Handles of every entity created so far, in creation order.
    pub fn handles_sim<'a>(&'a self, sim: &SimThread) -> impl Iterator<Item = Handle<K>> + 'a {
        self.check_sim(sim, "handles_sim");
        self.handles_upto(self.len.load(Ordering::Acquire))
    }

    /// Opens a simulation tick. Waits out a swap the render thread is
    /// running.
    ///
    /// # Panics
    ///
    /// Fatal if a tick is already open.
    pub fn begin_tick(&self, sim: &mut SimThread) {
        self.check_sim(sim, "begin_tick");
        let mut spins = 0u32;
        loop {
            match self
                .phase
                .compare_exchange_weak(IDLE, TICKING, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(TICKING) => fatal(ContractViolation::TickAlreadyActive { store: K::NAME }),
                Err(_) if spins < 64 => {
                    spins += 1;
                    std::hint::spin_loop();
                }
                Err(_) => std::thread::yield_now(),
            }
        }
    }

    /// Closes the tick and marks its writes ready for the next swap.
    ///
    /// # Panics
    ///
    /// Fatal if no tick is open.
    pub fn end_tick(&self, sim: &mut SimThread) {
        self.check_sim(sim, "end_tick");
        // Only this thread leaves TICKING, so the load cannot go stale
        if self.phase.load(Ordering::Relaxed) != TICKING {
            fatal(ContractViolation::NoActiveTick {
                operation: "end_tick",
                store: K::NAME,
            });
        }
        self.pending_commit.store(true, Ordering::Relaxed);
        self.phase.store(IDLE, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Render side
    // ------------------------------------------------------------------

    /// Reads the front half: the value as of the last committed tick.
    ///
    /// # Panics
    ///
    /// Fatal off the render thread or for a handle this store did not
    /// produce.
    pub fn read_dynamic_rend<'a>(
        &'a self,
        rend: &'a RenderThread,
        handle: Handle<K>,
    ) -> &'a K::Dynamic {
        self.check_rend(rend, "read_dynamic_rend");
        let (_, slot) = self.lookup("read_dynamic_rend", handle);

        let front = self.write_index.load(Ordering::Relaxed) ^ 1;
        // SAFETY: Front cells are written only by the swap, which runs on
        // this thread under `begin_frame(&mut rend)` and so cannot overlap
        // this borrow, and by `create` before the slot had a handle.
        unsafe { &*slot.dynamic[front].get() }
    }

    /// Handles of every entity published by the last swap, in creation
    /// order.
    pub fn handles_rend<'a>(&'a self, rend: &RenderThread) -> impl Iterator<Item = Handle<K>> + 'a {
        self.check_rend(rend, "handles_rend");
        self.handles_upto(self.published_len.load(Ordering::Relaxed))
    }

    /// Opens a render frame. Publishes the last committed tick first, if
    /// one is pending and no tick is open.
    ///
    /// Returns `true` if this frame swapped.
    ///
    /// # Panics
    ///
    /// Fatal if a frame is already open.
    pub fn begin_frame(&self, rend: &mut RenderThread) -> bool {
        self.check_rend(rend, "begin_frame");
        if self.frame_active.swap(true, Ordering::Relaxed) {
            fatal(ContractViolation::FrameAlreadyActive { store: K::NAME });
        }

        if self
            .phase
            .compare_exchange(IDLE, SWAPPING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Tick open: the front halves still hold the last commit
            if self.pending_commit.load(Ordering::Relaxed) {
                tracing::trace!(store = K::NAME, "swap deferred, tick in progress");
            }
            return false;
        }

        let swapped = self.pending_commit.swap(false, Ordering::Relaxed);
        if swapped {
            self.swap_buffers();
        }
        self.phase.store(IDLE, Ordering::Release);
        swapped
    }

    /// Closes the render frame.
    ///
    /// # Panics
    ///
    /// Fatal if no frame is open.
    pub fn end_frame(&self, rend: &mut RenderThread) {
        self.check_rend(rend, "end_frame");
        if !self.frame_active.swap(false, Ordering::Relaxed) {
            fatal(ContractViolation::NoActiveFrame { store: K::NAME });
        }
    }

    /// Flips the halves and re-syncs the new back half. Render thread only,
    /// with the phase word at SWAPPING.
    fn swap_buffers(&self) {
        let new_front = self.write_index.fetch_xor(1, Ordering::Relaxed);
        let new_back = new_front ^ 1;

        let copied = self.dirty.drain(|index| {
            let slot = &self.slots[index];
            // SAFETY: Phase is SWAPPING, so the simulation thread holds no
            // reference into this store and cannot obtain one. The caller
            // holds `&mut RenderThread`, so no render-side reference exists
            // either. The two cells of a slot never alias.
            unsafe {
                let committed = &*slot.dynamic[new_front].get();
                (*slot.dynamic[new_back].get()).clone_from(committed);
            }
        });

        let published = self.len.load(Ordering::Relaxed);
        self.published_len.store(published, Ordering::Release);
        self.swaps.fetch_add(1, Ordering::Relaxed);
        self.copied_slots.fetch_add(copied as u64, Ordering::Relaxed);

        tracing::trace!(store = K::NAME, copied, published, "buffers swapped");
    }

    // ------------------------------------------------------------------
    // Either side
    // ------------------------------------------------------------------

    /// The write-once static payload of an entity.
    ///
    /// # Panics
    ///
    /// Fatal for a handle this store did not produce.
    pub fn get_static(&self, handle: Handle<K>) -> &K::Static {
        let (_, slot) = self.lookup("get_static", handle);
        match slot.header.get() {
            Some(header) => &header.value,
            None => self.invalid("get_static", handle),
        }
    }

    /// Checks if `handle` names an entity of this store.
    #[must_use]
    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.slots
            .get(handle.index() as usize)
            .and_then(|slot| slot.header.get())
            .is_some_and(|header| header.id == handle.id())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    #[track_caller]
    fn lookup(&self, operation: &'static str, handle: Handle<K>) -> (usize, &Slot<K::Static, K::Dynamic>) {
        let index = handle.index() as usize;
        match self.slots.get(index) {
            Some(slot) if slot.header.get().is_some_and(|h| h.id == handle.id()) => (index, slot),
            _ => self.invalid(operation, handle),
        }
    }

    #[cold]
    #[track_caller]
    fn invalid(&self, operation: &'static str, handle: Handle<K>) -> ! {
        fatal(ContractViolation::InvalidHandle {
            operation,
            store: K::NAME,
            id: handle.id(),
            index: handle.index(),
        })
    }

    #[track_caller]
    fn require_tick(&self, operation: &'static str) {
        if self.phase.load(Ordering::Relaxed) != TICKING {
            fatal(ContractViolation::NoActiveTick { operation, store: K::NAME });
        }
    }

    #[track_caller]
    fn check_sim(&self, sim: &SimThread, operation: &'static str) {
        sim.assert_current(operation, K::NAME);
        self.bind(sim.registry_id(), operation);
    }

    #[track_caller]
    fn check_rend(&self, rend: &RenderThread, operation: &'static str) {
        rend.assert_current(operation, K::NAME);
        self.bind(rend.registry_id(), operation);
    }

    #[track_caller]
    fn bind(&self, registry: u64, operation: &'static str) {
        if *self.owner.get_or_init(|| registry) != registry {
            fatal(ContractViolation::ForeignToken { operation, store: K::NAME });
        }
    }

    fn handles_upto(&self, len: usize) -> impl Iterator<Item = Handle<K>> + '_ {
        self.slots[..len]
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.header.get().map(|h| Handle::new(h.id, index as u32)))
    }
}

impl<K: StateKind> fmt::Debug for StateStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("name", &K::NAME)
            .field("stats", &self.stats())
            .field("tick_active", &self.is_tick_active())
            .finish_non_exhaustive()
    }
}
