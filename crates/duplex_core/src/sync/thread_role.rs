//! # Thread Identity
//!
//! Which OS thread is the simulation thread, which is the render thread.
//!
//! ```text
//!   spawn sim ──> registry.register_sim()  ──> SimThread token
//!   spawn rend ─> registry.register_rend() ──> RenderThread token
//!
//!   store.edit_dynamic(&mut sim, h)        // asserts: current thread == sim
//!   store.read_dynamic_rend(&rend, h)      // asserts: current thread == rend
//! ```
//!
//! The tokens are the only way to call thread-owned store operations, and
//! every such call re-checks that the token is used on the thread that
//! registered it. These checks are what enforces single-writer /
//! single-reader access to the slots, so they are active in release builds
//! too.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

use crate::error::{fatal, ContractViolation, ThreadRole};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Records the identity of the two engine threads.
///
/// Each slot is write-once. One registry exists per engine context; there is
/// no process-wide registry. Tokens remember which registry issued them, and
/// a store accepts tokens from one registry only.
#[derive(Debug)]
pub struct ThreadRegistry {
    id: u64,
    sim: OnceLock<ThreadId>,
    rend: OnceLock<ThreadId>,
}

impl ThreadRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            sim: OnceLock::new(),
            rend: OnceLock::new(),
        }
    }

    /// Registers the calling thread as the simulation thread.
    ///
    /// # Panics
    ///
    /// Fatal if a simulation thread is already registered, or if the calling
    /// thread is the registered render thread.
    #[must_use = "the token is the only way to drive simulation-side operations"]
    pub fn register_sim(&self) -> SimThread {
        let thread = self.claim(ThreadRole::Sim);
        tracing::debug!(?thread, registry = self.id, "simulation thread registered");
        SimThread { thread, registry: self.id, _not_sync: PhantomData }
    }

    /// Registers the calling thread as the render thread.
    ///
    /// # Panics
    ///
    /// Fatal if a render thread is already registered, or if the calling
    /// thread is the registered simulation thread.
    #[must_use = "the token is the only way to drive render-side operations"]
    pub fn register_rend(&self) -> RenderThread {
        let thread = self.claim(ThreadRole::Render);
        tracing::debug!(?thread, registry = self.id, "render thread registered");
        RenderThread { thread, registry: self.id, _not_sync: PhantomData }
    }

    /// Returns true if the calling thread registered as the simulation thread.
    ///
    /// # Panics
    ///
    /// Fatal if no simulation thread has registered yet.
    #[must_use]
    pub fn is_sim_thread(&self) -> bool {
        self.registered(ThreadRole::Sim) == thread::current().id()
    }

    /// Returns true if the calling thread registered as the render thread.
    ///
    /// # Panics
    ///
    /// Fatal if no render thread has registered yet.
    #[must_use]
    pub fn is_rend_thread(&self) -> bool {
        self.registered(ThreadRole::Render) == thread::current().id()
    }

    /// Returns true once both roles are registered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sim.get().is_some() && self.rend.get().is_some()
    }

    fn slot(&self, role: ThreadRole) -> &OnceLock<ThreadId> {
        match role {
            ThreadRole::Sim => &self.sim,
            ThreadRole::Render => &self.rend,
        }
    }

    fn other(role: ThreadRole) -> ThreadRole {
        match role {
            ThreadRole::Sim => ThreadRole::Render,
            ThreadRole::Render => ThreadRole::Sim,
        }
    }

    fn registered(&self, role: ThreadRole) -> ThreadId {
        match self.slot(role).get() {
            Some(id) => *id,
            None => fatal(ContractViolation::RoleNotRegistered { role }),
        }
    }

    fn claim(&self, role: ThreadRole) -> ThreadId {
        let current = thread::current().id();
        let other = Self::other(role);
        if self.slot(other).get() == Some(&current) {
            fatal(ContractViolation::RoleConflict { held: other, requested: role });
        }
        if self.slot(role).set(current).is_err() {
            fatal(ContractViolation::RoleAlreadyRegistered { role });
        }
        current
    }
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability token of the simulation thread.
///
/// Obtained once from [`ThreadRegistry::register_sim`]. It can be moved but
/// not shared or cloned. Store operations that hand out references borrow
/// it, so `end_tick(&mut sim)` statically ends every simulation-side borrow
/// of the tick.
#[derive(Debug)]
pub struct SimThread {
    thread: ThreadId,
    registry: u64,
    _not_sync: PhantomData<Cell<()>>,
}

impl SimThread {
    /// Id of the registry that issued this token.
    #[inline]
    pub(crate) const fn registry_id(&self) -> u64 {
        self.registry
    }

    /// Returns true if called on the thread that registered this token.
    #[inline]
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Asserts that `operation` on `store` runs on the simulation thread.
    #[inline]
    #[track_caller]
    pub fn assert_current(&self, operation: &'static str, store: &'static str) {
        if !self.is_current() {
            fatal(ContractViolation::WrongThread {
                operation,
                store,
                expected: ThreadRole::Sim,
            });
        }
    }
}

/// Capability token of the render thread.
///
/// Obtained once from [`ThreadRegistry::register_rend`]. Render reads borrow
/// it, so `begin_frame(&mut rend)` (where the swap happens) cannot run while
/// a front-slot reference is still alive.
#[derive(Debug)]
pub struct RenderThread {
    thread: ThreadId,
    registry: u64,
    _not_sync: PhantomData<Cell<()>>,
}

impl RenderThread {
    /// Id of the registry that issued this token.
    #[inline]
    pub(crate) const fn registry_id(&self) -> u64 {
        self.registry
    }

    /// Returns true if called on the thread that registered this token.
    #[inline]
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Asserts that `operation` on `store` runs on the render thread.
    #[inline]
    #[track_caller]
    pub fn assert_current(&self, operation: &'static str, store: &'static str) {
        if !self.is_current() {
            fatal(ContractViolation::WrongThread {
                operation,
                store,
                expected: ThreadRole::Render,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_predicates_per_thread() {
        let registry = Arc::new(ThreadRegistry::new());
        let sim = registry.register_sim();
        assert!(sim.is_current());
        assert!(registry.is_sim_thread());
        assert!(!registry.is_complete());

        let rend_registry = Arc::clone(&registry);
        thread::spawn(move || {
            let rend = rend_registry.register_rend();
            assert!(rend.is_current());
            assert!(rend_registry.is_rend_thread());
            assert!(!rend_registry.is_sim_thread());
        })
        .join()
        .unwrap();

        assert!(registry.is_complete());
        assert!(!registry.is_rend_thread());

        // A third thread is neither
        let third = Arc::clone(&registry);
        thread::spawn(move || {
            assert!(!third.is_sim_thread());
            assert!(!third.is_rend_thread());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_tokens_remember_their_registry() {
        let a = ThreadRegistry::new();
        let b = ThreadRegistry::new();
        let sim_a = a.register_sim();
        let sim_b = b.register_sim();
        assert_ne!(sim_a.registry_id(), sim_b.registry_id());
    }

    #[test]
    fn test_token_moved_to_other_thread_is_not_current() {
        let registry = ThreadRegistry::new();
        let sim = registry.register_sim();
        let moved = thread::spawn(move || sim.is_current()).join().unwrap();
        assert!(!moved);
    }

    #[test]
    #[should_panic(expected = "simulation thread registered twice")]
    fn test_double_registration_panics() {
        let registry = Arc::new(ThreadRegistry::new());
        let _sim = registry.register_sim();

        let again = Arc::clone(&registry);
        let result = thread::spawn(move || {
            let _ = again.register_sim();
        })
        .join();
        if let Err(payload) = result {
            std::panic::resume_unwind(payload);
        }
    }

    #[test]
    #[should_panic(expected = "cannot also be render")]
    fn test_one_thread_both_roles_panics() {
        let registry = ThreadRegistry::new();
        let _sim = registry.register_sim();
        let _rend = registry.register_rend();
    }

    #[test]
    #[should_panic(expected = "render thread queried before registration")]
    fn test_query_before_registration_panics() {
        let registry = ThreadRegistry::new();
        let _ = registry.is_rend_thread();
    }

    #[test]
    #[should_panic(expected = "must run on the render thread")]
    fn test_assert_current_wrong_thread() {
        let registry = Arc::new(ThreadRegistry::new());
        let other = Arc::clone(&registry);
        let rend = thread::spawn(move || other.register_rend()).join().unwrap();
        rend.assert_current("read_dynamic_rend", "camera");
    }
}
