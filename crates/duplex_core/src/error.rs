//! # Contract Violations
//!
//! Every way the engine can be misused from the outside.
//!
//! None of these are recoverable. A wrong-thread access or a stale handle
//! means the single-writer/single-reader discipline is already broken, so
//! the violation is logged and the process goes down via [`fatal`].

use std::fmt;

use thiserror::Error;

/// The two long-running engine threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadRole {
    /// The simulation thread: owns the back (writable) slots.
    Sim,
    /// The render thread: owns the front (readable) slots.
    Render,
}

impl fmt::Display for ThreadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sim => f.write_str("simulation"),
            Self::Render => f.write_str("render"),
        }
    }
}

/// A broken engine contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// An operation reserved for one thread was called from another.
    #[error("`{operation}` on store `{store}` must run on the {expected} thread")]
    WrongThread {
        /// The operation that was called.
        operation: &'static str,
        /// The store (entity kind) it was called on.
        store: &'static str,
        /// The thread that owns the operation.
        expected: ThreadRole,
    },

    /// A token issued by a different thread registry than the store's.
    #[error("`{operation}` on store `{store}` got a token from a foreign thread registry")]
    ForeignToken {
        /// The operation that was called.
        operation: &'static str,
        /// The store (entity kind) it was called on.
        store: &'static str,
    },

    /// A handle that the store never produced (or the invalid sentinel).
    #[error("`{operation}` on store `{store}` got unknown handle #{id}@{index}")]
    InvalidHandle {
        /// The operation that was called.
        operation: &'static str,
        /// The store (entity kind) it was called on.
        store: &'static str,
        /// Unique id carried by the handle.
        id: u64,
        /// Slot index carried by the handle.
        index: u32,
    },

    /// An operation that needs an open tick was called outside one.
    #[error("`{operation}` on store `{store}` requires an active simulation tick")]
    NoActiveTick {
        /// The operation that was called.
        operation: &'static str,
        /// The store (entity kind) it was called on.
        store: &'static str,
    },

    /// `begin_tick` while a tick is already open.
    #[error("store `{store}`: begin_tick called twice without end_tick")]
    TickAlreadyActive {
        /// The store (entity kind).
        store: &'static str,
    },

    /// `begin_frame` while a frame is already open.
    #[error("store `{store}`: begin_frame called twice without end_frame")]
    FrameAlreadyActive {
        /// The store (entity kind).
        store: &'static str,
    },

    /// `end_frame` without a matching `begin_frame`.
    #[error("store `{store}`: end_frame without begin_frame")]
    NoActiveFrame {
        /// The store (entity kind).
        store: &'static str,
    },

    /// The pre-allocated slot table is full.
    #[error("store `{store}`: capacity of {capacity} slots exhausted")]
    CapacityExhausted {
        /// The store (entity kind).
        store: &'static str,
        /// Number of slots the store was built with.
        capacity: usize,
    },

    /// A role was registered a second time.
    #[error("{role} thread registered twice")]
    RoleAlreadyRegistered {
        /// The role.
        role: ThreadRole,
    },

    /// A role was queried before any thread registered for it.
    #[error("{role} thread queried before registration")]
    RoleNotRegistered {
        /// The role.
        role: ThreadRole,
    },

    /// One OS thread tried to take both roles.
    #[error("thread already registered as {held}, cannot also be {requested}")]
    RoleConflict {
        /// The role the thread already holds.
        held: ThreadRole,
        /// The role it asked for.
        requested: ThreadRole,
    },
}

/// Logs the violation and aborts the current thread of control.
///
/// With the workspace's `panic = "abort"` profiles this terminates the
/// process.
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(violation: ContractViolation) -> ! {
    tracing::error!(%violation, "engine contract violated");
    panic!("{violation}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages() {
        let v = ContractViolation::WrongThread {
            operation: "edit_dynamic",
            store: "transform",
            expected: ThreadRole::Sim,
        };
        assert_eq!(
            v.to_string(),
            "`edit_dynamic` on store `transform` must run on the simulation thread"
        );

        let v = ContractViolation::InvalidHandle {
            operation: "get_static",
            store: "light",
            id: 0,
            index: u32::MAX,
        };
        assert!(v.to_string().contains("unknown handle #0@"));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_fatal_panics_with_message() {
        fatal(ContractViolation::RoleAlreadyRegistered { role: ThreadRole::Render });
    }
}
