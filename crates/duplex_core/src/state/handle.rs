//! # Handles
//!
//! A handle names one entity inside one store:
//! - A process-wide unique id (never reused, 0 = invalid)
//! - The dense slot index the store assigned at creation
//!
//! The store validates both on every access, so a handle from another store
//! of the same kind is caught, not silently aliased.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Draws the next process-wide unique handle id.
#[inline]
pub(crate) fn next_handle_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Typed, opaque identifier of an entity in a `StateStore<K>`.
///
/// `K` is the entity kind; a transform handle cannot be passed where a
/// light handle is expected.
pub struct Handle<K> {
    id: u64,
    index: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    /// The invalid sentinel. Never produced by a store.
    pub const INVALID: Self = Self {
        id: 0,
        index: u32::MAX,
        _kind: PhantomData,
    };

    #[inline]
    pub(crate) const fn new(id: u64, index: u32) -> Self {
        Self { id, index, _kind: PhantomData }
    }

    /// Returns the unique id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.id
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Checks if this is the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.id == 0
    }

    /// `Some(self)` unless this is the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn valid(self) -> Option<Self> {
        if self.is_invalid() {
            None
        } else {
            Some(self)
        }
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::INVALID
    }
}

// Manual impls: deriving would put bounds on `K`, which is only a marker.
impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.index == other.index
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.index.hash(state);
    }
}

impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            f.write_str("Handle(INVALID)")
        } else {
            write!(f, "Handle(#{}@{})", self.id, self.index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Marker;

    #[test]
    fn test_invalid_sentinel() {
        let h: Handle<Marker> = Handle::default();
        assert!(h.is_invalid());
        assert_eq!(h, Handle::INVALID);
        assert!(h.valid().is_none());
        assert_eq!(format!("{h:?}"), "Handle(INVALID)");
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<u64> = (0..1000).map(|_| next_handle_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(!ids.contains(&0));
    }

    #[test]
    fn test_equality_uses_id_and_index() {
        let a: Handle<Marker> = Handle::new(7, 0);
        let b: Handle<Marker> = Handle::new(7, 0);
        let c: Handle<Marker> = Handle::new(8, 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.valid().is_some());
    }
}
