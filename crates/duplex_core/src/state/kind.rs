//! # Entity Kinds
//!
//! One `StateKind` per entity type ties together the four type parameters
//! of a store: static payload, dynamic payload, handle, creation config.

/// Describes one entity kind stored in a [`StateStore`](super::StateStore).
///
/// ```rust,ignore
/// struct TransformKind;
///
/// impl StateKind for TransformKind {
///     const NAME: &'static str = "transform";
///     type Static = TransformStatic;
///     type Dynamic = Transform;
///     type Config = TransformConfig;
///
///     fn split(config: TransformConfig) -> (TransformStatic, Transform) {
///         (TransformStatic { parent: config.parent }, config.local)
///     }
/// }
/// ```
pub trait StateKind: Sized + 'static {
    /// Store name used in logs and contract violations.
    const NAME: &'static str;

    /// Written once at creation, read from either thread afterwards.
    type Static: Send + Sync + 'static;

    /// Double-buffered, mutated by the simulation thread every tick.
    ///
    /// `Default` fills the pre-allocated slots, `Clone` re-syncs the back
    /// slot after a swap.
    type Dynamic: Clone + Default + Send + Sync + 'static;

    /// Creation arguments; consumed by [`StateKind::split`].
    type Config;

    /// Splits a creation config into initial static and dynamic payloads.
    fn split(config: Self::Config) -> (Self::Static, Self::Dynamic);
}
