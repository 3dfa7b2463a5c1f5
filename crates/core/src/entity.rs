//! Entity trait: identity + soft-delete state.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether the entity is currently soft-deleted.
    ///
    /// Entities without a soft-delete flag are never deleted in place.
    fn is_deleted(&self) -> bool {
        false
    }
}
