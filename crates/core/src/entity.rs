//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Profiles, institutions and audit entries are owned by external collaborators;
/// the core only needs to know how to identify them.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
