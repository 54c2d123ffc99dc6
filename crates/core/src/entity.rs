//! Entity trait: records with a stable identity (positions, employees).

/// Entity marker + minimal interface.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
