//! Value object trait: equality by value, not identity.

/// Marker trait for immutable snapshots compared by value.
///
/// A resolved permission context is the canonical example: two contexts with
/// the same grants are interchangeable, and a changed grant means a new value
/// rather than a mutated one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
