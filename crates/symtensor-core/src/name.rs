//! Edge name contract.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait for edge name types.
///
/// A name distinguishes the edges of a tensor: it needs equality, a total
/// order (for deterministic map iteration) and hashing. Operations that
/// build intermediate tensors (contraction, SVD, QR, exponential) also need
/// to synthesize names that cannot collide with sensible user names;
/// `internal` provides those.
///
/// `String` is the default name type; custom types (interned symbols, small
/// strings) only have to implement `internal`.
pub trait Name:
    Clone + Debug + Display + PartialEq + Eq + PartialOrd + Ord + Hash + Send + Sync + 'static
{
    /// Synthesize a reserved internal name for the given tag.
    fn internal(tag: &str) -> Self;
}

impl Name for String {
    fn internal(tag: &str) -> Self {
        format!("__symtensor_{tag}")
    }
}
