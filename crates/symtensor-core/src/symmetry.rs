//! Abelian symmetry groups for block-sparse tensors.
//!
//! A [`Symmetry`] value labels one segment of an edge. The conservation law
//! only ever needs the Abelian group operations (`+`, unary `-`, identity)
//! plus a total order used for canonical segment ordering, and two static
//! properties: whether the group is fermionic (produces signs on index
//! reordering) and its length (0 for the trivial group, i.e. a
//! non-symmetric tensor).

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{Add, Neg};

use serde::{Deserialize, Serialize};

/// Abelian group element used as a charge label.
pub trait Symmetry:
    Copy
    + Clone
    + Debug
    + Default
    + PartialEq
    + Eq
    + PartialOrd
    + Ord
    + Hash
    + Add<Output = Self>
    + Neg<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Whether charges of this group produce fermionic signs on reorder.
    const IS_FERMI: bool;

    /// Number of quantum numbers carried; 0 for the trivial group.
    const LENGTH: usize;

    /// Whether this charge is fermion-odd. Always `false` for bosonic
    /// groups.
    fn parity(&self) -> bool;

    /// The group identity.
    fn zero() -> Self {
        Self::default()
    }

    /// Whether this is the group identity.
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

macro_rules! bool_group {
    ($name:ident) => {
        impl Add for $name {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                Self(self.0 ^ other.0)
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                self
            }
        }

        impl From<bool> for $name {
            fn from(value: bool) -> Self {
                Self(value)
            }
        }
    };
}

macro_rules! int_group {
    ($name:ident) => {
        impl Add for $name {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                Self(self.0 + other.0)
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }
    };
}

/// The trivial group: a non-symmetric tensor with a single dense block.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NoSymmetry;

impl Add for NoSymmetry {
    type Output = Self;

    fn add(self, _other: Self) -> Self {
        Self
    }
}

impl Neg for NoSymmetry {
    type Output = Self;

    fn neg(self) -> Self {
        self
    }
}

impl Symmetry for NoSymmetry {
    const IS_FERMI: bool = false;
    const LENGTH: usize = 0;

    fn parity(&self) -> bool {
        false
    }
}

/// Bosonic Z2 charge (parity conservation without fermionic signs).
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Z2Symmetry(pub bool);

bool_group!(Z2Symmetry);

impl Symmetry for Z2Symmetry {
    const IS_FERMI: bool = false;
    const LENGTH: usize = 1;

    fn parity(&self) -> bool {
        false
    }
}

/// Bosonic U(1) charge (particle-number-like conservation).
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct U1Symmetry(pub i32);

int_group!(U1Symmetry);

impl Symmetry for U1Symmetry {
    const IS_FERMI: bool = false;
    const LENGTH: usize = 1;

    fn parity(&self) -> bool {
        false
    }
}

/// Fermionic Z2 charge: odd charges anticommute.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ParitySymmetry(pub bool);

bool_group!(ParitySymmetry);

impl Symmetry for ParitySymmetry {
    const IS_FERMI: bool = true;
    const LENGTH: usize = 1;

    fn parity(&self) -> bool {
        self.0
    }
}

/// Fermionic U(1) charge: odd particle numbers anticommute.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FermiSymmetry(pub i32);

int_group!(FermiSymmetry);

impl Symmetry for FermiSymmetry {
    const IS_FERMI: bool = true;
    const LENGTH: usize = 1;

    fn parity(&self) -> bool {
        self.0.rem_euclid(2) == 1
    }
}
