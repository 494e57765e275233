//! Block-sparse tensors with Abelian symmetries.
//!
//! This crate provides the core of `symtensor`: multi-index arrays whose
//! indices ("edges") carry group-theoretic charge labels, storing only the
//! dense blocks allowed by a conservation law. Fermionic symmetries
//! additionally carry an arrow per edge and produce sign factors under
//! index reordering.
//!
//! # Core Types
//!
//! - [`Symmetry`]: Abelian group element trait, with the built-in groups
//!   [`NoSymmetry`], [`Z2Symmetry`], [`U1Symmetry`], [`ParitySymmetry`] and
//!   [`FermiSymmetry`]
//! - [`Edge`]: one tensor index, an ordered list of `(charge, dimension)`
//!   segments plus an arrow for fermionic symmetries
//! - [`Core`]: flat scalar storage plus the sorted block table
//! - [`Tensor`]: edge names tied to a copy-on-write [`Core`]
//! - [`EdgeOperation`]: declarative description of the fused
//!   rename/split/reverse/transpose/merge pipeline
//!
//! Reshaping never materialises intermediate tensors: for every output
//! block the pipeline computes the contributing source slabs, the index
//! permutation and the fermionic sign, then dispatches one permuted copy
//! per contribution.
//!
//! # Example
//!
//! ```
//! use symtensor_core::{Edge, Tensor, Z2Symmetry};
//!
//! let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
//!     vec!["left".to_string(), "right".to_string()],
//!     vec![
//!         Edge::new(vec![(Z2Symmetry(false), 2), (Z2Symmetry(true), 2)]),
//!         Edge::new(vec![(Z2Symmetry(false), 2), (Z2Symmetry(true), 2)]),
//!     ],
//! )
//! .unwrap();
//! t.range(0.0, 1.0);
//!
//! let u = t.transpose(&["right".to_string(), "left".to_string()]).unwrap();
//! assert_eq!(u.names()[0], "right");
//! ```

mod core_impl;
mod edge;
mod edge_operator;
mod error;
mod expand;
mod identity;
mod io;
mod name;
mod norm;
mod scalar;
mod symmetry;
mod tensor;
mod trace;

pub use core_impl::{BlockInfo, Core};
pub use edge::{Edge, MergeCombo, MergeLayout};
pub use edge_operator::EdgeOperation;
pub use error::{Error, Result};
pub use expand::ExpandPoint;
pub use name::Name;
pub use scalar::Scalar;
pub use symmetry::{FermiSymmetry, NoSymmetry, ParitySymmetry, Symmetry, U1Symmetry, Z2Symmetry};
pub use tensor::{BlockRef, Tensor};
