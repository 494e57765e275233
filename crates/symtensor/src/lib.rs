//! Facade crate bundling the symtensor workspace.
//!
//! Re-exports the block-sparse tensor core and the linear-algebra
//! consumers under one roof; depend on this crate unless you need only
//! one of the pieces.

pub use symtensor_core::{
    BlockInfo, BlockRef, Core, Edge, EdgeOperation, Error, ExpandPoint, FermiSymmetry,
    MergeCombo, MergeLayout, Name, NoSymmetry, ParitySymmetry, Result, Scalar, Symmetry, Tensor,
    U1Symmetry, Z2Symmetry,
};

pub use symtensor_linalg::{
    contract, exponential, qr, svd, Cut, Error as LinalgError, FreeSide, QrResult,
    Result as LinalgResult, SvdResult,
};
