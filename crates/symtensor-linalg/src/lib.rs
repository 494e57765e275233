//! Contraction and matrix factorizations on top of `symtensor-core`.
//!
//! Every operation here follows the same recipe: use the fused edge
//! pipeline to bring the tensor into block-matrix form, run a dense kernel
//! (GEMM, thin SVD, thin QR) per symmetry block through the Faer backend
//! of `mdarray-linalg`, then split the surviving edges back.

mod backend;
mod contract;
mod error;
mod exponential;
mod qr;
mod svd;

pub use contract::contract;
pub use error::{Error, Result};
pub use exponential::exponential;
pub use qr::{qr, FreeSide, QrResult};
pub use svd::{svd, Cut, SvdResult};
