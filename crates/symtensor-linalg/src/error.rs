//! Error types for symtensor-linalg operations.

use thiserror::Error;

/// Error type for contraction and factorization.
#[derive(Debug, Error)]
pub enum Error {
    /// An error from the core edge machinery.
    #[error(transparent)]
    Core(#[from] symtensor_core::Error),

    /// A name appears on both operands of a contraction result.
    #[error("free edge `{0}` appears on both operands")]
    FreeNameClash(String),

    /// The dense SVD kernel failed.
    #[error("SVD backend error: {0}")]
    SvdBackend(#[from] mdarray_linalg::svd::SVDError),
}

/// Result type for symtensor-linalg operations.
pub type Result<T> = std::result::Result<T, Error>;
