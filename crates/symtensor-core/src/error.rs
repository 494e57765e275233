//! Error types for symtensor-core operations.

use thiserror::Error;

/// Error type for tensor construction and edge manipulation.
#[derive(Debug, Error)]
pub enum Error {
    /// Name list length does not match the number of edges.
    #[error("name list length {found} does not equal rank {expected}")]
    NameLength { expected: usize, found: usize },

    /// The same name appears twice in a name list.
    #[error("duplicate name `{0}` in name list")]
    DuplicateName(String),

    /// A referenced edge name does not exist.
    #[error("no edge named `{0}`")]
    NameNotFound(String),

    /// The requested output order is not a permutation of the edge names.
    #[error("output order is not a permutation of the edge names")]
    NotAPermutation,

    /// The declared sub-edges of a split do not rebuild the original edge.
    #[error("split of `{0}` does not reconstruct the original edge")]
    SplitMismatch(String),

    /// A merge group does not appear contiguously, in declared order, in the
    /// output order.
    #[error("merge group `{0}` is not contiguous in the output order")]
    MergeNotContiguous(String),

    /// Block lookup with a key that matches no block.
    #[error("no block for the requested key")]
    BlockNotFound,

    /// A charge that is not a segment of the edge.
    #[error("charge {0} is not a segment of edge `{1}`")]
    ChargeNotFound(String, String),

    /// Dense index outside the edge or segment dimension.
    #[error("index {index} out of range for dimension {dim}")]
    IndexOutOfRange { index: usize, dim: usize },

    /// Two edges that should be contractible do not pair up.
    #[error("edges `{a}` and `{b}` cannot be paired: {reason}")]
    PairMismatch {
        a: String,
        b: String,
        reason: &'static str,
    },

    /// Scalar conversion of a tensor holding more than one element.
    #[error("tensor is not scalar-like (storage length {0})")]
    NotScalarLike(usize),

    /// Charge bookkeeping of `expand`/`shrink` does not balance.
    #[error("expanded or shrunk charges do not balance")]
    UnbalancedCharge,

    /// An edge expected to be a dimension-one residual edge is not.
    #[error("edge `{0}` is not a unit residual edge")]
    NotResidualEdge(String),

    /// Text serialization failure.
    #[error("text serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary serialization failure.
    #[error("binary serialization failed: {0}")]
    Binary(#[from] bincode::Error),

    /// Serialized data that does not describe a valid tensor.
    #[error("serialized data is inconsistent: {0}")]
    CorruptData(String),
}

/// Result type for symtensor-core operations.
pub type Result<T> = std::result::Result<T, Error>;
