//! Core: flat scalar storage plus the block table of a symmetric tensor.

use crate::edge::Edge;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;

/// Location and shape of one symmetry block inside the flat storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo<S: Symmetry> {
    /// Segment position per edge.
    pub positions: Vec<usize>,
    /// Segment charge per edge.
    pub charges: Vec<S>,
    /// Dense shape, row-major.
    pub dims: Vec<usize>,
    /// Offset of the first element inside the flat storage.
    pub offset: usize,
    /// Number of elements (product of `dims`).
    pub size: usize,
}

/// Storage and block structure of a tensor, without edge names.
///
/// Blocks are laid out back-to-back in lexicographic order of segment
/// positions; every conservation-allowed charge tuple has exactly one
/// block, including zero-volume ones. Cores are shared between tensors via
/// reference counting and cloned on write.
#[derive(Clone, Debug, PartialEq)]
pub struct Core<T, S: Symmetry> {
    edges: Vec<Edge<S>>,
    blocks: Vec<BlockInfo<S>>,
    storage: Vec<T>,
}

impl<T: Scalar, S: Symmetry> Core<T, S> {
    /// Build a zero-filled core for the given edges.
    ///
    /// Enumerates the Cartesian product of segment positions, keeps the
    /// tuples whose signed charges sum to the identity, and assigns
    /// offsets in enumeration order. A rank-0 core has a single block of
    /// volume one.
    pub fn new(edges: Vec<Edge<S>>) -> Self {
        let (blocks, total) = enumerate_blocks(&edges);
        Self {
            edges,
            blocks,
            storage: vec![T::zero(); total],
        }
    }

    /// Rebuild a core from parts, trusting that `storage` matches the
    /// block table of `edges`. Returns `None` on a length mismatch.
    pub fn from_parts(edges: Vec<Edge<S>>, storage: Vec<T>) -> Option<Self> {
        let (blocks, total) = enumerate_blocks(&edges);
        if total != storage.len() {
            return None;
        }
        Some(Self {
            edges,
            blocks,
            storage,
        })
    }

    /// Number of edges.
    pub fn rank(&self) -> usize {
        self.edges.len()
    }

    /// The edges.
    pub fn edges(&self) -> &[Edge<S>] {
        &self.edges
    }

    /// The block table, in storage order.
    pub fn blocks(&self) -> &[BlockInfo<S>] {
        &self.blocks
    }

    /// The flat storage.
    pub fn storage(&self) -> &[T] {
        &self.storage
    }

    /// Mutable access to the flat storage.
    pub fn storage_mut(&mut self) -> &mut [T] {
        &mut self.storage
    }

    /// Find a block by segment positions. O(log blocks).
    pub fn find_by_positions(&self, positions: &[usize]) -> Option<usize> {
        if positions.len() != self.rank() {
            return None;
        }
        self.blocks
            .binary_search_by(|b| b.positions.as_slice().cmp(positions))
            .ok()
    }

    /// Find a block by segment charges. O(rank · segments + log blocks).
    pub fn find_by_charges(&self, charges: &[S]) -> Option<usize> {
        if charges.len() != self.rank() {
            return None;
        }
        let positions: Option<Vec<usize>> = self
            .edges
            .iter()
            .zip(charges)
            .map(|(e, q)| e.position_of(q))
            .collect();
        self.find_by_positions(&positions?)
    }

    /// The data slice of block `index`.
    pub fn block_data(&self, index: usize) -> &[T] {
        let b = &self.blocks[index];
        &self.storage[b.offset..b.offset + b.size]
    }

    /// The mutable data slice of block `index`.
    pub fn block_data_mut(&mut self, index: usize) -> &mut [T] {
        let b = &self.blocks[index];
        &mut self.storage[b.offset..b.offset + b.size]
    }
}

fn enumerate_blocks<S: Symmetry>(edges: &[Edge<S>]) -> (Vec<BlockInfo<S>>, usize) {
    let rank = edges.len();
    let seg_counts: Vec<usize> = edges.iter().map(|e| e.segment_count()).collect();
    let mut blocks = Vec::new();
    let mut offset = 0usize;

    if seg_counts.iter().any(|&c| c == 0) {
        return (blocks, 0);
    }

    let mut positions = vec![0usize; rank];
    loop {
        let charges: Vec<S> = edges
            .iter()
            .zip(&positions)
            .map(|(e, &p)| e.segments()[p].0)
            .collect();
        let conserved = edges
            .iter()
            .zip(&charges)
            .fold(S::zero(), |acc, (e, &q)| acc + e.signed_charge(q));
        if conserved.is_zero() {
            let dims: Vec<usize> = edges
                .iter()
                .zip(&positions)
                .map(|(e, &p)| e.segments()[p].1)
                .collect();
            let size: usize = dims.iter().product();
            blocks.push(BlockInfo {
                positions: positions.clone(),
                charges,
                dims,
                offset,
                size,
            });
            offset += size;
        }

        let mut axis = rank;
        loop {
            if axis == 0 {
                positions.clear();
                break;
            }
            axis -= 1;
            positions[axis] += 1;
            if positions[axis] < seg_counts[axis] {
                break;
            }
            positions[axis] = 0;
            if axis == 0 {
                positions.clear();
                break;
            }
        }
        if positions.is_empty() && rank > 0 {
            break;
        }
        if rank == 0 {
            break;
        }
    }

    (blocks, offset)
}

/// Row-major strides for a dense shape.
pub(crate) fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for axis in (0..dims.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * dims[axis + 1];
    }
    strides
}
