//! Tensor edges: charge-labelled segments plus a fermionic arrow.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symmetry::Symmetry;

/// One tensor index.
///
/// An edge is an ordered sequence of `(charge, dimension)` segments with
/// distinct charges, plus an arrow that is meaningful only for fermionic
/// symmetries. The segment order is fixed at construction and is part of
/// the tensor's identity: blocks are stored in lexicographic order of
/// segment positions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge<S: Symmetry> {
    segments: Vec<(S, usize)>,
    arrow: bool,
}

impl<S: Symmetry> Edge<S> {
    /// Create an edge from segments, with the arrow pointing out.
    pub fn new(segments: Vec<(S, usize)>) -> Self {
        Self::with_arrow(segments, false)
    }

    /// Create an edge from segments and an explicit arrow.
    pub fn with_arrow(segments: Vec<(S, usize)>, arrow: bool) -> Self {
        debug_assert!(
            {
                let mut charges: Vec<_> = segments.iter().map(|(q, _)| *q).collect();
                charges.sort();
                charges.windows(2).all(|w| w[0] != w[1])
            },
            "edge segments must have distinct charges"
        );
        Self { segments, arrow }
    }

    /// The unit edge: a single zero-charge segment of dimension one.
    ///
    /// Merging zero edges produces this edge, and splitting it into zero
    /// sub-edges drops it.
    pub fn unit() -> Self {
        Self::with_arrow(vec![(S::zero(), 1)], false)
    }

    /// A zero-charge edge of the given total dimension.
    pub fn trivial(dim: usize) -> Self {
        Self::new(vec![(S::zero(), dim)])
    }

    /// The arrow. `false` for every non-fermionic edge.
    pub fn arrow(&self) -> bool {
        self.arrow
    }

    /// The segments in construction order.
    pub fn segments(&self) -> &[(S, usize)] {
        &self.segments
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total dimension, summed over segments.
    pub fn total_dim(&self) -> usize {
        self.segments.iter().map(|(_, d)| d).sum()
    }

    /// The position of a charge within the segment list.
    pub fn position_of(&self, charge: &S) -> Option<usize> {
        self.segments.iter().position(|(q, _)| q == charge)
    }

    /// The dimension of the segment carrying `charge`.
    pub fn dim_of(&self, charge: &S) -> Option<usize> {
        self.segments
            .iter()
            .find(|(q, _)| q == charge)
            .map(|(_, d)| *d)
    }

    /// Dense offset of the start of the segment at `position`.
    pub fn segment_offset(&self, position: usize) -> usize {
        self.segments[..position].iter().map(|(_, d)| d).sum()
    }

    /// Map a dense offset in `[0, total_dim)` to `(charge, offset within
    /// the segment)`.
    pub fn index_to_point(&self, index: usize) -> Option<(S, usize)> {
        let mut rest = index;
        for (q, d) in &self.segments {
            if rest < *d {
                return Some((*q, rest));
            }
            rest -= d;
        }
        None
    }

    /// Map `(charge, offset within the segment)` back to a dense offset.
    pub fn point_to_index(&self, charge: &S, offset: usize) -> Option<usize> {
        let position = self.position_of(charge)?;
        if offset >= self.segments[position].1 {
            return None;
        }
        Some(self.segment_offset(position) + offset)
    }

    /// The same edge with the arrow flipped; segments untouched.
    pub fn reversed(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            arrow: !self.arrow,
        }
    }

    /// The same edge with every segment charge negated; arrow untouched.
    pub fn negated(&self) -> Self {
        Self {
            segments: self.segments.iter().map(|(q, d)| (-*q, *d)).collect(),
            arrow: self.arrow,
        }
    }

    /// The edge this edge contracts with: fermionic edges keep their
    /// charges and flip the arrow, non-fermionic edges negate their
    /// charges. This is also the edge map of tensor conjugation.
    pub fn dual(&self) -> Self {
        if S::IS_FERMI {
            self.reversed()
        } else {
            self.negated()
        }
    }

    /// Whether `other` is the contraction partner of this edge.
    pub fn is_dual_of(&self, other: &Self) -> bool {
        if S::IS_FERMI {
            self.arrow != other.arrow && self.segments == other.segments
        } else {
            self.segments.len() == other.segments.len()
                && self
                    .segments
                    .iter()
                    .zip(&other.segments)
                    .all(|((qa, da), (qb, db))| -*qa == *qb && da == db)
        }
    }

    /// The charge as it enters the conservation sum: negated on arrowed
    /// edges.
    pub fn signed_charge(&self, charge: S) -> S {
        if self.arrow {
            -charge
        } else {
            charge
        }
    }

    /// Whether both edges carry the same charge → dimension multiset.
    pub fn same_charge_dims(&self, other: &Self) -> bool {
        let lhs: BTreeMap<S, usize> = self.segments.iter().copied().collect();
        let rhs: BTreeMap<S, usize> = other.segments.iter().copied().collect();
        lhs == rhs
    }

    /// Canonical merge of a list of edges.
    ///
    /// The merged edge carries every charge sum with the combined
    /// dimension, segments ordered by charge; the arrow is taken from the
    /// first constituent. Associative up to the canonical reordering.
    pub fn merged(parts: &[Edge<S>]) -> Edge<S> {
        let arrow = parts.first().map(|e| e.arrow()).unwrap_or(false);
        MergeLayout::new(parts, arrow).merged().clone()
    }
}

impl From<usize> for Edge<crate::symmetry::NoSymmetry> {
    fn from(dim: usize) -> Self {
        Edge::trivial(dim)
    }
}

impl<S: Symmetry> fmt::Display for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if S::IS_FERMI {
            write!(f, "{}", if self.arrow { "<" } else { ">" })?;
        }
        write!(f, "{{")?;
        for (i, (q, d)) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{q:?}: {d}")?;
        }
        write!(f, "}}")
    }
}

/// One combination of segment positions across the edges of a merge group.
#[derive(Clone, Debug)]
pub struct MergeCombo<S: Symmetry> {
    /// Segment position per constituent edge.
    pub positions: Vec<usize>,
    /// Segment charge per constituent edge.
    pub charges: Vec<S>,
    /// Segment dimension per constituent edge.
    pub dims: Vec<usize>,
    /// Sum of the constituent charges.
    pub charge: S,
    /// Product of the constituent dimensions.
    pub volume: usize,
    /// Dense offset of this combination's slab within the merged segment
    /// of `charge`.
    pub offset: usize,
}

/// Dense layout of a merged edge.
///
/// Enumerates every combination of constituent segments in odometer order
/// (last edge fastest) and records, per combination, the slab it occupies
/// inside the merged edge. Splitting is the same table read backwards, so
/// merge followed by split is bit-identical.
#[derive(Clone, Debug)]
pub struct MergeLayout<S: Symmetry> {
    merged: Edge<S>,
    combos: Vec<MergeCombo<S>>,
    by_charge: BTreeMap<S, Vec<usize>>,
    seg_counts: Vec<usize>,
}

impl<S: Symmetry> MergeLayout<S> {
    /// Build the layout of merging `parts` into one edge with the given
    /// arrow.
    ///
    /// For fermionic symmetries the constituents are expected to agree with
    /// the target arrow already; the edge pipeline aligns them first.
    pub fn new(parts: &[Edge<S>], arrow: bool) -> Self {
        debug_assert!(
            !S::IS_FERMI || parts.iter().all(|e| e.arrow() == arrow),
            "merge constituents must agree with the target arrow"
        );

        let seg_counts: Vec<usize> = parts.iter().map(|e| e.segment_count()).collect();
        let mut combos = Vec::new();
        let mut dims_so_far: BTreeMap<S, usize> = BTreeMap::new();
        let mut by_charge: BTreeMap<S, Vec<usize>> = BTreeMap::new();

        if seg_counts.iter().all(|&c| c > 0) {
            let mut positions = vec![0usize; parts.len()];
            loop {
                let charges: Vec<S> = parts
                    .iter()
                    .zip(&positions)
                    .map(|(e, &p)| e.segments()[p].0)
                    .collect();
                let dims: Vec<usize> = parts
                    .iter()
                    .zip(&positions)
                    .map(|(e, &p)| e.segments()[p].1)
                    .collect();
                let charge = charges
                    .iter()
                    .fold(S::zero(), |acc, q| acc + *q);
                let volume: usize = dims.iter().product();
                let offset = *dims_so_far.get(&charge).unwrap_or(&0);
                *dims_so_far.entry(charge).or_insert(0) += volume;
                by_charge.entry(charge).or_default().push(combos.len());
                combos.push(MergeCombo {
                    positions: positions.clone(),
                    charges,
                    dims,
                    charge,
                    volume,
                    offset,
                });

                // odometer increment, last edge fastest
                let mut axis = parts.len();
                loop {
                    if axis == 0 {
                        break;
                    }
                    axis -= 1;
                    positions[axis] += 1;
                    if positions[axis] < seg_counts[axis] {
                        break;
                    }
                    positions[axis] = 0;
                    if axis == 0 {
                        // wrapped around completely
                        positions.clear();
                        break;
                    }
                }
                if positions.is_empty() {
                    break;
                }
            }
        }

        let merged = Edge::with_arrow(
            dims_so_far.iter().map(|(&q, &d)| (q, d)).collect(),
            arrow,
        );
        Self {
            merged,
            combos,
            by_charge,
            seg_counts,
        }
    }

    /// The merged edge, segments in canonical (charge-ascending) order.
    pub fn merged(&self) -> &Edge<S> {
        &self.merged
    }

    /// All combinations in odometer order.
    pub fn combos(&self) -> &[MergeCombo<S>] {
        &self.combos
    }

    /// Indices of the combinations whose charges sum to `charge`.
    pub fn combos_for(&self, charge: &S) -> &[usize] {
        self.by_charge
            .get(charge)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Look up a combination by its per-edge segment positions.
    pub fn combo_by_positions(&self, positions: &[usize]) -> Option<&MergeCombo<S>> {
        debug_assert_eq!(positions.len(), self.seg_counts.len());
        let mut index = 0usize;
        for (p, c) in positions.iter().zip(&self.seg_counts) {
            if p >= c {
                return None;
            }
            index = index * c + p;
        }
        self.combos.get(index)
    }
}
