//! In-place identity over pairs of dual edges.

use std::collections::BTreeSet;

use crate::core_impl::row_major_strides;
use crate::edge_operator::group_parity;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;
use crate::trace::validate_dual_pair;

impl<T: Scalar, S: Symmetry, N: Name> Tensor<T, S, N> {
    /// Overwrite this tensor with the identity of the given pairing.
    ///
    /// The pairs must cover every edge exactly once, and each pair must
    /// name dual edges. The result is the unit of contraction:
    /// `contract(t, id, pairs) == t` for any matching tensor.
    ///
    /// For fermionic symmetries the diagonal entries carry a sign with
    /// three factors, each cancelling one sign the contraction pipeline
    /// produces: the pair-crossing parity `(-1)^{Σ_{α<β} p_α p_β}`, one
    /// `(-1)^{p_k}` per pair whose first member points out (the unmatched
    /// half of the canonical arrow alignment), and the inversion parity
    /// between this tensor's edge order and the rows-then-columns order
    /// the pipeline merges into. The first member of each pair is the
    /// side meant to be contracted.
    pub fn identity(&mut self, pairs: &BTreeSet<(N, N)>) -> Result<&mut Self> {
        let mut covered: BTreeSet<&N> = BTreeSet::new();
        let mut pair_axes: Vec<(usize, usize)> = Vec::with_capacity(pairs.len());
        for (a, b) in pairs {
            validate_dual_pair(a, self.edge_by_name(a)?, b, self.edge_by_name(b)?)?;
            if !covered.insert(a) || !covered.insert(b) {
                return Err(Error::DuplicateName(a.to_string()));
            }
            pair_axes.push((self.axis_of(a)?, self.axis_of(b)?));
        }
        if covered.len() != self.rank() {
            return Err(Error::NameLength {
                expected: self.rank(),
                found: covered.len(),
            });
        }

        // contraction aligns its pairs canonically (its own side out, this
        // side in), reversing the pairs whose first member here points
        // out; those reversals put one (-1)^p on this tensor
        let reversal_correction: Vec<bool> = pair_axes
            .iter()
            .map(|&(ia, _)| S::IS_FERMI && !self.edge(ia).arrow())
            .collect();
        // rows-then-columns axis sequence the contraction merges into
        let canonical: Vec<usize> = pair_axes
            .iter()
            .map(|&(ia, _)| ia)
            .chain(pair_axes.iter().map(|&(_, ib)| ib))
            .collect();

        self.zero();
        let core = self.core_mut();
        for index in 0..core.blocks().len() {
            let info = core.blocks()[index].clone();
            if info.size == 0 {
                continue;
            }
            // only blocks diagonal in every pair are touched
            if pair_axes
                .iter()
                .any(|&(ia, ib)| info.positions[ia] != info.positions[ib])
            {
                continue;
            }
            let mut sign = false;
            if S::IS_FERMI {
                let parities: Vec<bool> = pair_axes
                    .iter()
                    .map(|&(ia, _)| info.charges[ia].parity())
                    .collect();
                sign ^= group_parity(parities.iter().copied());
                for (parity, corrected) in parities.iter().zip(&reversal_correction) {
                    if *parity && *corrected {
                        sign ^= true;
                    }
                }
                let axis_parity =
                    |axis: usize| -> bool { info.charges[axis].parity() };
                for v in 1..canonical.len() {
                    if !axis_parity(canonical[v]) {
                        continue;
                    }
                    for u in 0..v {
                        if canonical[u] > canonical[v] && axis_parity(canonical[u]) {
                            sign ^= true;
                        }
                    }
                }
            }
            let value = if sign { -T::one() } else { T::one() };

            let strides = row_major_strides(&info.dims);
            let pair_dims: Vec<usize> = pair_axes.iter().map(|&(ia, _)| info.dims[ia]).collect();
            let pair_strides: Vec<usize> = pair_axes
                .iter()
                .map(|&(ia, ib)| strides[ia] + strides[ib])
                .collect();
            // dual pairs have equal dimensions, so the full pair range is
            // the diagonal
            if pair_dims.iter().any(|&d| d == 0) {
                continue;
            }
            let data = core.block_data_mut(index);
            let mut diag_index = vec![0usize; pair_axes.len()];
            loop {
                let offset: usize = diag_index
                    .iter()
                    .zip(&pair_strides)
                    .map(|(&d, &s)| d * s)
                    .sum();
                data[offset] = value;
                let mut axis = pair_axes.len();
                loop {
                    if axis == 0 {
                        diag_index.clear();
                        break;
                    }
                    axis -= 1;
                    diag_index[axis] += 1;
                    if diag_index[axis] < pair_dims[axis] {
                        break;
                    }
                    diag_index[axis] = 0;
                    if axis == 0 {
                        diag_index.clear();
                        break;
                    }
                }
                if diag_index.is_empty() {
                    break;
                }
            }
        }
        Ok(self)
    }
}
