//! Partial trace over pairs of dual edges.

use std::collections::BTreeSet;

use crate::core_impl::{row_major_strides, Core};
use crate::edge::{Edge, MergeLayout};
use crate::edge_operator::EdgeOperation;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

pub(crate) fn validate_dual_pair<S: Symmetry, N: Name>(
    a: &N,
    ea: &Edge<S>,
    b: &N,
    eb: &Edge<S>,
) -> Result<()> {
    if S::IS_FERMI && ea.arrow() == eb.arrow() {
        return Err(Error::PairMismatch {
            a: a.to_string(),
            b: b.to_string(),
            reason: "paired fermionic edges must have opposite arrows",
        });
    }
    if !ea.is_dual_of(eb) {
        return Err(Error::PairMismatch {
            a: a.to_string(),
            b: b.to_string(),
            reason: "paired edges must have matching segments",
        });
    }
    Ok(())
}


impl<T: Scalar, S: Symmetry, N: Name> Tensor<T, S, N> {
    /// Sum over the diagonals of the given dual edge pairs.
    ///
    /// Each pair `(a, b)` must name dual edges of this tensor; the result
    /// keeps the remaining edges in their original order. The merge parity
    /// of the traced indices is assigned to the second members, matching
    /// the sign convention of contraction.
    pub fn trace(&self, pairs: &BTreeSet<(N, N)>) -> Result<Self> {
        if pairs.is_empty() {
            return Ok(self.clone());
        }

        let row_names: Vec<N> = pairs.iter().map(|(a, _)| a.clone()).collect();
        let col_names: Vec<N> = pairs.iter().map(|(_, b)| b.clone()).collect();
        let mut traced: BTreeSet<&N> = BTreeSet::new();
        for name in row_names.iter().chain(&col_names) {
            self.axis_of(name)?;
            if !traced.insert(name) {
                return Err(Error::DuplicateName(name.to_string()));
            }
        }
        for (a, b) in pairs {
            validate_dual_pair(a, self.edge_by_name(a)?, b, self.edge_by_name(b)?)?;
        }

        let kept: Vec<N> = self
            .names()
            .iter()
            .filter(|n| !traced.contains(n))
            .cloned()
            .collect();
        let kept_rank = kept.len();

        // align pair arrows canonically (rows out, columns in) before
        // merging; the reversal parity lands on the column side
        let mut reversed_rows: Vec<N> = Vec::new();
        let mut reversed_cols: Vec<N> = Vec::new();
        if S::IS_FERMI {
            for (a, b) in pairs {
                if self.edge_by_name(a)?.arrow() {
                    reversed_rows.push(a.clone());
                    reversed_cols.push(b.clone());
                }
            }
        }
        let aligned = |name: &N, reverse: bool| -> Result<Edge<S>> {
            let edge = self.edge_by_name(name)?;
            Ok(if reverse {
                edge.negated().reversed()
            } else {
                edge.clone()
            })
        };
        let aligned_rows: Vec<Edge<S>> = row_names
            .iter()
            .map(|n| aligned(n, reversed_rows.contains(n)))
            .collect::<Result<_>>()?;
        let aligned_cols: Vec<Edge<S>> = col_names
            .iter()
            .map(|n| aligned(n, reversed_cols.contains(n)))
            .collect::<Result<_>>()?;

        let row_name = N::internal("trace_row");
        let col_name = N::internal("trace_col");
        let mut order = kept.clone();
        order.extend(row_names.iter().cloned());
        order.extend(col_names.iter().cloned());
        let matrixized = self.edge_operator(
            &EdgeOperation::new()
                .reverse(reversed_rows.iter().cloned().chain(reversed_cols.iter().cloned()))
                .merge(row_name.clone(), row_names.clone())
                .merge(col_name.clone(), col_names.clone())
                .output_order(order)
                .exclude_merge([col_name])
                .exclude_reverse_before(reversed_cols.iter().cloned()),
        )?;

        let row_arrow = aligned_rows.first().map(|e| e.arrow()).unwrap_or(false);
        let col_arrow = aligned_cols.first().map(|e| e.arrow()).unwrap_or(false);
        let row_layout = MergeLayout::new(&aligned_rows, row_arrow);
        let col_layout = MergeLayout::new(&aligned_cols, col_arrow);

        let kept_edges: Vec<Edge<S>> = matrixized.core().edges()[..kept_rank].to_vec();
        let mut out_core: Core<T, S> = Core::new(kept_edges);

        for (index, block) in matrixized.core().blocks().iter().enumerate() {
            if block.size == 0 {
                continue;
            }
            let q_row = block.charges[kept_rank];
            let q_col = block.charges[kept_rank + 1];
            let strides = row_major_strides(&block.dims);
            let data = matrixized.core().block_data(index);

            let out_index = out_core
                .find_by_charges(&block.charges[..kept_rank])
                .expect("kept charges form an allowed block");
            let out_offset = out_core.blocks()[out_index].offset;
            let kept_dims: Vec<usize> = block.dims[..kept_rank].to_vec();
            let kept_volume: usize = kept_dims.iter().product();

            for &combo_index in row_layout.combos_for(&q_row) {
                let row_combo = &row_layout.combos()[combo_index];
                let col_combo = match col_layout.combo_by_positions(&row_combo.positions) {
                    Some(combo) if combo.charge == q_col => combo,
                    _ => continue,
                };
                debug_assert_eq!(row_combo.volume, col_combo.volume);

                let mut kept_index = vec![0usize; kept_rank];
                for flat in 0..kept_volume {
                    let base: usize = kept_index
                        .iter()
                        .zip(&strides)
                        .map(|(&i, &s)| i * s)
                        .sum();
                    let mut sum = T::zero();
                    for d in 0..row_combo.volume {
                        sum = sum
                            + data[base
                                + (row_combo.offset + d) * strides[kept_rank]
                                + (col_combo.offset + d) * strides[kept_rank + 1]];
                    }
                    let storage = out_core.storage_mut();
                    storage[out_offset + flat] = storage[out_offset + flat] + sum;

                    for axis in (0..kept_rank).rev() {
                        kept_index[axis] += 1;
                        if kept_index[axis] < kept_dims[axis] {
                            break;
                        }
                        kept_index[axis] = 0;
                    }
                }
            }
        }

        Ok(Tensor::from_core(kept, out_core).expect("kept names are valid"))
    }
}
