//! Singular value decomposition with per-symmetry truncation.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use num_complex::ComplexFloat;
use symtensor_core::{Core, Edge, EdgeOperation, Name, Scalar, Symmetry, Tensor};

use crate::backend::{svd_thin, KernelScalar};
use crate::error::Result;

/// Truncation policy for [`svd`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Cut {
    /// Keep every singular value.
    #[default]
    NoCut,
    /// Keep the given number of singular values across all symmetry
    /// blocks combined, largest first; ties break toward the smaller
    /// block charge.
    Remain(usize),
    /// Keep the singular values σ with `σ ≥ r · σ_max`.
    Relative(f64),
}

/// The factors of a singular value decomposition, `t ≈ u · s · v`.
pub struct SvdResult<T: Scalar, S: Symmetry, N: Name> {
    /// Left factor, carrying the U-side free edges plus the common edge.
    pub u: Tensor<T, S, N>,
    /// Diagonal singular-value tensor with two edges of opposite arrow,
    /// aligned toward U.
    pub s: Tensor<T, S, N>,
    /// Right factor, the common edge first, then the V-side free edges.
    pub v: Tensor<T, S, N>,
}

struct BlockSvd<T, S> {
    charge_u: S,
    charge_v: S,
    rows: usize,
    cols: usize,
    u: Vec<T>,
    values: Vec<f64>,
    vt: Vec<T>,
    keep: usize,
}

/// Decompose `t` into `u · s · v` over the given edge bipartition.
///
/// `free_names_u` selects the edges of the U side (in tensor order); the
/// remaining edges form the V side. `common_name_u`/`common_name_v` name
/// the new bond edges of U and V, `singular_name_u`/`singular_name_v` the
/// edges of the diagonal tensor, paired so that
/// `contract(contract(u, s), v)` over the bonds rebuilds `t` up to the
/// truncation error.
#[allow(private_bounds)]
pub fn svd<T, S, N>(
    t: &Tensor<T, S, N>,
    free_names_u: &BTreeSet<N>,
    common_name_u: N,
    common_name_v: N,
    singular_name_u: N,
    singular_name_v: N,
    cut: Cut,
) -> Result<SvdResult<T, S, N>>
where
    T: Scalar + KernelScalar,
    <T as ComplexFloat>::Real: Into<f64>,
    S: Symmetry,
    N: Name,
{
    for name in free_names_u {
        t.axis_of(name)?;
    }
    let frees_u: Vec<N> = t
        .names()
        .iter()
        .filter(|n| free_names_u.contains(n))
        .cloned()
        .collect();
    let frees_v: Vec<N> = t
        .names()
        .iter()
        .filter(|n| !free_names_u.contains(n))
        .cloned()
        .collect();

    let group_flips = |frees: &[N]| -> Result<Vec<N>> {
        if !S::IS_FERMI || frees.is_empty() {
            return Ok(vec![]);
        }
        let target = t.edge_by_name(&frees[0])?.arrow();
        let mut flips = Vec::new();
        for name in &frees[1..] {
            if t.edge_by_name(name)?.arrow() != target {
                flips.push(name.clone());
            }
        }
        Ok(flips)
    };
    let flipped_u = group_flips(&frees_u)?;
    let flipped_v = group_flips(&frees_v)?;

    let mu = N::internal("svd_u");
    let mv = N::internal("svd_v");
    let mut order: Vec<N> = Vec::with_capacity(t.rank() + 2);
    if frees_u.is_empty() {
        order.push(mu.clone());
    } else {
        order.extend(frees_u.iter().cloned());
    }
    if frees_v.is_empty() {
        order.push(mv.clone());
    } else {
        order.extend(frees_v.iter().cloned());
    }
    let matrix = t.edge_operator(
        &EdgeOperation::new()
            .merge(mu.clone(), frees_u.clone())
            .merge(mv.clone(), frees_v.clone())
            .output_order(order),
    )?;
    let mu_edge = matrix.edge(0).clone();
    let mv_edge = matrix.edge(1).clone();

    // thin SVD per block
    let mut decompositions: Vec<BlockSvd<T, S>> = Vec::new();
    for (index, info) in matrix.core().blocks().iter().enumerate() {
        let rows = info.dims[0];
        let cols = info.dims[1];
        if rows == 0 || cols == 0 {
            continue;
        }
        let (u, values, vt) = svd_thin(matrix.core().block_data(index), rows, cols)?;
        decompositions.push(BlockSvd {
            charge_u: info.charges[0],
            charge_v: info.charges[1],
            rows,
            cols,
            u,
            values,
            vt,
            keep: 0,
        });
    }

    // truncation across all blocks combined
    match cut {
        Cut::NoCut => {
            for block in &mut decompositions {
                block.keep = block.values.len();
            }
        }
        Cut::Relative(ratio) => {
            let max = decompositions
                .iter()
                .flat_map(|b| b.values.iter().copied())
                .fold(0.0, f64::max);
            let threshold = ratio * max;
            for block in &mut decompositions {
                block.keep = block.values.iter().take_while(|&&v| v >= threshold).count();
            }
        }
        Cut::Remain(remain) => {
            let mut candidates: Vec<(f64, S, usize, usize)> = decompositions
                .iter()
                .enumerate()
                .flat_map(|(b, block)| {
                    block
                        .values
                        .iter()
                        .enumerate()
                        .map(move |(i, &v)| (v, block.charge_u, b, i))
                })
                .collect();
            candidates.sort_by(|lhs, rhs| {
                rhs.0
                    .partial_cmp(&lhs.0)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| lhs.1.cmp(&rhs.1))
                    .then_with(|| lhs.3.cmp(&rhs.3))
            });
            for &(_, _, block, _) in candidates.iter().take(remain) {
                decompositions[block].keep += 1;
            }
        }
    }
    decompositions.retain(|block| block.keep > 0);

    // bond edges; segment order follows the block order of the matrix
    let bond_u_arrow = S::IS_FERMI;
    let mut bond_u_segments = Vec::with_capacity(decompositions.len());
    let mut sing_u_segments = Vec::with_capacity(decompositions.len());
    let mut sing_v_segments = Vec::with_capacity(decompositions.len());
    let mut bond_v_segments = Vec::with_capacity(decompositions.len());
    for block in &decompositions {
        let signed_u = mu_edge.signed_charge(block.charge_u);
        let q_bond_u = if bond_u_arrow { signed_u } else { -signed_u };
        let q_sing_u = if S::IS_FERMI { q_bond_u } else { -q_bond_u };
        let q_sing_v = if S::IS_FERMI { q_sing_u } else { -q_sing_u };
        let q_bond_v = if S::IS_FERMI { q_sing_v } else { -q_sing_v };
        bond_u_segments.push((q_bond_u, block.keep));
        sing_u_segments.push((q_sing_u, block.keep));
        sing_v_segments.push((q_sing_v, block.keep));
        bond_v_segments.push((q_bond_v, block.keep));
    }
    let bond_u_edge = Edge::with_arrow(bond_u_segments, bond_u_arrow);
    let sing_u_edge = Edge::with_arrow(sing_u_segments, false);
    let sing_v_edge = Edge::with_arrow(sing_v_segments, S::IS_FERMI);
    let bond_v_edge = Edge::with_arrow(bond_v_segments, false);

    // repack U, S, V
    let mut u_core: Core<T, S> = Core::new(vec![mu_edge.clone(), bond_u_edge.clone()]);
    let mut s_core: Core<T, S> = Core::new(vec![sing_u_edge.clone(), sing_v_edge.clone()]);
    let mut v_core: Core<T, S> = Core::new(vec![bond_v_edge.clone(), mv_edge.clone()]);
    for (segment, block) in decompositions.iter().enumerate() {
        let keep = block.keep;
        let k = block.values.len();

        let u_index = u_core
            .find_by_charges(&[block.charge_u, bond_u_edge.segments()[segment].0])
            .expect("U block exists");
        let u_data = u_core.block_data_mut(u_index);
        for row in 0..block.rows {
            u_data[row * keep..(row + 1) * keep]
                .copy_from_slice(&block.u[row * k..row * k + keep]);
        }

        let s_index = s_core
            .find_by_charges(&[
                sing_u_edge.segments()[segment].0,
                sing_v_edge.segments()[segment].0,
            ])
            .expect("S block exists");
        let s_data = s_core.block_data_mut(s_index);
        for (i, &value) in block.values.iter().take(keep).enumerate() {
            s_data[i * keep + i] = T::from_f64(value);
        }

        let v_index = v_core
            .find_by_charges(&[bond_v_edge.segments()[segment].0, block.charge_v])
            .expect("V block exists");
        v_core.block_data_mut(v_index)[..keep * block.cols]
            .copy_from_slice(&block.vt[..keep * block.cols]);
    }

    // split the merged sides back, restoring flipped arrows
    let sub_edges = |frees: &[N], flips: &[N]| -> Result<Vec<(N, Vec<(S, usize)>)>> {
        frees
            .iter()
            .map(|name| {
                let edge = t.edge_by_name(name)?;
                let edge = if flips.contains(name) {
                    edge.negated().reversed()
                } else {
                    edge.clone()
                };
                Ok((name.clone(), edge.segments().to_vec()))
            })
            .collect()
    };

    let u2 = Tensor::from_core(vec![mu.clone(), common_name_u.clone()], u_core)?;
    let mut u_order = frees_u.clone();
    u_order.push(common_name_u);
    let u = u2.edge_operator(
        &EdgeOperation::new()
            .split(mu, sub_edges(&frees_u, &flipped_u)?)
            .reverse(flipped_u)
            .output_order(u_order),
    )?;

    let s = Tensor::from_core(vec![singular_name_u, singular_name_v], s_core)?;

    let v2 = Tensor::from_core(vec![common_name_v.clone(), mv.clone()], v_core)?;
    let mut v_order = vec![common_name_v];
    v_order.extend(frees_v.iter().cloned());
    let v = v2.edge_operator(
        &EdgeOperation::new()
            .split(mv, sub_edges(&frees_v, &flipped_v)?)
            .reverse(flipped_v)
            .output_order(v_order),
    )?;

    Ok(SvdResult { u, s, v })
}
