//! QR decomposition.

use std::collections::BTreeSet;

use num_complex::ComplexFloat;
use symtensor_core::{Core, Edge, EdgeOperation, Name, Scalar, Symmetry, Tensor};

use crate::backend::{qr_thin, KernelScalar};
use crate::error::Result;

/// Which side of the decomposition `free_names` selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeSide {
    /// The named edges stay on Q.
    Q,
    /// The named edges stay on R.
    R,
}

/// The factors of a QR decomposition, `t = q · r` with orthonormal Q
/// columns.
pub struct QrResult<T: Scalar, S: Symmetry, N: Name> {
    /// Orthonormal factor, carrying the Q-side free edges plus the bond.
    pub q: Tensor<T, S, N>,
    /// Triangular factor, the bond edge first, then the R-side free edges.
    pub r: Tensor<T, S, N>,
}

/// Decompose `t` into `q · r`.
///
/// `free_names` selects the edges of the side given by `side`; the
/// remaining edges form the other side. `common_name_q`/`common_name_r`
/// name the new bond edges, paired so that
/// `contract(q, r, {(common_name_q, common_name_r)})` rebuilds `t`.
#[allow(private_bounds)]
pub fn qr<T, S, N>(
    t: &Tensor<T, S, N>,
    side: FreeSide,
    free_names: &BTreeSet<N>,
    common_name_q: N,
    common_name_r: N,
) -> Result<QrResult<T, S, N>>
where
    T: Scalar + KernelScalar,
    <T as ComplexFloat>::Real: Into<f64>,
    S: Symmetry,
    N: Name,
{
    for name in free_names {
        t.axis_of(name)?;
    }
    let on_q = |name: &N| -> bool {
        match side {
            FreeSide::Q => free_names.contains(name),
            FreeSide::R => !free_names.contains(name),
        }
    };
    let frees_q: Vec<N> = t.names().iter().filter(|n| on_q(n)).cloned().collect();
    let frees_r: Vec<N> = t.names().iter().filter(|n| !on_q(n)).cloned().collect();

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
    let flipped_q = group_flips(&frees_q)?;
    let flipped_r = group_flips(&frees_r)?;

    let mq = N::internal("qr_q");
    let mr = N::internal("qr_r");
    let mut order: Vec<N> = Vec::with_capacity(t.rank() + 2);
    if frees_q.is_empty() {
        order.push(mq.clone());
    } else {
        order.extend(frees_q.iter().cloned());
    }
    if frees_r.is_empty() {
        order.push(mr.clone());
    } else {
        order.extend(frees_r.iter().cloned());
    }
    let matrix = t.edge_operator(
        &EdgeOperation::new()
            .merge(mq.clone(), frees_q.clone())
            .merge(mr.clone(), frees_r.clone())
            .output_order(order),
    )?;
    let mq_edge = matrix.edge(0).clone();
    let mr_edge = matrix.edge(1).clone();

    struct BlockQr<T, S> {
        charge_q: S,
        charge_r: S,
        rows: usize,
        cols: usize,
        bond: usize,
        q: Vec<T>,
        r: Vec<T>,
    }
    let mut decompositions: Vec<BlockQr<T, S>> = Vec::new();
    for (index, info) in matrix.core().blocks().iter().enumerate() {
        let rows = info.dims[0];
        let cols = info.dims[1];
        if rows == 0 || cols == 0 {
            continue;
        }
        let (q, r) = qr_thin(matrix.core().block_data(index), rows, cols);
        decompositions.push(BlockQr {
            charge_q: info.charges[0],
            charge_r: info.charges[1],
            rows,
            cols,
            bond: rows.min(cols),
            q,
            r,
        });
    }

    let bond_arrow = S::IS_FERMI;
    let mut bond_q_segments = Vec::with_capacity(decompositions.len());
    let mut bond_r_segments = Vec::with_capacity(decompositions.len());
    for block in &decompositions {
        let signed_q = mq_edge.signed_charge(block.charge_q);
        let q_bond = if bond_arrow { signed_q } else { -signed_q };
        let r_bond = if S::IS_FERMI { q_bond } else { -q_bond };
        bond_q_segments.push((q_bond, block.bond));
        bond_r_segments.push((r_bond, block.bond));
    }
    let bond_q_edge = Edge::with_arrow(bond_q_segments, bond_arrow);
    let bond_r_edge = Edge::with_arrow(bond_r_segments, false);

    let mut q_core: Core<T, S> = Core::new(vec![mq_edge.clone(), bond_q_edge.clone()]);
    let mut r_core: Core<T, S> = Core::new(vec![bond_r_edge.clone(), mr_edge.clone()]);
    for (segment, block) in decompositions.iter().enumerate() {
        let q_index = q_core
            .find_by_charges(&[block.charge_q, bond_q_edge.segments()[segment].0])
            .expect("Q block exists");
        q_core.block_data_mut(q_index)[..block.rows * block.bond].copy_from_slice(&block.q);

        let r_index = r_core
            .find_by_charges(&[bond_r_edge.segments()[segment].0, block.charge_r])
            .expect("R block exists");
        r_core.block_data_mut(r_index)[..block.bond * block.cols].copy_from_slice(&block.r);
    }

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

    let q2 = Tensor::from_core(vec![mq.clone(), common_name_q.clone()], q_core)?;
    let mut q_order = frees_q.clone();
    q_order.push(common_name_q);
    let q = q2.edge_operator(
        &EdgeOperation::new()
            .split(mq, sub_edges(&frees_q, &flipped_q)?)
            .reverse(flipped_q)
            .output_order(q_order),
    )?;

    let r2 = Tensor::from_core(vec![common_name_r.clone(), mr.clone()], r_core)?;
    let mut r_order = vec![common_name_r];
    r_order.extend(frees_r.iter().cloned());
    let r = r2.edge_operator(
        &EdgeOperation::new()
            .split(mr, sub_edges(&frees_r, &flipped_r)?)
            .reverse(flipped_r)
            .output_order(r_order),
    )?;

    Ok(QrResult { q, r })
}
