//! Pairwise tensor contraction.
//!
//! Both operands are brought to block-matrix form with the fused edge
//! pipeline (surviving edges of the first operand merged in front of its
//! contracted edges, the second operand the other way round), then one
//! GEMM runs per common symmetry block and the surviving edges are split
//! back. The merge and reversal parity of the contracted indices is
//! assigned to the second operand.

use std::collections::BTreeSet;

use num_complex::ComplexFloat;
use symtensor_core::{Core, EdgeOperation, Name, Scalar, Symmetry, Tensor};

use crate::backend::{gemm, KernelScalar};
use crate::error::{Error, Result};

/// Contract `a` and `b` over the given `(name in a, name in b)` pairs.
///
/// Paired edges must be dual: identical segments with opposite arrows for
/// fermionic symmetries, negated segments otherwise. The result carries
/// the surviving edges of `a` (in order) followed by those of `b`; an
/// empty pair set is the outer product.
#[allow(private_bounds)]
pub fn contract<T, S, N>(
    a: &Tensor<T, S, N>,
    b: &Tensor<T, S, N>,
    pairs: &BTreeSet<(N, N)>,
) -> Result<Tensor<T, S, N>>
where
    T: Scalar + KernelScalar,
    <T as ComplexFloat>::Real: Into<f64>,
    S: Symmetry,
    N: Name,
{
    let contracted_a: Vec<N> = pairs.iter().map(|(x, _)| x.clone()).collect();
    let contracted_b: Vec<N> = pairs.iter().map(|(_, y)| y.clone()).collect();
    for (x, y) in pairs {
        let ea = a.edge_by_name(x)?;
        let eb = b.edge_by_name(y)?;
        if S::IS_FERMI && ea.arrow() == eb.arrow() {
            return Err(symtensor_core::Error::PairMismatch {
                a: x.to_string(),
                b: y.to_string(),
                reason: "contracted fermionic edges must have opposite arrows",
            }
            .into());
        }
        if !ea.is_dual_of(eb) {
            return Err(symtensor_core::Error::PairMismatch {
                a: x.to_string(),
                b: y.to_string(),
                reason: "contracted edges must have matching segments",
            }
            .into());
        }
    }

    let free_a: Vec<N> = a
        .names()
        .iter()
        .filter(|n| !contracted_a.contains(n))
        .cloned()
        .collect();
    let free_b: Vec<N> = b
        .names()
        .iter()
        .filter(|n| !contracted_b.contains(n))
        .cloned()
        .collect();
    for name in &free_a {
        if free_b.contains(name) {
            return Err(Error::FreeNameClash(name.to_string()));
        }
    }

    let fa = N::internal("contract_free_a");
    let ca = N::internal("contract_a");
    let cb = N::internal("contract_b");
    let fb = N::internal("contract_free_b");

    // arrows inside each merge group align to the first member; remember
    // which free edges flip so the final split can restore them
    let free_flips = |t: &Tensor<T, S, N>, frees: &[N]| -> Result<Vec<N>> {
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
    let flipped_a = free_flips(a, &free_a)?;
    let flipped_b = free_flips(b, &free_b)?;

    // align contracted arrows canonically (a-side out, b-side in) before
    // merging, so the alignment signs do not depend on the pair order;
    // the reversal parity lands on b
    let mut reversed_a: Vec<N> = Vec::new();
    let mut reversed_b: Vec<N> = Vec::new();
    if S::IS_FERMI {
        for (x, y) in pairs {
            if a.edge_by_name(x)?.arrow() {
                reversed_a.push(x.clone());
                reversed_b.push(y.clone());
            }
        }
    }

    let mut order_a: Vec<N> = Vec::with_capacity(a.rank() + 1);
    if free_a.is_empty() {
        order_a.push(fa.clone());
    } else {
        order_a.extend(free_a.iter().cloned());
    }
    if contracted_a.is_empty() {
        order_a.push(ca.clone());
    } else {
        order_a.extend(contracted_a.iter().cloned());
    }
    let a2 = a.edge_operator(
        &EdgeOperation::new()
            .reverse(reversed_a)
            .merge(fa.clone(), free_a.clone())
            .merge(ca.clone(), contracted_a.clone())
            .output_order(order_a),
    )?;

    let mut order_b: Vec<N> = Vec::with_capacity(b.rank() + 1);
    if contracted_b.is_empty() {
        order_b.push(cb.clone());
    } else {
        order_b.extend(contracted_b.iter().cloned());
    }
    if free_b.is_empty() {
        order_b.push(fb.clone());
    } else {
        order_b.extend(free_b.iter().cloned());
    }
    let b2 = b.edge_operator(
        &EdgeOperation::new()
            .reverse(reversed_b)
            .merge(cb.clone(), contracted_b.clone())
            .merge(fb.clone(), free_b.clone())
            .output_order(order_b)
            .with_parity(true),
    )?;

    // block GEMM: the contracted charge is determined by the free charge
    let fa_edge = a2.edge(0).clone();
    let ca_edge = a2.edge(1).clone();
    let fb_edge = b2.edge(1).clone();
    let mut out_core: Core<T, S> = Core::new(vec![fa_edge.clone(), fb_edge.clone()]);
    for out_index in 0..out_core.blocks().len() {
        let (qf_a, qf_b, offset, size) = {
            let info = &out_core.blocks()[out_index];
            (info.charges[0], info.charges[1], info.offset, info.size)
        };
        if size == 0 {
            continue;
        }
        // solve  signed(fa, qf_a) + signed(ca, qc) = 0  for qc
        let need = -fa_edge.signed_charge(qf_a);
        let qc = if ca_edge.arrow() { -need } else { need };
        let qc_b = if S::IS_FERMI { qc } else { -qc };

        let a_block = match a2.block_by_charges(&[qf_a, qc]) {
            Ok(block) => block,
            Err(_) => continue, // no matching contracted charge: stays zero
        };
        let b_block = match b2.block_by_charges(&[qc_b, qf_b]) {
            Ok(block) => block,
            Err(_) => continue,
        };
        let m = a_block.dims[0];
        let k = a_block.dims[1];
        let n = b_block.dims[1];
        if m == 0 || k == 0 || n == 0 {
            continue;
        }
        debug_assert_eq!(k, b_block.dims[0]);
        let product = gemm(a_block.data, b_block.data, m, k, n);
        out_core.storage_mut()[offset..offset + size].copy_from_slice(&product);
    }
    let c2 = Tensor::from_core(vec![fa.clone(), fb.clone()], out_core)?;

    // split the surviving edges back and restore their arrows
    let sub_edges = |t: &Tensor<T, S, N>,
                     frees: &[N],
                     flips: &[N]|
     -> Result<Vec<(N, Vec<(S, usize)>)>> {
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
    let mut final_order: Vec<N> = free_a.clone();
    final_order.extend(free_b.iter().cloned());
    let mut restore: Vec<N> = flipped_a.clone();
    restore.extend(flipped_b.iter().cloned());
    let result = c2.edge_operator(
        &EdgeOperation::new()
            .split(fa.clone(), sub_edges(a, &free_a, &flipped_a)?)
            .split(fb.clone(), sub_edges(b, &free_b, &flipped_b)?)
            .reverse(restore)
            .output_order(final_order)
            .exclude_split([fb])
            .exclude_reverse_before(flipped_b),
    )?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use symtensor_core::NoSymmetry;

    #[test]
    fn dense_matrix_product() {
        let mut a: Tensor<f64, NoSymmetry> = Tensor::new(
            vec!["i".to_string(), "k".to_string()],
            vec![2.into(), 3.into()],
        )
        .unwrap();
        a.range(0.0, 1.0);
        let mut b: Tensor<f64, NoSymmetry> = Tensor::new(
            vec!["k".to_string(), "j".to_string()],
            vec![3.into(), 2.into()],
        )
        .unwrap();
        b.range(0.0, 1.0);

        let pairs: BTreeSet<(String, String)> =
            [("k".to_string(), "k".to_string())].into_iter().collect();
        let c = contract(&a, &b, &pairs).unwrap();
        assert_eq!(c.names(), &["i".to_string(), "j".to_string()][..]);
        assert_eq!(c.storage(), &[10.0, 13.0, 28.0, 40.0]);
    }
}
