//! Matrix exponential of a tensor viewed as an operator.

use std::collections::BTreeSet;

use num_complex::ComplexFloat;
use symtensor_core::{Core, EdgeOperation, Error as CoreError, Name, Scalar, Symmetry, Tensor};

use crate::backend::{gemm, KernelScalar};
use crate::error::Result;

/// `exp(t)` with `t` viewed as a matrix over the given `(row, col)` pairs.
///
/// The pairs must cover every edge; each pair must name dual edges so
/// that powers of `t` contract. Computed per symmetry block by scaling
/// and squaring with a Taylor polynomial of degree `steps`. The merge
/// parity is assigned to the column side, which makes the blockwise
/// matrix power agree with the contraction power.
#[allow(private_bounds)]
pub fn exponential<T, S, N>(
    t: &Tensor<T, S, N>,
    pairs: &BTreeSet<(N, N)>,
    steps: usize,
) -> Result<Tensor<T, S, N>>
where
    T: Scalar + KernelScalar,
    <T as ComplexFloat>::Real: Into<f64>,
    S: Symmetry,
    N: Name,
{
    let row_names: Vec<N> = pairs.iter().map(|(a, _)| a.clone()).collect();
    let col_names: Vec<N> = pairs.iter().map(|(_, b)| b.clone()).collect();
    let mut covered: BTreeSet<&N> = BTreeSet::new();
    for name in row_names.iter().chain(&col_names) {
        t.axis_of(name)?;
        if !covered.insert(name) {
            return Err(CoreError::DuplicateName(name.to_string()).into());
        }
    }
    if covered.len() != t.rank() {
        return Err(CoreError::NameLength {
            expected: t.rank(),
            found: covered.len(),
        }
        .into());
    }
    for (a, b) in pairs {
        let ea = t.edge_by_name(a)?;
        let eb = t.edge_by_name(b)?;
        if (S::IS_FERMI && ea.arrow() == eb.arrow()) || !ea.is_dual_of(eb) {
            return Err(CoreError::PairMismatch {
                a: a.to_string(),
                b: b.to_string(),
                reason: "exponential pairs must name dual edges",
            }
            .into());
        }
    }

    let group_flips = |names: &[N]| -> Result<Vec<N>> {
        if !S::IS_FERMI || names.is_empty() {
            return Ok(vec![]);
        }
        let target = t.edge_by_name(&names[0])?.arrow();
        let mut flips = Vec::new();
        for name in &names[1..] {
            if t.edge_by_name(name)?.arrow() != target {
                flips.push(name.clone());
            }
        }
        Ok(flips)
    };
    let flipped_rows = group_flips(&row_names)?;
    let flipped_cols = group_flips(&col_names)?;

    let row_name = N::internal("exp_row");
    let col_name = N::internal("exp_col");
    let mut order: Vec<N> = Vec::with_capacity(t.rank() + 2);
    if row_names.is_empty() {
        order.push(row_name.clone());
    } else {
        order.extend(row_names.iter().cloned());
    }
    if col_names.is_empty() {
        order.push(col_name.clone());
    } else {
        order.extend(col_names.iter().cloned());
    }
    let matrix = t.edge_operator(
        &EdgeOperation::new()
            .merge(row_name.clone(), row_names.clone())
            .merge(col_name.clone(), col_names.clone())
            .output_order(order)
            .exclude_merge([col_name.clone()])
            .exclude_reverse_after(flipped_cols.clone()),
    )?;

    let mut out_core: Core<T, S> =
        Core::new(vec![matrix.edge(0).clone(), matrix.edge(1).clone()]);
    for (index, info) in matrix.core().blocks().iter().enumerate() {
        let n = info.dims[0];
        debug_assert_eq!(n, info.dims[1], "operator blocks must be square");
        if n == 0 {
            continue;
        }
        let exp_block = matrix_exponential(matrix.core().block_data(index), n, steps);
        let offset = info.offset;
        out_core.storage_mut()[offset..offset + n * n].copy_from_slice(&exp_block);
    }
    let exp_matrix = Tensor::from_core(vec![row_name.clone(), col_name.clone()], out_core)?;

    // invert the matrixization, signs included
    let sub_edges = |names: &[N], flips: &[N]| -> Result<Vec<(N, Vec<(S, usize)>)>> {
        names
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
    let mut restore = flipped_rows.clone();
    restore.extend(flipped_cols.iter().cloned());
    let result = exp_matrix.edge_operator(
        &EdgeOperation::new()
            .split(row_name, sub_edges(&row_names, &flipped_rows)?)
            .split(col_name.clone(), sub_edges(&col_names, &flipped_cols)?)
            .reverse(restore)
            .output_order(t.names().to_vec())
            .exclude_split([col_name])
            .exclude_reverse_before(flipped_cols),
    )?;
    Ok(result)
}

/// Dense scaling-and-squaring exponential of a row-major n×n block.
fn matrix_exponential<T>(a: &[T], n: usize, steps: usize) -> Vec<T>
where
    T: Scalar + KernelScalar,
    <T as ComplexFloat>::Real: Into<f64>,
{
    // scale until the 1-norm is comfortably inside the Taylor radius
    let norm = (0..n)
        .map(|j| (0..n).map(|i| a[i * n + j].abs_val()).sum::<f64>())
        .fold(0.0, f64::max);
    let squarings = if norm > 0.5 {
        (norm / 0.5).log2().ceil() as u32
    } else {
        0
    };
    let scale = T::from_f64(0.5f64.powi(squarings as i32));

    let identity: Vec<T> = (0..n * n)
        .map(|i| if i % (n + 1) == 0 { T::one() } else { T::zero() })
        .collect();
    let scaled: Vec<T> = a.iter().map(|&x| x * scale).collect();

    // Taylor polynomial of the requested degree
    let mut result = identity.clone();
    let mut term = identity;
    for k in 1..=steps.max(1) {
        term = gemm(&term, &scaled, n, n, n);
        let factor = T::from_f64(1.0 / k as f64);
        for value in &mut term {
            *value = *value * factor;
        }
        for (dst, src) in result.iter_mut().zip(&term) {
            *dst = *dst + *src;
        }
    }

    for _ in 0..squarings {
        result = gemm(&result, &result, n, n, n);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_exponential_of_a_swap() {
        // exp([[0, 1], [1, 0]]) = [[cosh 1, sinh 1], [sinh 1, cosh 1]]
        let a = vec![0.0, 1.0, 1.0, 0.0];
        let e = matrix_exponential(&a, 2, 16);
        let cosh = 1.0f64.cosh();
        let sinh = 1.0f64.sinh();
        assert!((e[0] - cosh).abs() < 1e-12);
        assert!((e[1] - sinh).abs() < 1e-12);
        assert!((e[2] - sinh).abs() < 1e-12);
        assert!((e[3] - cosh).abs() < 1e-12);
    }
}
