//! Dense kernels on row-major block slices, via the Faer backend of
//! `mdarray-linalg`.

use mdarray::{DSlice, DTensor};
use mdarray_linalg::contract::{Contract, MatmulBuilder};
use mdarray_linalg::qr::QR;
use mdarray_linalg::svd::{SVDDecomp, SVD};
use mdarray_linalg_faer::Faer;
use num_complex::ComplexFloat;

use crate::error::Result;

/// Scalar bound shared by every kernel in this module.
pub(crate) trait KernelScalar:
    symtensor_core::Scalar
    + ComplexFloat
    + faer_traits::ComplexField
    + From<<Self as ComplexFloat>::Real>
    + num_traits::MulAdd<Output = Self>
    + std::iter::Sum
    + 'static
where
    <Self as ComplexFloat>::Real: Into<f64>,
{
}

impl<T> KernelScalar for T
where
    T: symtensor_core::Scalar
        + ComplexFloat
        + faer_traits::ComplexField
        + From<<T as ComplexFloat>::Real>
        + num_traits::MulAdd<Output = T>
        + std::iter::Sum
        + 'static,
    <T as ComplexFloat>::Real: Into<f64>,
{
}

fn to_tensor<T: KernelScalar>(data: &[T], rows: usize, cols: usize) -> DTensor<T, 2>
where
    <T as ComplexFloat>::Real: Into<f64>,
{
    DTensor::<T, 2>::from_fn([rows, cols], |idx| data[idx[0] * cols + idx[1]])
}

/// C = A · B for row-major blocks, A is m×k and B is k×n.
pub(crate) fn gemm<T: KernelScalar>(a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Vec<T>
where
    <T as ComplexFloat>::Real: Into<f64>,
{
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    let a_tensor = to_tensor(a, m, k);
    let b_tensor = to_tensor(b, k, n);
    let a_slice: &DSlice<T, 2> = &a_tensor;
    let b_slice: &DSlice<T, 2> = &b_tensor;
    let c = Faer.matmul(a_slice, b_slice).eval();
    let mut out = Vec::with_capacity(m * n);
    for i in 0..m {
        for j in 0..n {
            out.push(c[[i, j]]);
        }
    }
    out
}

/// Thin SVD of a row-major m×n block: (U m×k, σ descending, Vᵀ k×n) with
/// k = min(m, n).
pub(crate) fn svd_thin<T: KernelScalar>(
    a: &[T],
    m: usize,
    n: usize,
) -> Result<(Vec<T>, Vec<f64>, Vec<T>)>
where
    <T as ComplexFloat>::Real: Into<f64>,
{
    let mut a_tensor = to_tensor(a, m, n);
    let a_slice: &mut DSlice<T, 2> = a_tensor.as_mut();
    let SVDDecomp { s, u, vt } = Faer.svd(a_slice)?;
    let k = m.min(n);

    let mut values = Vec::with_capacity(k);
    for i in 0..k {
        values.push(s[[i]].re().into());
    }

    let mut u_thin = Vec::with_capacity(m * k);
    for i in 0..m {
        for j in 0..k {
            u_thin.push(u[[i, j]]);
        }
    }
    let mut vt_thin = Vec::with_capacity(k * n);
    for i in 0..k {
        for j in 0..n {
            vt_thin.push(vt[[i, j]]);
        }
    }
    Ok((u_thin, values, vt_thin))
}

/// Thin QR of a row-major m×n block: (Q m×k, R k×n) with k = min(m, n).
pub(crate) fn qr_thin<T: KernelScalar>(a: &[T], m: usize, n: usize) -> (Vec<T>, Vec<T>)
where
    <T as ComplexFloat>::Real: Into<f64>,
{
    let mut a_tensor = to_tensor(a, m, n);
    let a_slice: &mut DSlice<T, 2> = a_tensor.as_mut();
    let (q_full, r_full) = Faer.qr(a_slice);
    let k = m.min(n);

    let mut q_thin = Vec::with_capacity(m * k);
    for i in 0..m {
        for j in 0..k {
            q_thin.push(q_full[[i, j]]);
        }
    }
    let mut r_thin = Vec::with_capacity(k * n);
    for i in 0..k {
        for j in 0..n {
            r_thin.push(r_full[[i, j]]);
        }
    }
    (q_thin, r_thin)
}
