//! Vector norms over the stored scalars.

use crate::name::Name;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

impl<T: Scalar, S: Symmetry, N: Name> Tensor<T, S, N> {
    /// The p-norm of the tensor, treated as a flat vector.
    ///
    /// `P = -1` is the maximum-absolute-value norm, `P = 0` counts the
    /// stored elements, otherwise `(Σ |x|^P)^(1/P)`.
    pub fn norm<const P: i32>(&self) -> f64 {
        if P == -1 {
            self.storage()
                .iter()
                .map(|x| x.abs_val())
                .fold(0.0, f64::max)
        } else if P == 0 {
            self.storage().len() as f64
        } else if P == 1 {
            self.storage().iter().map(|x| x.abs_val()).sum()
        } else if P == 2 {
            self.storage()
                .iter()
                .map(|x| x.abs_sq())
                .sum::<f64>()
                .sqrt()
        } else {
            self.storage()
                .iter()
                .map(|x| x.abs_val().powi(P))
                .sum::<f64>()
                .powf(1.0 / P as f64)
        }
    }

    /// The maximum-absolute-value norm.
    pub fn norm_max(&self) -> f64 {
        self.norm::<{ -1 }>()
    }

    /// The 1-norm.
    pub fn norm_one(&self) -> f64 {
        self.norm::<1>()
    }

    /// The 2-norm.
    pub fn norm_two(&self) -> f64 {
        self.norm::<2>()
    }
}
