use std::collections::BTreeSet;

use approx::assert_abs_diff_eq;
use symtensor_core::{Edge, FermiSymmetry, Tensor, U1Symmetry, Z2Symmetry};
use symtensor_linalg::{contract, svd, Cut};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn name_set(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn pairs(list: &[(&str, &str)]) -> BTreeSet<(String, String)> {
    list.iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

fn reconstruct<S: symtensor_core::Symmetry>(
    result: &symtensor_linalg::SvdResult<f64, S, String>,
) -> Tensor<f64, S, String> {
    let us = contract(&result.u, &result.s, &pairs(&[("cu", "su")])).unwrap();
    contract(&us, &result.v, &pairs(&[("sv", "cv")])).unwrap()
}

fn singular_values<S: symtensor_core::Symmetry>(
    s: &Tensor<f64, S, String>,
) -> Vec<f64> {
    let mut values = Vec::new();
    for (index, info) in s.core().blocks().iter().enumerate() {
        let dim = info.dims[0];
        let data = s.core().block_data(index);
        for i in 0..dim {
            values.push(data[i * dim + i]);
        }
    }
    values.sort_by(|a, b| b.partial_cmp(a).unwrap());
    values
}

/// Keeping two values with `Remain(2)` keeps exactly two across all
/// blocks combined, by magnitude.
#[test]
fn z2_remain_cut() {
    let seg = vec![(Z2Symmetry(false), 2), (Z2Symmetry(true), 2)];
    let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
        names(&["r", "c"]),
        vec![Edge::new(seg.clone()), Edge::new(seg)],
    )
    .unwrap();
    t.range(0.0, 1.0);

    let full = svd(
        &t,
        &name_set(&["r"]),
        "cu".to_string(),
        "cv".to_string(),
        "su".to_string(),
        "sv".to_string(),
        Cut::NoCut,
    )
    .unwrap();
    let all = singular_values(&full.s);
    assert_eq!(all.len(), 4);

    let cut = svd(
        &t,
        &name_set(&["r"]),
        "cu".to_string(),
        "cv".to_string(),
        "su".to_string(),
        "sv".to_string(),
        Cut::Remain(2),
    )
    .unwrap();
    let kept = singular_values(&cut.s);
    assert_eq!(kept.len(), 2);
    // the two largest overall survive
    assert_abs_diff_eq!(kept[0], all[0], epsilon = 1e-10);
    assert_abs_diff_eq!(kept[1], all[1], epsilon = 1e-10);
}

/// U · S · V rebuilds the tensor within floating-point tolerance.
#[test]
fn u1_reconstruction() {
    let mut t: Tensor<f64, U1Symmetry> = Tensor::new(
        names(&["a", "b", "c"]),
        vec![
            Edge::new(vec![(U1Symmetry(-1), 2), (U1Symmetry(0), 1), (U1Symmetry(1), 2)]),
            Edge::new(vec![(U1Symmetry(-1), 1), (U1Symmetry(1), 2)]),
            Edge::new(vec![(U1Symmetry(0), 2), (U1Symmetry(1), 1), (U1Symmetry(2), 1)]),
        ],
    )
    .unwrap();
    t.range(0.3, 0.7);

    let result = svd(
        &t,
        &name_set(&["a"]),
        "cu".to_string(),
        "cv".to_string(),
        "su".to_string(),
        "sv".to_string(),
        Cut::NoCut,
    )
    .unwrap();
    assert_eq!(result.u.names(), &names(&["a", "cu"])[..]);
    assert_eq!(result.v.names()[0], "cv");

    let back = reconstruct(&result);
    assert_eq!(back.names(), t.names());
    assert_eq!(back.storage().len(), t.storage().len());
    for (x, y) in back.storage().iter().zip(t.storage()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-10);
    }
}

/// Fermionic reconstruction, arrows and signs included.
#[test]
fn fermionic_reconstruction() {
    use rand::{Rng, SeedableRng};

    let mut t: Tensor<f64, FermiSymmetry> = Tensor::new(
        names(&["a", "b", "c"]),
        vec![
            Edge::with_arrow(vec![(FermiSymmetry(-1), 1), (FermiSymmetry(0), 2), (FermiSymmetry(1), 1)], true),
            Edge::with_arrow(vec![(FermiSymmetry(-1), 2), (FermiSymmetry(0), 1)], false),
            Edge::with_arrow(vec![(FermiSymmetry(0), 2), (FermiSymmetry(1), 1)], false),
        ],
    )
    .unwrap();
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
    t.set(|| rng.gen_range(-1.0..1.0));
    assert!(!t.storage().is_empty());

    let result = svd(
        &t,
        &name_set(&["a"]),
        "cu".to_string(),
        "cv".to_string(),
        "su".to_string(),
        "sv".to_string(),
        Cut::NoCut,
    )
    .unwrap();
    let back = reconstruct(&result);
    assert_eq!(back.names(), t.names());
    assert_eq!(back.core().edges(), t.core().edges());
    for (x, y) in back.storage().iter().zip(t.storage()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-10);
    }
}

/// The relative cut keeps exactly the values above the threshold.
#[test]
fn relative_cut_thresholds() {
    let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
        names(&["r", "c"]),
        vec![
            Edge::new(vec![(Z2Symmetry(false), 3)]),
            Edge::new(vec![(Z2Symmetry(false), 3)]),
        ],
    )
    .unwrap();
    // diagonal matrix with singular values 8, 2, 1
    {
        let data = t.storage_mut();
        data[0] = 8.0;
        data[4] = 2.0;
        data[8] = 1.0;
    }

    let result = svd(
        &t,
        &name_set(&["r"]),
        "cu".to_string(),
        "cv".to_string(),
        "su".to_string(),
        "sv".to_string(),
        Cut::Relative(0.2),
    )
    .unwrap();
    let kept = singular_values(&result.s);
    assert_eq!(kept.len(), 2);
    assert_abs_diff_eq!(kept[0], 8.0, epsilon = 1e-10);
    assert_abs_diff_eq!(kept[1], 2.0, epsilon = 1e-10);
}

/// The singular value multiset is stable under transposing the input.
#[test]
fn singular_values_stable_under_transpose() {
    let seg = vec![(Z2Symmetry(false), 2), (Z2Symmetry(true), 2)];
    let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
        names(&["r", "c"]),
        vec![Edge::new(seg.clone()), Edge::new(seg)],
    )
    .unwrap();
    t.range(0.0, 1.0);
    let flipped = t.transpose(&names(&["c", "r"])).unwrap();

    let svd_of = |tensor: &Tensor<f64, Z2Symmetry>, free: &str| {
        svd(
            tensor,
            &name_set(&[free]),
            "cu".to_string(),
            "cv".to_string(),
            "su".to_string(),
            "sv".to_string(),
            Cut::NoCut,
        )
        .unwrap()
    };
    let direct = singular_values(&svd_of(&t, "r").s);
    let transposed = singular_values(&svd_of(&flipped, "c").s);
    assert_eq!(direct.len(), transposed.len());
    for (x, y) in direct.iter().zip(&transposed) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-10);
    }
}
