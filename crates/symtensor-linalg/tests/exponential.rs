use std::collections::BTreeSet;

use approx::assert_abs_diff_eq;
use symtensor_core::{Edge, NoSymmetry, ParitySymmetry, Tensor, Z2Symmetry};
use symtensor_linalg::{contract, exponential};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn pairs(list: &[(&str, &str)]) -> BTreeSet<(String, String)> {
    list.iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

/// exp of the swap matrix is cosh/sinh.
#[test]
fn dense_swap_exponential() {
    let mut t: Tensor<f64, NoSymmetry> =
        Tensor::new(names(&["r", "c"]), vec![2.into(), 2.into()]).unwrap();
    {
        let data = t.storage_mut();
        data[1] = 1.0;
        data[2] = 1.0;
    }

    let e = exponential(&t, &pairs(&[("r", "c")]), 16).unwrap();
    let cosh = 1.0f64.cosh();
    let sinh = 1.0f64.sinh();
    assert_abs_diff_eq!(e.storage()[0], cosh, epsilon = 1e-12);
    assert_abs_diff_eq!(e.storage()[1], sinh, epsilon = 1e-12);
    assert_abs_diff_eq!(e.storage()[2], sinh, epsilon = 1e-12);
    assert_abs_diff_eq!(e.storage()[3], cosh, epsilon = 1e-12);
}

/// Symmetric exponential acts blockwise.
#[test]
fn z2_blockwise_exponential() {
    let seg = vec![(Z2Symmetry(false), 1), (Z2Symmetry(true), 1)];
    let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
        names(&["r", "c"]),
        vec![Edge::new(seg.clone()), Edge::new(seg)],
    )
    .unwrap();
    {
        let even = t.block_data_mut_by_charges(&[Z2Symmetry(false), Z2Symmetry(false)]).unwrap();
        even[0] = 2.0;
        let odd = t.block_data_mut_by_charges(&[Z2Symmetry(true), Z2Symmetry(true)]).unwrap();
        odd[0] = -1.0;
    }

    let e = exponential(&t, &pairs(&[("r", "c")]), 20).unwrap();
    let even = e
        .block_by_charges(&[Z2Symmetry(false), Z2Symmetry(false)])
        .unwrap();
    assert_abs_diff_eq!(even.data[0], 2.0f64.exp(), epsilon = 1e-10);
    let odd = e
        .block_by_charges(&[Z2Symmetry(true), Z2Symmetry(true)])
        .unwrap();
    assert_abs_diff_eq!(odd.data[0], (-1.0f64).exp(), epsilon = 1e-10);
}

/// exp(0) is the identity: contracting it changes nothing.
#[test]
fn exponential_of_zero_is_the_identity() {
    let odd = ParitySymmetry(true);
    let even = ParitySymmetry(false);
    let segments = vec![(even, 1), (odd, 1)];
    let zero: Tensor<f64, ParitySymmetry> = Tensor::new(
        names(&["r1", "r2", "c1", "c2"]),
        vec![
            Edge::with_arrow(segments.clone(), true),
            Edge::with_arrow(segments.clone(), true),
            Edge::with_arrow(segments.clone(), false),
            Edge::with_arrow(segments.clone(), false),
        ],
    )
    .unwrap();
    let e = exponential(&zero, &pairs(&[("r1", "c1"), ("r2", "c2")]), 8).unwrap();

    let mut t: Tensor<f64, ParitySymmetry> = Tensor::new(
        names(&["i", "j"]),
        vec![
            Edge::with_arrow(segments.clone(), false),
            Edge::with_arrow(segments, false),
        ],
    )
    .unwrap();
    t.range(1.0, 1.0);

    let applied = contract(&t, &e, &pairs(&[("i", "r1"), ("j", "r2")])).unwrap();
    assert_eq!(applied.names(), &names(&["c1", "c2"])[..]);
    for (x, y) in applied.storage().iter().zip(t.storage()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-12);
    }
}
