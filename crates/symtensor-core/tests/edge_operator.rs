use std::collections::{BTreeMap, BTreeSet};

use symtensor_core::{
    Edge, EdgeOperation, FermiSymmetry, ParitySymmetry, Tensor, U1Symmetry, Z2Symmetry,
};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn z2(v: bool) -> Z2Symmetry {
    Z2Symmetry(v)
}

fn u1(q: i32) -> U1Symmetry {
    U1Symmetry(q)
}

fn f1(q: i32) -> FermiSymmetry {
    FermiSymmetry(q)
}

/// Rank-3 Z2 tensor: transposing twice returns the original elementwise.
#[test]
fn z2_transpose_roundtrip() {
    let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
        names(&["left", "right", "up"]),
        vec![
            Edge::new(vec![(z2(true), 3), (z2(false), 1)]),
            Edge::new(vec![(z2(true), 1), (z2(false), 2)]),
            Edge::new(vec![(z2(true), 2), (z2(false), 3)]),
        ],
    )
    .unwrap();
    t.range(0.0, 1.0);

    let transposed = t.transpose(&names(&["up", "right", "left"])).unwrap();
    let back = transposed
        .transpose(&names(&["left", "right", "up"]))
        .unwrap();
    assert_eq!(back.names(), t.names());
    assert_eq!(back.core().edges(), t.core().edges());
    assert_eq!(back.storage(), t.storage());
}

/// Rank-2 fermionic tensor of ones: the swap negates exactly the odd-odd
/// block.
#[test]
fn fermionic_transpose_negates_odd_block() {
    let odd = ParitySymmetry(true);
    let even = ParitySymmetry(false);
    let mut t: Tensor<f64, ParitySymmetry> = Tensor::new(
        names(&["i", "j"]),
        vec![
            Edge::with_arrow(vec![(odd, 1), (even, 1)], true),
            Edge::with_arrow(vec![(odd, 1), (even, 1)], false),
        ],
    )
    .unwrap();
    t.set(|| 1.0);

    let swapped = t.transpose(&names(&["j", "i"])).unwrap();
    assert_eq!(swapped.block_by_charges(&[odd, odd]).unwrap().data, &[-1.0]);
    assert_eq!(
        swapped.block_by_charges(&[even, even]).unwrap().data,
        &[1.0]
    );
}

/// U(1) rank-3 tensor: merging all edges into one and splitting back is
/// bit-identical.
#[test]
fn u1_merge_split_roundtrip() {
    let edges = vec![
        Edge::new(vec![(u1(-1), 3), (u1(0), 1), (u1(1), 2)]),
        Edge::new(vec![(u1(-1), 1), (u1(0), 2), (u1(1), 3)]),
        Edge::new(vec![(u1(-1), 2), (u1(0), 3), (u1(1), 1)]),
    ];
    let mut t: Tensor<f64, U1Symmetry> =
        Tensor::new(names(&["a", "b", "c"]), edges.clone()).unwrap();
    t.range(1.0, 1.0);

    let merge: BTreeMap<String, Vec<String>> =
        [("all".to_string(), names(&["a", "b", "c"]))].into_iter().collect();
    let merged = t
        .merge_edge(&merge, false, &BTreeSet::new(), &BTreeSet::new())
        .unwrap();
    assert_eq!(merged.rank(), 1);

    let split: BTreeMap<String, Vec<(String, Vec<(U1Symmetry, usize)>)>> = [(
        "all".to_string(),
        vec![
            ("a".to_string(), edges[0].segments().to_vec()),
            ("b".to_string(), edges[1].segments().to_vec()),
            ("c".to_string(), edges[2].segments().to_vec()),
        ],
    )]
    .into_iter()
    .collect();
    let back = merged.split_edge(&split, false, &BTreeSet::new()).unwrap();

    assert_eq!(back.names(), t.names());
    assert_eq!(back.core().edges(), t.core().edges());
    assert_eq!(back.storage(), t.storage());
}

/// Transpositions compose: π2 ∘ π1 applied at once equals applying them
/// in sequence, fermionic signs included.
#[test]
fn fermionic_transpose_composition() {
    let mut t: Tensor<f64, FermiSymmetry> = Tensor::new(
        names(&["a", "b", "c"]),
        vec![
            Edge::with_arrow(vec![(f1(-1), 2), (f1(1), 1)], true),
            Edge::with_arrow(vec![(f1(-1), 1), (f1(1), 2)], false),
            Edge::with_arrow(vec![(f1(0), 2), (f1(2), 1), (f1(-2), 1)], false),
        ],
    )
    .unwrap();
    t.range(0.5, 0.5);

    let step1 = t.transpose(&names(&["b", "a", "c"])).unwrap();
    let step2 = step1.transpose(&names(&["c", "a", "b"])).unwrap();
    let direct = t.transpose(&names(&["c", "a", "b"])).unwrap();
    assert_eq!(step2.core().edges(), direct.core().edges());
    assert_eq!(step2.storage(), direct.storage());
}

/// Reversing the same edges twice with matching flags restores the
/// original tensor.
#[test]
fn reverse_roundtrip() {
    let mut t: Tensor<f64, FermiSymmetry> = Tensor::new(
        names(&["a", "b"]),
        vec![
            Edge::with_arrow(vec![(f1(-1), 2), (f1(1), 3)], true),
            Edge::with_arrow(vec![(f1(-1), 3), (f1(1), 2)], false),
        ],
    )
    .unwrap();
    t.range(1.0, 1.0);

    let set: BTreeSet<String> = ["a".to_string()].into_iter().collect();
    for apply_parity in [false, true] {
        let once = t.reverse_edge(&set, apply_parity, &BTreeSet::new()).unwrap();
        assert_eq!(once.edge_by_name(&"a".to_string()).unwrap().arrow(), false);
        let twice = once
            .reverse_edge(&set, apply_parity, &BTreeSet::new())
            .unwrap();
        assert_eq!(twice.core().edges(), t.core().edges());
        assert_eq!(twice.storage(), t.storage());
    }
}

/// Merging fermionic edges with disagreeing arrows and splitting back is
/// the identity; the automatic alignment reversal must cancel itself.
#[test]
fn fermionic_merge_split_roundtrip_with_mixed_arrows() {
    let edges = vec![
        Edge::with_arrow(vec![(ParitySymmetry(false), 2), (ParitySymmetry(true), 1)], true),
        Edge::with_arrow(vec![(ParitySymmetry(false), 1), (ParitySymmetry(true), 2)], false),
        Edge::with_arrow(vec![(ParitySymmetry(false), 2), (ParitySymmetry(true), 2)], true),
    ];
    let mut t: Tensor<f64, ParitySymmetry> =
        Tensor::new(names(&["a", "b", "c"]), edges.clone()).unwrap();
    t.range(1.0, 1.0);

    for apply_parity in [false, true] {
        let merge: BTreeMap<String, Vec<String>> =
            [("ab".to_string(), names(&["a", "b"]))].into_iter().collect();
        let merged = t
            .merge_edge(&merge, apply_parity, &BTreeSet::new(), &BTreeSet::new())
            .unwrap();
        assert_eq!(merged.names(), &names(&["ab", "c"])[..]);
        // the merged edge takes the first constituent's arrow
        assert!(merged.edge_by_name(&"ab".to_string()).unwrap().arrow());

        // b was flipped to align with a; the split must hand back the
        // flipped edge, and reversing b afterwards restores the original
        let split: BTreeMap<String, Vec<(String, Vec<(ParitySymmetry, usize)>)>> = [(
            "ab".to_string(),
            vec![
                ("a".to_string(), edges[0].segments().to_vec()),
                ("b".to_string(), edges[1].negated().reversed().segments().to_vec()),
            ],
        )]
        .into_iter()
        .collect();
        let split_back = merged.split_edge(&split, apply_parity, &BTreeSet::new()).unwrap();
        let reverse: BTreeSet<String> = ["b".to_string()].into_iter().collect();
        let back = split_back
            .reverse_edge(&reverse, apply_parity, &BTreeSet::new())
            .unwrap();

        assert_eq!(back.names(), t.names());
        assert_eq!(back.core().edges(), t.core().edges());
        assert_eq!(back.storage(), t.storage());
    }
}

/// A rank-0 tensor is a fixed point of the operator.
#[test]
fn rank_zero_is_fixed_point() {
    let t: Tensor<f64, FermiSymmetry> = Tensor::scalar(2333.0);
    let out = t
        .edge_operator(&EdgeOperation::new().output_order(vec![]))
        .unwrap();
    assert_eq!(out.rank(), 0);
    assert_eq!(out.try_scalar().unwrap(), 2333.0);
}

/// Zero-dimension segments propagate through the pipeline.
#[test]
fn zero_dimension_segments_propagate() {
    let t: Tensor<f64, FermiSymmetry> = Tensor::new(
        names(&["a", "b"]),
        vec![
            Edge::with_arrow(vec![(f1(0), 0), (f1(1), 2)], false),
            Edge::with_arrow(vec![(f1(0), 3), (f1(1), 2)], true),
        ],
    )
    .unwrap();
    assert_eq!(t.storage().len(), 4);

    let swapped = t.transpose(&names(&["b", "a"])).unwrap();
    assert_eq!(swapped.storage().len(), 4);
    let zero_block = swapped.block_by_charges(&[f1(0), f1(0)]).unwrap();
    assert_eq!(zero_block.dims, &[3, 0]);
    assert!(zero_block.data.is_empty());
}

/// The storage-length invariant holds across every pipeline stage.
#[test]
fn block_volumes_sum_to_storage_length() {
    let mut t: Tensor<f64, U1Symmetry> = Tensor::new(
        names(&["a", "b", "c"]),
        vec![
            Edge::new(vec![(u1(-1), 2), (u1(0), 1), (u1(1), 2)]),
            Edge::new(vec![(u1(-1), 1), (u1(1), 1)]),
            Edge::new(vec![(u1(-2), 1), (u1(0), 2), (u1(2), 1)]),
        ],
    )
    .unwrap();
    t.range(0.0, 1.0);

    let merge: BTreeMap<String, Vec<String>> =
        [("bc".to_string(), names(&["b", "c"]))].into_iter().collect();
    let merged = t
        .merge_edge(&merge, false, &BTreeSet::new(), &BTreeSet::new())
        .unwrap();

    for tensor in [&t, &merged] {
        let total: usize = tensor.core().blocks().iter().map(|b| b.size).sum();
        assert_eq!(total, tensor.storage().len());
    }
    // the element count never changes
    assert_eq!(merged.storage().len(), t.storage().len());
}
