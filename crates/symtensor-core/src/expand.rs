//! Expansion to and shrinkage from fixed index points.
//!
//! `expand` inserts new single-segment edges whose index is pinned to one
//! point (zero elsewhere); `shrink` is the inverse, slicing configured
//! edges at a `(charge, index)` point. A displaced charge is carried by a
//! dimension-one residual edge.

use std::collections::BTreeMap;

use crate::core_impl::{row_major_strides, Core};
use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Where and how `expand` inserts one new edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandPoint<S: Symmetry> {
    /// Arrow of the new edge (fermionic symmetries only).
    pub arrow: bool,
    /// Charge of the new edge's single segment.
    pub charge: S,
    /// Index the data is pinned to.
    pub index: usize,
    /// Total dimension of the new edge.
    pub dim: usize,
}

fn signed<S: Symmetry>(arrow: bool, charge: S) -> S {
    if S::IS_FERMI && arrow {
        -charge
    } else {
        charge
    }
}

impl<T: Scalar, S: Symmetry, N: Name> Tensor<T, S, N> {
    /// Insert new edges pinned to index points, appended after the
    /// existing edges in map order.
    ///
    /// If `old_name` is given, that edge must be a dimension-one residual
    /// edge and is consumed; the signed charges of the new edges must add
    /// up to its signed charge (or to zero without it).
    pub fn expand(
        &self,
        configure: &BTreeMap<N, ExpandPoint<S>>,
        old_name: Option<&N>,
    ) -> Result<Self> {
        for point in configure.values() {
            if point.index >= point.dim {
                return Err(Error::IndexOutOfRange {
                    index: point.index,
                    dim: point.dim,
                });
            }
        }

        // move the residual edge last so dropping it never reorders data
        let base = match old_name {
            Some(old) => {
                let mut order: Vec<N> = self
                    .names()
                    .iter()
                    .filter(|n| *n != old)
                    .cloned()
                    .collect();
                if order.len() == self.rank() {
                    return Err(Error::NameNotFound(old.to_string()));
                }
                order.push(old.clone());
                self.transpose(&order)?
            }
            None => self.clone(),
        };
        let head_rank = base.rank() - old_name.map_or(0, |_| 1);

        let old_signed = match old_name {
            Some(_) => {
                let edge = base.edge(head_rank);
                if edge.segment_count() != 1 || edge.total_dim() != 1 {
                    return Err(Error::NotResidualEdge(format!("{edge}")));
                }
                edge.signed_charge(edge.segments()[0].0)
            }
            None => S::zero(),
        };
        let new_signed = configure
            .values()
            .fold(S::zero(), |acc, p| acc + signed(p.arrow, p.charge));
        if new_signed != old_signed {
            return Err(Error::UnbalancedCharge);
        }

        let mut names: Vec<N> = base.names()[..head_rank].to_vec();
        let mut edges: Vec<Edge<S>> = base.core().edges()[..head_rank].to_vec();
        for (name, point) in configure {
            names.push(name.clone());
            edges.push(Edge::with_arrow(
                vec![(point.charge, point.dim)],
                S::IS_FERMI && point.arrow,
            ));
        }
        let mut out_core: Core<T, S> = Core::new(edges);

        for (index, block) in base.core().blocks().iter().enumerate() {
            if block.size == 0 {
                continue;
            }
            let mut out_charges: Vec<S> = block.charges[..head_rank].to_vec();
            out_charges.extend(configure.values().map(|p| p.charge));
            let out_index = out_core
                .find_by_charges(&out_charges)
                .expect("balanced charges form an allowed block");
            let out_info = &out_core.blocks()[out_index];
            let out_strides = row_major_strides(&out_info.dims);
            let mut dst_base = out_info.offset;
            for (axis, point) in configure.values().enumerate() {
                dst_base += point.index * out_strides[head_rank + axis];
            }

            let head_dims: Vec<usize> = block.dims[..head_rank].to_vec();
            let data = base.core().block_data(index);
            let mut head_index = vec![0usize; head_rank];
            for value in data {
                let dst: usize = dst_base
                    + head_index
                        .iter()
                        .zip(&out_strides)
                        .map(|(&i, &s)| i * s)
                        .sum::<usize>();
                out_core.storage_mut()[dst] = *value;
                for axis in (0..head_rank).rev() {
                    head_index[axis] += 1;
                    if head_index[axis] < head_dims[axis] {
                        break;
                    }
                    head_index[axis] = 0;
                }
            }
        }

        Tensor::from_core(names, out_core)
    }

    /// Slice the configured edges at `(charge, index)` points, removing
    /// them.
    ///
    /// If the removed signed charges do not balance, they are carried by a
    /// new dimension-one edge named `new_name` with the given arrow,
    /// appended last.
    pub fn shrink(
        &self,
        configure: &BTreeMap<N, (S, usize)>,
        new_name: Option<N>,
        arrow: bool,
    ) -> Result<Self> {
        for name in configure.keys() {
            self.axis_of(name)?;
        }
        let kept: Vec<N> = self
            .names()
            .iter()
            .filter(|n| !configure.contains_key(n))
            .cloned()
            .collect();
        let kept_rank = kept.len();

        let mut order = kept.clone();
        order.extend(configure.keys().cloned());
        let base = self.transpose(&order)?;

        let mut removed = S::zero();
        for (axis, (name, (charge, index))) in configure.iter().enumerate() {
            let edge = base.edge(kept_rank + axis);
            let dim = edge.dim_of(charge).ok_or_else(|| {
                Error::ChargeNotFound(format!("{charge:?}"), name.to_string())
            })?;
            if *index >= dim {
                return Err(Error::IndexOutOfRange {
                    index: *index,
                    dim,
                });
            }
            removed = removed + edge.signed_charge(*charge);
        }

        let mut names = kept.clone();
        let mut edges: Vec<Edge<S>> = base.core().edges()[..kept_rank].to_vec();
        if !removed.is_zero() {
            let name = new_name.ok_or(Error::UnbalancedCharge)?;
            let arrow = S::IS_FERMI && arrow;
            let charge = if arrow { -removed } else { removed };
            names.push(name);
            edges.push(Edge::with_arrow(vec![(charge, 1)], arrow));
        }
        let mut out_core: Core<T, S> = Core::new(edges);

        for (index, block) in base.core().blocks().iter().enumerate() {
            if block.size == 0 {
                continue;
            }
            if block.charges[kept_rank..]
                .iter()
                .zip(configure.values())
                .any(|(q, (want, _))| q != want)
            {
                continue;
            }
            let mut out_charges: Vec<S> = block.charges[..kept_rank].to_vec();
            if !removed.is_zero() {
                let edge = &out_core.edges()[kept_rank];
                out_charges.push(edge.segments()[0].0);
            }
            let out_index = out_core
                .find_by_charges(&out_charges)
                .expect("kept charges form an allowed block");
            let out_offset = out_core.blocks()[out_index].offset;

            let strides = row_major_strides(&block.dims);
            let mut src_base = 0usize;
            for (axis, (_, point)) in configure.values().enumerate() {
                src_base += point * strides[kept_rank + axis];
            }
            let data = base.core().block_data(index);

            let kept_dims: Vec<usize> = block.dims[..kept_rank].to_vec();
            let kept_volume: usize = kept_dims.iter().product();
            let mut kept_index = vec![0usize; kept_rank];
            for flat in 0..kept_volume {
                let src: usize = src_base
                    + kept_index
                        .iter()
                        .zip(&strides)
                        .map(|(&i, &s)| i * s)
                        .sum::<usize>();
                out_core.storage_mut()[out_offset + flat] = data[src];
                for axis in (0..kept_rank).rev() {
                    kept_index[axis] += 1;
                    if kept_index[axis] < kept_dims[axis] {
                        break;
                    }
                    kept_index[axis] = 0;
                }
            }
        }

        Tensor::from_core(names, out_core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiSymmetry, NoSymmetry};

    #[test]
    fn expand_then_shrink_restores_a_scalar() {
        let t: Tensor<f64, NoSymmetry> = Tensor::scalar(2333.0);
        let configure: BTreeMap<String, ExpandPoint<NoSymmetry>> = [
            (
                "i".to_string(),
                ExpandPoint {
                    arrow: false,
                    charge: NoSymmetry,
                    index: 0,
                    dim: 1,
                },
            ),
            (
                "j".to_string(),
                ExpandPoint {
                    arrow: false,
                    charge: NoSymmetry,
                    index: 0,
                    dim: 1,
                },
            ),
        ]
        .into_iter()
        .collect();
        let expanded = t.expand(&configure, None).unwrap();
        assert_eq!(expanded.rank(), 2);
        assert_eq!(expanded.storage(), &[2333.0]);

        let shrink: BTreeMap<String, (NoSymmetry, usize)> = [
            ("i".to_string(), (NoSymmetry, 0)),
            ("j".to_string(), (NoSymmetry, 0)),
        ]
        .into_iter()
        .collect();
        let back = expanded.shrink(&shrink, None, false).unwrap();
        assert_eq!(back.rank(), 0);
        assert_eq!(back.try_scalar().unwrap(), 2333.0);
    }

    #[test]
    fn shrink_carries_displaced_charge() {
        // slice the +1 segment out of a charged edge; the residual edge
        // keeps the block balanced
        let mut t: Tensor<f64, FermiSymmetry> = Tensor::new(
            vec!["i".to_string(), "j".to_string()],
            vec![
                Edge::new(vec![(FermiSymmetry(-1), 2), (FermiSymmetry(1), 2)]),
                Edge::new(vec![(FermiSymmetry(1), 2), (FermiSymmetry(-1), 2)]),
            ],
        )
        .unwrap();
        t.range(1.0, 1.0);

        let configure: BTreeMap<String, (FermiSymmetry, usize)> =
            [("j".to_string(), (FermiSymmetry(1), 0))].into_iter().collect();
        let shrunk = t
            .shrink(&configure, Some("rest".to_string()), false)
            .unwrap();
        assert_eq!(
            shrunk.names(),
            &["i".to_string(), "rest".to_string()][..]
        );
        let residual = shrunk.edge_by_name(&"rest".to_string()).unwrap();
        assert_eq!(residual.segments(), &[(FermiSymmetry(1), 1)]);

        // block (-1, +1) of t holds elements 1..=4; slicing j at index 0
        // keeps the first column
        let block = shrunk
            .block_by_charges(&[FermiSymmetry(-1), FermiSymmetry(1)])
            .unwrap();
        assert_eq!(block.data, &[1.0, 3.0]);
    }

    #[test]
    fn expand_consumes_residual_edge() {
        let t: Tensor<f64, FermiSymmetry> = Tensor::one(
            7.0,
            vec!["rest".to_string()],
            vec![FermiSymmetry(0)],
            vec![false],
        )
        .unwrap();
        let configure: BTreeMap<String, ExpandPoint<FermiSymmetry>> = [(
            "i".to_string(),
            ExpandPoint {
                arrow: false,
                charge: FermiSymmetry(0),
                index: 1,
                dim: 3,
            },
        )]
        .into_iter()
        .collect();
        let expanded = t.expand(&configure, Some(&"rest".to_string())).unwrap();
        assert_eq!(expanded.names(), &["i".to_string()][..]);
        assert_eq!(expanded.storage(), &[0.0, 7.0, 0.0]);
    }
}
