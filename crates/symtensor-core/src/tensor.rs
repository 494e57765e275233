//! Tensors: edge names tied to a shared, copy-on-write core.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core_impl::{row_major_strides, Core};
use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::scalar::Scalar;
use crate::symmetry::{NoSymmetry, Symmetry};

/// A symmetric block-sparse tensor.
///
/// A tensor is a list of distinct edge names plus shared ownership of a
/// [`Core`]. Renaming shares the core; every other transformation builds a
/// fresh one. Mutating entry points clone the core first when it is shared
/// (copy-on-write), emitting a `tracing` warning.
pub struct Tensor<T: Scalar, S: Symmetry, N: Name = String> {
    names: Vec<N>,
    core: Arc<Core<T, S>>,
}

impl<T: Scalar, S: Symmetry, N: Name> Clone for Tensor<T, S, N> {
    fn clone(&self) -> Self {
        Self {
            names: self.names.clone(),
            core: Arc::clone(&self.core),
        }
    }
}

/// Immutable view of one block.
#[derive(Debug)]
pub struct BlockRef<'a, T, S> {
    /// Segment charge per edge.
    pub charges: &'a [S],
    /// Dense shape, row-major.
    pub dims: &'a [usize],
    /// Block elements.
    pub data: &'a [T],
}

pub(crate) fn check_valid_names<N: Name>(names: &[N], rank: usize) -> Result<()> {
    if names.len() != rank {
        return Err(Error::NameLength {
            expected: rank,
            found: names.len(),
        });
    }
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
    }
    Ok(())
}

impl<T: Scalar, S: Symmetry, N: Name> Tensor<T, S, N> {
    /// Create a zero-filled tensor from names and edges.
    pub fn new(names: Vec<N>, edges: Vec<Edge<S>>) -> Result<Self> {
        check_valid_names(&names, edges.len())?;
        Ok(Self {
            names,
            core: Arc::new(Core::new(edges)),
        })
    }

    /// Wrap an existing core with names.
    pub fn from_core(names: Vec<N>, core: Core<T, S>) -> Result<Self> {
        check_valid_names(&names, core.rank())?;
        Ok(Self {
            names,
            core: Arc::new(core),
        })
    }

    /// Create a rank-0 tensor holding a single value.
    pub fn scalar(value: T) -> Self {
        let mut core = Core::new(vec![]);
        core.storage_mut()[0] = value;
        Self {
            names: vec![],
            core: Arc::new(core),
        }
    }

    /// Create a rank-n tensor containing a single element.
    ///
    /// Every edge has one segment of dimension one, carrying the given
    /// charge and arrow. If the charges do not balance, the tensor has no
    /// blocks and the value is dropped.
    pub fn one(value: T, names: Vec<N>, charges: Vec<S>, arrows: Vec<bool>) -> Result<Self> {
        let rank = names.len();
        let edges: Vec<Edge<S>> = if S::LENGTH == 0 {
            (0..rank).map(|_| Edge::trivial(1)).collect()
        } else {
            if charges.len() != rank || (S::IS_FERMI && arrows.len() != rank) {
                return Err(Error::NameLength {
                    expected: rank,
                    found: charges.len(),
                });
            }
            charges
                .into_iter()
                .enumerate()
                .map(|(i, q)| {
                    Edge::with_arrow(vec![(q, 1)], S::IS_FERMI && arrows[i])
                })
                .collect()
        };
        let mut tensor = Self::new(names, edges)?;
        if tensor.storage().len() == 1 {
            tensor.storage_mut()[0] = value;
        }
        Ok(tensor)
    }

    /// Number of edges.
    pub fn rank(&self) -> usize {
        self.names.len()
    }

    /// The edge names, in axis order.
    pub fn names(&self) -> &[N] {
        &self.names
    }

    /// The axis of the given name.
    pub fn axis_of(&self, name: &N) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::NameNotFound(name.to_string()))
    }

    /// The edge at the given axis.
    pub fn edge(&self, axis: usize) -> &Edge<S> {
        &self.core.edges()[axis]
    }

    /// The edge with the given name.
    pub fn edge_by_name(&self, name: &N) -> Result<&Edge<S>> {
        Ok(self.edge(self.axis_of(name)?))
    }

    /// The shared core.
    pub fn core(&self) -> &Core<T, S> {
        &self.core
    }

    /// Whether this tensor shares its core with another.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.core) > 1
    }

    /// Exclusive access to the core, cloning it first if shared.
    pub(crate) fn core_mut(&mut self) -> &mut Core<T, S> {
        if Arc::strong_count(&self.core) > 1 {
            tracing::warn!("core is shared; cloning storage before mutation");
        }
        Arc::make_mut(&mut self.core)
    }

    /// The flat storage, blocks back-to-back.
    pub fn storage(&self) -> &[T] {
        self.core.storage()
    }

    /// Mutable flat storage (copy-on-write).
    pub fn storage_mut(&mut self) -> &mut [T] {
        self.core_mut().storage_mut()
    }

    /// Whether the tensor holds exactly one element (not necessarily
    /// rank 0).
    pub fn scalar_like(&self) -> bool {
        self.storage().len() == 1
    }

    /// The only element of a scalar-like tensor.
    ///
    /// A tensor without any allowed block converts to zero; more than one
    /// stored element is an error.
    pub fn try_scalar(&self) -> Result<T> {
        match self.storage() {
            [] => Ok(T::zero()),
            [value] => Ok(*value),
            storage => Err(Error::NotScalarLike(storage.len())),
        }
    }

    fn positions_from_charge_list(&self, charges: &[S]) -> Result<Vec<usize>> {
        if charges.len() != self.rank() {
            return Err(Error::NameLength {
                expected: self.rank(),
                found: charges.len(),
            });
        }
        self.core
            .edges()
            .iter()
            .zip(charges)
            .map(|(e, q)| {
                e.position_of(q)
                    .ok_or_else(|| Error::ChargeNotFound(format!("{q:?}"), format!("{e}")))
            })
            .collect()
    }

    fn values_by_name<V: Clone>(&self, map: &BTreeMap<N, V>) -> Result<Vec<V>> {
        if map.len() != self.rank() {
            return Err(Error::NameLength {
                expected: self.rank(),
                found: map.len(),
            });
        }
        self.names
            .iter()
            .map(|n| {
                map.get(n)
                    .cloned()
                    .ok_or_else(|| Error::NameNotFound(n.to_string()))
            })
            .collect()
    }

    fn block_ref(&self, index: usize) -> BlockRef<'_, T, S> {
        let info = &self.core.blocks()[index];
        BlockRef {
            charges: &info.charges,
            dims: &info.dims,
            data: self.core.block_data(index),
        }
    }

    /// The block with the given charges.
    pub fn block_by_charges(&self, charges: &[S]) -> Result<BlockRef<'_, T, S>> {
        let positions = self.positions_from_charge_list(charges)?;
        let index = self
            .core
            .find_by_positions(&positions)
            .ok_or(Error::BlockNotFound)?;
        Ok(self.block_ref(index))
    }

    /// The block at the given segment positions.
    pub fn block_by_positions(&self, positions: &[usize]) -> Result<BlockRef<'_, T, S>> {
        let index = self
            .core
            .find_by_positions(positions)
            .ok_or(Error::BlockNotFound)?;
        Ok(self.block_ref(index))
    }

    /// The block with the given name → charge assignment.
    pub fn block_by_charge_map(&self, map: &BTreeMap<N, S>) -> Result<BlockRef<'_, T, S>> {
        let charges = self.values_by_name(map)?;
        self.block_by_charges(&charges)
    }

    /// The block at the given name → segment position assignment.
    pub fn block_by_position_map(&self, map: &BTreeMap<N, usize>) -> Result<BlockRef<'_, T, S>> {
        let positions = self.values_by_name(map)?;
        self.block_by_positions(&positions)
    }

    /// Mutable data of the block with the given charges (copy-on-write).
    pub fn block_data_mut_by_charges(&mut self, charges: &[S]) -> Result<&mut [T]> {
        let positions = self.positions_from_charge_list(charges)?;
        let index = self
            .core
            .find_by_positions(&positions)
            .ok_or(Error::BlockNotFound)?;
        Ok(self.core_mut().block_data_mut(index))
    }

    fn element_offset(&self, points: &[(S, usize)]) -> Result<usize> {
        let charges: Vec<S> = points.iter().map(|(q, _)| *q).collect();
        let positions = self.positions_from_charge_list(&charges)?;
        let index = self
            .core
            .find_by_positions(&positions)
            .ok_or(Error::BlockNotFound)?;
        let info = &self.core.blocks()[index];
        let strides = row_major_strides(&info.dims);
        let mut offset = info.offset;
        for (axis, (_, sub)) in points.iter().enumerate() {
            if *sub >= info.dims[axis] {
                return Err(Error::IndexOutOfRange {
                    index: *sub,
                    dim: info.dims[axis],
                });
            }
            offset += sub * strides[axis];
        }
        Ok(offset)
    }

    /// The element at the given name → (charge, offset) assignment.
    pub fn at(&self, position: &BTreeMap<N, (S, usize)>) -> Result<&T> {
        let points = self.values_by_name(position)?;
        let offset = self.element_offset(&points)?;
        Ok(&self.core.storage()[offset])
    }

    /// The element at the given name → dense index assignment.
    pub fn at_index(&self, position: &BTreeMap<N, usize>) -> Result<&T> {
        let indices = self.values_by_name(position)?;
        let points: Vec<(S, usize)> = self
            .core
            .edges()
            .iter()
            .zip(&indices)
            .map(|(e, &i)| {
                e.index_to_point(i).ok_or(Error::IndexOutOfRange {
                    index: i,
                    dim: e.total_dim(),
                })
            })
            .collect::<Result<_>>()?;
        let offset = self.element_offset(&points)?;
        Ok(&self.core.storage()[offset])
    }

    /// Mutable element access by name → (charge, offset) (copy-on-write).
    pub fn at_mut(&mut self, position: &BTreeMap<N, (S, usize)>) -> Result<&mut T> {
        let points = self.values_by_name(position)?;
        let offset = self.element_offset(&points)?;
        Ok(&mut self.core_mut().storage_mut()[offset])
    }

    /// Rename edges. Shares the core; no data is copied.
    pub fn edge_rename(&self, dictionary: &BTreeMap<N, N>) -> Result<Self> {
        let names: Vec<N> = self
            .names
            .iter()
            .map(|n| dictionary.get(n).cloned().unwrap_or_else(|| n.clone()))
            .collect();
        check_valid_names(&names, self.rank())?;
        Ok(Self {
            names,
            core: Arc::clone(&self.core),
        })
    }

    /// Apply a function to every stored element, in place.
    pub fn transform(&mut self, f: impl Fn(T) -> T) -> &mut Self {
        for value in self.storage_mut() {
            *value = f(*value);
        }
        self
    }

    /// Apply a function to every stored element, producing a new tensor of
    /// possibly different scalar type with the same shape.
    pub fn map<U: Scalar>(&self, f: impl Fn(T) -> U) -> Tensor<U, S, N> {
        let mut out = self.same_shape::<U>();
        {
            let storage = Arc::make_mut(&mut out.core).storage_mut();
            for (dst, src) in storage.iter_mut().zip(self.storage()) {
                *dst = f(*src);
            }
        }
        out
    }

    /// A zero-filled tensor with the same names and edges, of any scalar
    /// type.
    pub fn same_shape<U: Scalar>(&self) -> Tensor<U, S, N> {
        Tensor {
            names: self.names.clone(),
            core: Arc::new(Core::new(self.core.edges().to_vec())),
        }
    }

    /// Deep copy with unshared storage.
    pub fn copy(&self) -> Self {
        self.map(|x| x)
    }

    /// Fill every element from a generator, in place.
    pub fn set(&mut self, mut generator: impl FnMut() -> T) -> &mut Self {
        for value in self.storage_mut() {
            *value = generator();
        }
        self
    }

    /// Set every element to zero, in place.
    pub fn zero(&mut self) -> &mut Self {
        self.set(T::zero)
    }

    /// Fill with an arithmetic progression, in place. Used mostly in tests.
    pub fn range(&mut self, first: T, step: T) -> &mut Self {
        let mut next = first;
        self.set(move || {
            let value = next;
            next = next + step;
            value
        })
    }

    /// The conjugate tensor: elementwise conjugation, non-fermionic edges
    /// with negated charges, fermionic edges with flipped arrows.
    pub fn conjugate(&self) -> Self {
        let edges: Vec<Edge<S>> = self.core.edges().iter().map(|e| e.dual()).collect();
        let mut core = Core::new(edges);
        debug_assert_eq!(core.storage().len(), self.storage().len());
        for (dst, src) in core.storage_mut().iter_mut().zip(self.storage()) {
            *dst = src.conj();
        }
        Self {
            names: self.names.clone(),
            core: Arc::new(core),
        }
    }

    /// Forget the symmetry structure, producing one dense block.
    pub fn clear_symmetry(&self) -> Tensor<T, NoSymmetry, N> {
        let dims: Vec<usize> = self.core.edges().iter().map(|e| e.total_dim()).collect();
        let dense_strides = row_major_strides(&dims);
        let edges: Vec<Edge<NoSymmetry>> = dims.iter().map(|&d| Edge::trivial(d)).collect();
        let mut core = Core::new(edges);
        {
            let storage = core.storage_mut();
            for (index, info) in self.core.blocks().iter().enumerate() {
                if info.size == 0 {
                    continue;
                }
                let bases: Vec<usize> = self
                    .core
                    .edges()
                    .iter()
                    .zip(&info.positions)
                    .map(|(e, &p)| e.segment_offset(p))
                    .collect();
                let data = self.core.block_data(index);
                let mut sub = vec![0usize; info.dims.len()];
                for value in data {
                    let dense: usize = sub
                        .iter()
                        .zip(&bases)
                        .zip(&dense_strides)
                        .map(|((&i, &b), &s)| (b + i) * s)
                        .sum();
                    storage[dense] = *value;
                    for axis in (0..sub.len()).rev() {
                        sub[axis] += 1;
                        if sub[axis] < info.dims[axis] {
                            break;
                        }
                        sub[axis] = 0;
                    }
                }
            }
        }
        Tensor {
            names: self.names.clone(),
            core: Arc::new(core),
        }
    }
}

impl<T: Scalar, S: Symmetry, N: Name> fmt::Display for Tensor<T, S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor{{names: [")?;
        for (i, n) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{n}")?;
        }
        write!(f, "], edges: [")?;
        for (i, e) in self.core.edges().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "], storage: {}}}", self.storage().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::U1Symmetry;

    fn u1(q: i32) -> U1Symmetry {
        U1Symmetry(q)
    }

    #[test]
    fn rename_shares_core() {
        let t: Tensor<f64, U1Symmetry> = Tensor::new(
            vec!["i".to_string(), "j".to_string()],
            vec![
                Edge::new(vec![(u1(-1), 2), (u1(1), 2)]),
                Edge::new(vec![(u1(-1), 2), (u1(1), 2)]),
            ],
        )
        .unwrap();
        let renamed = t
            .edge_rename(&[("i".to_string(), "k".to_string())].into_iter().collect())
            .unwrap();
        assert_eq!(renamed.names(), &["k".to_string(), "j".to_string()]);
        assert!(t.is_shared() && renamed.is_shared());
    }

    #[test]
    fn cow_clones_on_write() {
        let mut t: Tensor<f64, U1Symmetry> = Tensor::new(
            vec!["i".to_string(), "j".to_string()],
            vec![
                Edge::new(vec![(u1(-1), 1), (u1(1), 1)]),
                Edge::new(vec![(u1(-1), 1), (u1(1), 1)]),
            ],
        )
        .unwrap();
        let shared = t.clone();
        t.range(1.0, 1.0);
        assert_eq!(t.storage(), &[1.0, 2.0]);
        assert_eq!(shared.storage(), &[0.0, 0.0]);
        assert!(!t.is_shared());
    }

    #[test]
    fn duplicate_names_rejected() {
        let result: Result<Tensor<f64, U1Symmetry>> = Tensor::new(
            vec!["i".to_string(), "i".to_string()],
            vec![Edge::trivial(1), Edge::trivial(1)],
        );
        assert!(matches!(result, Err(Error::DuplicateName(_))));
    }
}
