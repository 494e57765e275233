//! The fused edge pipeline: rename, split, reverse, transpose, merge.
//!
//! [`EdgeOperation`] is a declarative description of the transformation;
//! [`Tensor::edge_operator`] resolves it into output edges and then, for
//! every input block, computes the set of output slabs it contributes to,
//! the index permutation, and the fermionic sign, dispatching one strided
//! copy per contribution. No intermediate tensor is materialised.
//!
//! Sign bookkeeping follows the stage structure:
//!
//! - split and merge contribute the parity of reordering a group of
//!   fermionic charges to one side, `(-1)^(Σ_{i<j} p_i p_j)`, gated by
//!   `apply_parity` XOR membership in the per-stage exclusion set;
//! - arrow reversal contributes `(-1)^parity(q)` per reversed edge, gated
//!   the same way, and relabels the edge with negated charges;
//! - transposition contributes the inversion parity over fermion-odd
//!   axes and is always applied.

use std::collections::{BTreeMap, BTreeSet};

use crate::core_impl::{row_major_strides, Core};
use crate::edge::{Edge, MergeLayout};
use crate::error::{Error, Result};
use crate::name::Name;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::{check_valid_names, Tensor};

/// Declarative description of a fused edge transformation.
///
/// All stages are optional; names used by later stages refer to the state
/// after renaming and splitting. `output_order` lists the post-split,
/// pre-merge names in their final transposed order; every merge group must
/// appear contiguously in declared order. A merge group without
/// constituents produces the unit edge and is positioned by writing the
/// merged name itself into the order.
#[derive(Clone, Debug)]
pub struct EdgeOperation<S: Symmetry, N: Name = String> {
    rename: BTreeMap<N, N>,
    split: BTreeMap<N, Vec<(N, Vec<(S, usize)>)>>,
    reversed: BTreeSet<N>,
    merge: BTreeMap<N, Vec<N>>,
    new_names: Option<Vec<N>>,
    apply_parity: bool,
    exclude_split: BTreeSet<N>,
    exclude_reverse_before: BTreeSet<N>,
    exclude_reverse_after: BTreeSet<N>,
    exclude_merge: BTreeSet<N>,
}

impl<S: Symmetry, N: Name> Default for EdgeOperation<S, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Symmetry, N: Name> EdgeOperation<S, N> {
    /// An operation that does nothing.
    pub fn new() -> Self {
        Self {
            rename: BTreeMap::new(),
            split: BTreeMap::new(),
            reversed: BTreeSet::new(),
            merge: BTreeMap::new(),
            new_names: None,
            apply_parity: false,
            exclude_split: BTreeSet::new(),
            exclude_reverse_before: BTreeSet::new(),
            exclude_reverse_after: BTreeSet::new(),
            exclude_merge: BTreeSet::new(),
        }
    }

    /// Rename an edge before any other stage.
    pub fn rename(mut self, from: N, to: N) -> Self {
        self.rename.insert(from, to);
        self
    }

    /// Replace one edge by the given sub-edges; their canonical merge must
    /// rebuild the original edge. An empty list drops a unit edge.
    pub fn split(mut self, name: N, sub_edges: Vec<(N, Vec<(S, usize)>)>) -> Self {
        self.split.insert(name, sub_edges);
        self
    }

    /// Flip arrows (and relabel charges) before the transposition.
    pub fn reverse(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.reversed.extend(names);
        self
    }

    /// Merge the named edges, contiguous in the output order, into one.
    pub fn merge(mut self, name: N, members: Vec<N>) -> Self {
        self.merge.insert(name, members);
        self
    }

    /// The post-split names in final transposed order.
    pub fn output_order(mut self, names: Vec<N>) -> Self {
        self.new_names = Some(names);
        self
    }

    /// Default gate for the split/reverse/merge signs.
    pub fn with_parity(mut self, apply_parity: bool) -> Self {
        self.apply_parity = apply_parity;
        self
    }

    /// Names whose split sign gate is inverted.
    pub fn exclude_split(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.exclude_split.extend(names);
        self
    }

    /// Names whose pre-transpose reversal sign gate is inverted.
    pub fn exclude_reverse_before(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.exclude_reverse_before.extend(names);
        self
    }

    /// Names whose automatic post-transpose reversal sign gate is inverted.
    pub fn exclude_reverse_after(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.exclude_reverse_after.extend(names);
        self
    }

    /// Merged names whose merge sign gate is inverted.
    pub fn exclude_merge(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.exclude_merge.extend(names);
        self
    }
}

/// Parity of reordering a group of charges to one side:
/// `Σ_{i<j} p_i p_j = C(odd, 2) mod 2`.
pub(crate) fn group_parity(parities: impl IntoIterator<Item = bool>) -> bool {
    let odd = parities.into_iter().filter(|p| *p).count();
    matches!(odd % 4, 2 | 3)
}

/// One post-split axis during resolution.
struct InterAxis<S: Symmetry, N: Name> {
    name: N,
    edge: Edge<S>,
    reversed_before: bool,
    before_sign: bool,
    reversed_after: bool,
    after_sign: bool,
}

impl<S: Symmetry, N: Name> InterAxis<S, N> {
    fn relabelled(&self, charge: S) -> S {
        if self.reversed_before ^ self.reversed_after {
            -charge
        } else {
            charge
        }
    }
}

/// The split applied to one input axis; a pass-through axis is a split
/// into a single identical sub-edge.
struct AxisSplit<S: Symmetry> {
    layout: MergeLayout<S>,
    first_inter: usize,
    sub_count: usize,
    sign_gate: bool,
}

enum OutKind<S: Symmetry> {
    Single {
        inter: usize,
    },
    Merged {
        members: Vec<usize>,
        layout: MergeLayout<S>,
        sign_gate: bool,
    },
    Unit,
}

struct OutAxis<S: Symmetry, N: Name> {
    name: N,
    kind: OutKind<S>,
}

impl<T: Scalar, S: Symmetry, N: Name> Tensor<T, S, N> {
    /// Apply a fused edge transformation, producing a fresh tensor.
    ///
    /// A pure rename (no split, reversal, merge or reordering) shares the
    /// core instead of copying.
    pub fn edge_operator(&self, op: &EdgeOperation<S, N>) -> Result<Self> {
        let rank = self.rank();
        let renamed: Vec<N> = self
            .names()
            .iter()
            .map(|n| op.rename.get(n).cloned().unwrap_or_else(|| n.clone()))
            .collect();
        check_valid_names(&renamed, rank)?;

        if op.split.is_empty()
            && op.reversed.is_empty()
            && op.merge.is_empty()
            && op.new_names.as_ref().map_or(true, |nn| *nn == renamed)
        {
            return self.edge_rename(&op.rename);
        }

        // stage A: resolve splits into intermediate axes
        for name in op.split.keys() {
            if !renamed.contains(name) {
                return Err(Error::NameNotFound(name.to_string()));
            }
        }
        let mut splits: Vec<AxisSplit<S>> = Vec::with_capacity(rank);
        let mut inter: Vec<InterAxis<S, N>> = Vec::new();
        for (axis, name) in renamed.iter().enumerate() {
            let edge = self.edge(axis);
            let (sub_names, sub_edges): (Vec<N>, Vec<Edge<S>>) = match op.split.get(name) {
                Some(subs) => subs
                    .iter()
                    .map(|(sub_name, segments)| {
                        (
                            sub_name.clone(),
                            Edge::with_arrow(segments.clone(), edge.arrow()),
                        )
                    })
                    .unzip(),
                None => (vec![name.clone()], vec![edge.clone()]),
            };
            let layout = MergeLayout::new(&sub_edges, edge.arrow());
            if !layout.merged().same_charge_dims(edge) {
                return Err(Error::SplitMismatch(name.to_string()));
            }
            splits.push(AxisSplit {
                layout,
                first_inter: inter.len(),
                sub_count: sub_edges.len(),
                sign_gate: S::IS_FERMI && (op.apply_parity ^ op.exclude_split.contains(name)),
            });
            for (sub_name, sub_edge) in sub_names.into_iter().zip(sub_edges) {
                inter.push(InterAxis {
                    name: sub_name,
                    edge: sub_edge,
                    reversed_before: false,
                    before_sign: false,
                    reversed_after: false,
                    after_sign: false,
                });
            }
        }
        let inter_rank = inter.len();
        {
            let names: Vec<N> = inter.iter().map(|a| a.name.clone()).collect();
            check_valid_names(&names, inter_rank)?;
        }
        let axis_by_name: BTreeMap<N, usize> = inter
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name.clone(), i))
            .collect();

        // stage B: pre-transpose reversal, relabelling charges
        for name in &op.reversed {
            let &axis = axis_by_name
                .get(name)
                .ok_or_else(|| Error::NameNotFound(name.to_string()))?;
            if S::IS_FERMI {
                let a = &mut inter[axis];
                a.reversed_before = true;
                a.before_sign =
                    op.apply_parity ^ op.exclude_reverse_before.contains(name);
                a.edge = a.edge.negated().reversed();
            }
        }

        // stage C: parse the output order into transposed slots and
        // merge-group runs
        let mut member_of: BTreeMap<N, N> = BTreeMap::new();
        for (merged_name, members) in &op.merge {
            for member in members {
                if !axis_by_name.contains_key(member) {
                    return Err(Error::NameNotFound(member.to_string()));
                }
                if member_of.insert(member.clone(), merged_name.clone()).is_some() {
                    return Err(Error::DuplicateName(member.to_string()));
                }
            }
        }
        let default_order: Vec<N>;
        let order: &[N] = match &op.new_names {
            Some(names) => names,
            None => {
                let mut names: Vec<N> = inter.iter().map(|a| a.name.clone()).collect();
                for (merged_name, members) in &op.merge {
                    if members.is_empty() {
                        names.push(merged_name.clone());
                    }
                }
                default_order = names;
                &default_order
            }
        };

        let mut slots: Vec<usize> = Vec::with_capacity(inter_rank);
        let mut out_axes: Vec<OutAxis<S, N>> = Vec::new();
        let mut cursor = 0usize;
        while cursor < order.len() {
            let entry = &order[cursor];
            if let Some(&axis) = axis_by_name.get(entry) {
                if let Some(merged_name) = member_of.get(entry) {
                    let members = &op.merge[merged_name];
                    if *entry != members[0] {
                        return Err(Error::MergeNotContiguous(merged_name.to_string()));
                    }
                    let mut member_axes = Vec::with_capacity(members.len());
                    for (i, member) in members.iter().enumerate() {
                        if order.get(cursor + i) != Some(member) {
                            return Err(Error::MergeNotContiguous(merged_name.to_string()));
                        }
                        member_axes.push(axis_by_name[member]);
                    }
                    cursor += members.len();
                    slots.extend(member_axes.iter().copied());
                    out_axes.push(OutAxis {
                        name: merged_name.clone(),
                        kind: OutKind::Merged {
                            members: member_axes,
                            // placeholder; layouts are built after stage D
                            layout: MergeLayout::new(&[], false),
                            sign_gate: false,
                        },
                    });
                } else {
                    slots.push(axis);
                    out_axes.push(OutAxis {
                        name: entry.clone(),
                        kind: OutKind::Single { inter: axis },
                    });
                    cursor += 1;
                }
            } else if op.merge.get(entry).is_some_and(|m| m.is_empty()) {
                out_axes.push(OutAxis {
                    name: entry.clone(),
                    kind: OutKind::Unit,
                });
                cursor += 1;
            } else {
                return Err(Error::NameNotFound(entry.to_string()));
            }
        }
        {
            let mut seen = vec![false; inter_rank];
            if slots.len() != inter_rank {
                return Err(Error::NotAPermutation);
            }
            for &axis in &slots {
                if seen[axis] {
                    return Err(Error::NotAPermutation);
                }
                seen[axis] = true;
            }
        }

        // stage D: align arrows inside each merge group
        for out_axis in &mut out_axes {
            if let OutKind::Merged { members, .. } = &out_axis.kind {
                if S::IS_FERMI && !members.is_empty() {
                    let target = inter[members[0]].edge.arrow();
                    for &member in &members[1..] {
                        if inter[member].edge.arrow() != target {
                            let a = &mut inter[member];
                            a.reversed_after = true;
                            a.after_sign = op.apply_parity
                                ^ op.exclude_reverse_after.contains(&a.name);
                            a.edge = a.edge.negated().reversed();
                        }
                    }
                }
            }
        }

        // stage E: merged layouts and output edges
        for out_axis in &mut out_axes {
            if let OutKind::Merged {
                members,
                layout,
                sign_gate,
            } = &mut out_axis.kind
            {
                let member_edges: Vec<Edge<S>> =
                    members.iter().map(|&m| inter[m].edge.clone()).collect();
                let arrow = member_edges.first().map(|e| e.arrow()).unwrap_or(false);
                *layout = MergeLayout::new(&member_edges, arrow);
                *sign_gate =
                    S::IS_FERMI && (op.apply_parity ^ op.exclude_merge.contains(&out_axis.name));
            }
        }
        let out_names: Vec<N> = out_axes.iter().map(|a| a.name.clone()).collect();
        let out_edges: Vec<Edge<S>> = out_axes
            .iter()
            .map(|a| match &a.kind {
                OutKind::Single { inter: i } => inter[*i].edge.clone(),
                OutKind::Merged { layout, .. } => layout.merged().clone(),
                OutKind::Unit => Edge::unit(),
            })
            .collect();
        check_valid_names(&out_names, out_edges.len())?;
        let mut out_core: Core<T, S> = Core::new(out_edges);

        // one pass over input blocks, one strided copy per contribution
        let src = self.storage();
        let mut slot_dims = vec![0usize; inter_rank];
        let mut slot_src_strides = vec![0usize; inter_rank];
        let mut slot_dst_strides = vec![0usize; inter_rank];
        let mut dst_stride_by_inter = vec![0usize; inter_rank];
        let mut inter_dims = vec![0usize; inter_rank];
        let mut inter_strides = vec![0usize; inter_rank];
        let mut inter_charges = vec![S::zero(); inter_rank];
        let mut inter_positions = vec![0usize; inter_rank];
        let mut inter_parities = vec![false; inter_rank];

        for block_index in 0..self.core().blocks().len() {
            let block = &self.core().blocks()[block_index];
            if block.size == 0 {
                continue;
            }
            let block_strides = row_major_strides(&block.dims);
            let choices: Vec<&[usize]> = (0..rank)
                .map(|axis| splits[axis].layout.combos_for(&block.charges[axis]))
                .collect();
            debug_assert!(choices.iter().all(|c| !c.is_empty()));

            let mut selection = vec![0usize; rank];
            loop {
                let mut sign = false;
                let mut src_base = block.offset;

                for axis in 0..rank {
                    let split = &splits[axis];
                    let combo = &split.layout.combos()[choices[axis][selection[axis]]];
                    if split.sign_gate {
                        sign ^= group_parity(combo.charges.iter().map(|q| q.parity()));
                    }
                    src_base += combo.offset * block_strides[axis];
                    let mut stride = block_strides[axis];
                    for child in (0..split.sub_count).rev() {
                        let idx = split.first_inter + child;
                        inter_strides[idx] = stride;
                        stride *= combo.dims[child];
                        inter_dims[idx] = combo.dims[child];
                        let charge = combo.charges[child];
                        let parity = charge.parity();
                        let axis_info = &inter[idx];
                        if (axis_info.reversed_before && axis_info.before_sign && parity)
                            ^ (axis_info.reversed_after && axis_info.after_sign && parity)
                        {
                            sign ^= true;
                        }
                        inter_charges[idx] = axis_info.relabelled(charge);
                        inter_positions[idx] = combo.positions[child];
                        inter_parities[idx] = parity;
                    }
                }

                // transpose sign: inverted pairs of fermion-odd axes
                for t2 in 1..slots.len() {
                    if !inter_parities[slots[t2]] {
                        continue;
                    }
                    for t1 in 0..t2 {
                        if slots[t1] > slots[t2] && inter_parities[slots[t1]] {
                            sign ^= true;
                        }
                    }
                }

                // destination block and slab
                let mut out_charges = Vec::with_capacity(out_axes.len());
                for out_axis in &out_axes {
                    let charge = match &out_axis.kind {
                        OutKind::Single { inter: i } => inter_charges[*i],
                        OutKind::Merged { members, .. } => members
                            .iter()
                            .fold(S::zero(), |acc, &m| acc + inter_charges[m]),
                        OutKind::Unit => S::zero(),
                    };
                    out_charges.push(charge);
                }
                let out_index = out_core
                    .find_by_charges(&out_charges)
                    .expect("conservation-allowed output block must exist");
                let out_info = &out_core.blocks()[out_index];
                let out_strides = row_major_strides(&out_info.dims);
                let mut dst_base = out_info.offset;

                for (out_pos, out_axis) in out_axes.iter().enumerate() {
                    match &out_axis.kind {
                        OutKind::Single { inter: i } => {
                            dst_stride_by_inter[*i] = out_strides[out_pos];
                        }
                        OutKind::Merged {
                            members,
                            layout,
                            sign_gate,
                        } => {
                            if *sign_gate {
                                sign ^= group_parity(
                                    members.iter().map(|&m| inter_parities[m]),
                                );
                            }
                            let positions: Vec<usize> =
                                members.iter().map(|&m| inter_positions[m]).collect();
                            let combo = layout
                                .combo_by_positions(&positions)
                                .expect("merge combination must exist");
                            dst_base += combo.offset * out_strides[out_pos];
                            let mut stride = out_strides[out_pos];
                            for &member in members.iter().rev() {
                                dst_stride_by_inter[member] = stride;
                                stride *= inter_dims[member];
                            }
                        }
                        OutKind::Unit => {}
                    }
                }

                for (slot, &axis) in slots.iter().enumerate() {
                    slot_dims[slot] = inter_dims[axis];
                    slot_src_strides[slot] = inter_strides[axis];
                    slot_dst_strides[slot] = dst_stride_by_inter[axis];
                }

                let factor = if sign { -T::one() } else { T::one() };
                permuted_copy(
                    src,
                    out_core.storage_mut(),
                    &slot_dims[..slots.len()],
                    &slot_src_strides[..slots.len()],
                    &slot_dst_strides[..slots.len()],
                    src_base,
                    dst_base,
                    factor,
                );

                // next combination of split slabs
                let mut axis = rank;
                loop {
                    if axis == 0 {
                        selection.clear();
                        break;
                    }
                    axis -= 1;
                    selection[axis] += 1;
                    if selection[axis] < choices[axis].len() {
                        break;
                    }
                    selection[axis] = 0;
                    if axis == 0 {
                        selection.clear();
                        break;
                    }
                }
                if selection.is_empty() {
                    break;
                }
            }
        }

        Tensor::from_core(out_names, out_core)
    }

    /// Transpose to the given name order.
    pub fn transpose(&self, order: &[N]) -> Result<Self> {
        self.edge_operator(&EdgeOperation::new().output_order(order.to_vec()))
    }

    /// Flip the arrows of the named edges.
    pub fn reverse_edge(
        &self,
        names: &BTreeSet<N>,
        apply_parity: bool,
        exclude: &BTreeSet<N>,
    ) -> Result<Self> {
        self.edge_operator(
            &EdgeOperation::new()
                .reverse(names.iter().cloned())
                .with_parity(apply_parity)
                .exclude_reverse_before(exclude.iter().cloned()),
        )
    }

    /// Merge groups of edges.
    ///
    /// Each group's members are moved, in declared order, to the position
    /// of the group's last member; other edges stay in place.
    pub fn merge_edge(
        &self,
        merge: &BTreeMap<N, Vec<N>>,
        apply_parity: bool,
        exclude_merge: &BTreeSet<N>,
        exclude_reverse: &BTreeSet<N>,
    ) -> Result<Self> {
        let mut member_group: BTreeMap<&N, &N> = BTreeMap::new();
        for (group, members) in merge {
            for member in members {
                member_group.insert(member, group);
            }
        }
        let mut order: Vec<N> = Vec::with_capacity(self.rank());
        for (position, name) in self.names().iter().enumerate() {
            match member_group.get(name) {
                Some(&group) => {
                    let members = &merge[group];
                    let last = members
                        .iter()
                        .filter_map(|m| self.axis_of(m).ok())
                        .max()
                        .unwrap_or(position);
                    if position == last {
                        order.extend(members.iter().cloned());
                    }
                }
                None => order.push(name.clone()),
            }
        }
        for (group, members) in merge {
            if members.is_empty() {
                order.push(group.clone());
            }
        }
        let mut op = EdgeOperation::new()
            .output_order(order)
            .with_parity(apply_parity)
            .exclude_merge(exclude_merge.iter().cloned())
            .exclude_reverse_after(exclude_reverse.iter().cloned());
        for (group, members) in merge {
            op = op.merge(group.clone(), members.clone());
        }
        self.edge_operator(&op)
    }

    /// Split edges into the given sub-edges, keeping the post-split order.
    pub fn split_edge(
        &self,
        split: &BTreeMap<N, Vec<(N, Vec<(S, usize)>)>>,
        apply_parity: bool,
        exclude_split: &BTreeSet<N>,
    ) -> Result<Self> {
        let mut op = EdgeOperation::new()
            .with_parity(apply_parity)
            .exclude_split(exclude_split.iter().cloned());
        for (name, subs) in split {
            op = op.split(name.clone(), subs.clone());
        }
        self.edge_operator(&op)
    }
}

/// Strided copy `dst[dst_base + i·dst_strides] = factor · src[src_base +
/// i·src_strides]`, iterating in destination order (last axis fastest).
#[allow(clippy::too_many_arguments)]
fn permuted_copy<T: Scalar>(
    src: &[T],
    dst: &mut [T],
    dims: &[usize],
    src_strides: &[usize],
    dst_strides: &[usize],
    src_base: usize,
    dst_base: usize,
    factor: T,
) {
    let total: usize = dims.iter().product();
    if total == 0 {
        return;
    }
    let rank = dims.len();
    let mut index = vec![0usize; rank];
    let mut src_offset = src_base;
    let mut dst_offset = dst_base;
    for _ in 0..total {
        dst[dst_offset] = factor * src[src_offset];
        for axis in (0..rank).rev() {
            index[axis] += 1;
            src_offset += src_strides[axis];
            dst_offset += dst_strides[axis];
            if index[axis] < dims[axis] {
                break;
            }
            index[axis] = 0;
            src_offset -= src_strides[axis] * dims[axis];
            dst_offset -= dst_strides[axis] * dims[axis];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{ParitySymmetry, Z2Symmetry};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn transpose_moves_blocks() {
        let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
            names(&["i", "j"]),
            vec![
                Edge::new(vec![(Z2Symmetry(false), 2), (Z2Symmetry(true), 1)]),
                Edge::new(vec![(Z2Symmetry(false), 3), (Z2Symmetry(true), 2)]),
            ],
        )
        .unwrap();
        t.range(0.0, 1.0);

        let u = t.transpose(&names(&["j", "i"])).unwrap();
        assert_eq!(u.names(), &names(&["j", "i"])[..]);
        for (charges, i, j) in [
            ((Z2Symmetry(false), Z2Symmetry(false)), 2usize, 3usize),
            ((Z2Symmetry(true), Z2Symmetry(true)), 1, 2),
        ] {
            let orig = t.block_by_charges(&[charges.0, charges.1]).unwrap();
            let moved = u.block_by_charges(&[charges.1, charges.0]).unwrap();
            for a in 0..i {
                for b in 0..j {
                    assert_eq!(orig.data[a * j + b], moved.data[b * i + a]);
                }
            }
        }
    }

    #[test]
    fn fermionic_swap_sign() {
        let mut t: Tensor<f64, ParitySymmetry> = Tensor::new(
            names(&["i", "j"]),
            vec![
                Edge::with_arrow(
                    vec![(ParitySymmetry(true), 1), (ParitySymmetry(false), 1)],
                    true,
                ),
                Edge::with_arrow(
                    vec![(ParitySymmetry(true), 1), (ParitySymmetry(false), 1)],
                    false,
                ),
            ],
        )
        .unwrap();
        t.set(|| 1.0);

        let u = t.transpose(&names(&["j", "i"])).unwrap();
        let odd = u
            .block_by_charges(&[ParitySymmetry(true), ParitySymmetry(true)])
            .unwrap();
        assert_eq!(odd.data, &[-1.0]);
        let even = u
            .block_by_charges(&[ParitySymmetry(false), ParitySymmetry(false)])
            .unwrap();
        assert_eq!(even.data, &[1.0]);
    }

    #[test]
    fn split_to_no_edge_drops_unit_edges() {
        let mut t: Tensor<f64, Z2Symmetry> = Tensor::new(
            names(&["i", "j"]),
            vec![
                Edge::new(vec![(Z2Symmetry(false), 2), (Z2Symmetry(true), 2)]),
                Edge::new(vec![(Z2Symmetry(false), 1)]),
            ],
        )
        .unwrap();
        t.range(0.0, 1.0);

        let split: BTreeMap<String, Vec<(String, Vec<(Z2Symmetry, usize)>)>> = [
            (
                "i".to_string(),
                vec![(
                    "k".to_string(),
                    vec![(Z2Symmetry(false), 2), (Z2Symmetry(true), 2)],
                )],
            ),
            ("j".to_string(), vec![]),
        ]
        .into_iter()
        .collect();
        let u = t.split_edge(&split, false, &BTreeSet::new()).unwrap();
        assert_eq!(u.rank(), 1);
        assert_eq!(u.names(), &["k".to_string()][..]);
        assert_eq!(u.storage(), t.storage());
    }

    #[test]
    fn identity_order_is_pure_rename() {
        let t: Tensor<f64, Z2Symmetry> = Tensor::new(
            names(&["i", "j"]),
            vec![Edge::trivial(2), Edge::trivial(3)],
        )
        .unwrap();
        let same = t.transpose(&names(&["i", "j"])).unwrap();
        assert!(same.is_shared());
    }
}
