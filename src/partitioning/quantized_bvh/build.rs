use alloc::vec::Vec;

use crate::bounding_volume::{Aabb, BoundingVolume};

use super::node::{fits_in_budget, QuantizedNode, MAX_NODE_COUNT};
use super::{BvhVolume, QuantizedTree, Quantizer};

/// The strategy used to split a set of leaves in two during the construction of a
/// [`QuantizedTree`].
///
/// Both strategies pick the split axis the same way (the axis along which the leaf centers
/// deviate the most from their mean), and both produce valid trees. They are not
/// interchangeable when bit-exact reproducibility of the node array matters.
#[derive(Default, Clone, Debug, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PartitionStrategy {
    /// The leaves are sorted along the split axis and split into two halves of equal size.
    ///
    /// This yields perfectly balanced trees.
    #[default]
    FullSort,
    /// The leaves are split around the mean of their centers without sorting.
    ///
    /// If this results in a side having less than about a third of the leaves, the split falls
    /// back to two halves of equal size.
    MeanSplit,
}

/// Calls [`BvhVolume::release`] when dropped.
struct VolumeGuard<'a, V: BvhVolume + ?Sized>(&'a V);

impl<'a, V: BvhVolume + ?Sized> VolumeGuard<'a, V> {
    fn acquire(volume: &'a V) -> Self {
        volume.acquire();
        Self(volume)
    }
}

impl<V: BvhVolume + ?Sized> Drop for VolumeGuard<'_, V> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// The largest object count a volume can report. Leaves store object indices in an `i32`.
const MAX_OBJECT_COUNT: u32 = i32::MAX as u32;

/// Reads the valid AABBs of `volume`, bracketed by its acquire/release hooks.
///
/// Returns the union of all valid AABBs together with the valid AABBs and their object index.
/// A volume reporting more than `i32::MAX` objects is read as an empty volume, without any
/// call to [`BvhVolume::object_aabb`].
pub(super) fn read_volume<V: BvhVolume + ?Sized>(volume: &V) -> (Aabb, Vec<(u32, Aabb)>) {
    let _guard = VolumeGuard::acquire(volume);

    let object_count = volume.object_count();
    let mut aabb = Aabb::new_invalid();
    let mut leaves = Vec::new();

    if object_count > MAX_OBJECT_COUNT {
        log::warn!(
            "Ignoring a volume with {} objects: at most {} objects are supported.",
            object_count,
            MAX_OBJECT_COUNT
        );
        return (aabb, leaves);
    }

    for i in 0..object_count {
        let object_aabb = volume.object_aabb(i);

        if object_aabb.is_valid() {
            aabb.merge(&object_aabb);
            leaves.push((i, object_aabb));
        } else {
            log::trace!("Skipping object {} with invalid AABB {:?}.", i, object_aabb);
        }
    }

    (aabb, leaves)
}

impl QuantizedTree {
    /// Builds a tree from the valid AABBs of `volume`.
    ///
    /// The volume is read between one call to [`BvhVolume::acquire`] and one call to
    /// [`BvhVolume::release`]. The resulting tree is empty if `volume` has no object with a valid
    /// AABB, or if it has [`MAX_NODE_COUNT`] of them or more.
    pub fn from_volume<V: BvhVolume + ?Sized>(volume: &V, strategy: PartitionStrategy) -> Self {
        let (aabb, leaves) = read_volume(volume);
        Self::from_leaves(aabb, &leaves, strategy)
    }

    /// Builds a tree from a set of leaves bounded by `aabb`.
    pub(super) fn from_leaves(
        aabb: Aabb,
        leaves: &[(u32, Aabb)],
        strategy: PartitionStrategy,
    ) -> Self {
        if leaves.is_empty() {
            return Self::empty();
        }

        if !fits_in_budget(leaves.len()) {
            log::warn!(
                "Cannot build a quantized BVH from {} leaves: at most {} are supported.",
                leaves.len(),
                MAX_NODE_COUNT - 1
            );
            return Self::empty();
        }

        let quantizer = Quantizer::new(&aabb);
        let quantized_leaves: Option<Vec<_>> = leaves
            .iter()
            .map(|(object, leaf_aabb)| {
                let (mins, maxs) = quantizer.quantize_aabb(leaf_aabb);
                QuantizedNode::leaf(mins, maxs, *object)
            })
            .collect();
        let Some(mut quantized_leaves) = quantized_leaves else {
            log::warn!(
                "Cannot build a quantized BVH referencing object indices above {}.",
                MAX_OBJECT_COUNT
            );
            return Self::empty();
        };

        let mut nodes = Vec::with_capacity(leaves.len() * 2 - 1);
        build_subtree(&mut nodes, &mut quantized_leaves, strategy);

        log::debug!(
            "Built quantized BVH with {} leaves and {} nodes ({:?}).",
            leaves.len(),
            nodes.len(),
            strategy
        );

        Self {
            aabb,
            quantizer,
            nodes,
            leaf_count: leaves.len(),
        }
    }
}

/// Appends to `nodes` the subtree bounding all the given `leaves`, in depth-first pre-order.
///
/// The order of `leaves` is modified.
pub(super) fn build_subtree(
    nodes: &mut Vec<QuantizedNode>,
    leaves: &mut [QuantizedNode],
    strategy: PartitionStrategy,
) {
    debug_assert!(!leaves.is_empty());

    if leaves.len() == 1 {
        nodes.push(leaves[0]);
        return;
    }

    let (split_axis, doubled_mean) = select_split_axis(leaves);
    let split_index = match strategy {
        PartitionStrategy::FullSort => partition_sorted(leaves, split_axis),
        PartitionStrategy::MeanSplit => partition_around_mean(leaves, split_axis, doubled_mean),
    };
    debug_assert!(split_index > 0 && split_index < leaves.len());

    let my_id = nodes.len();
    nodes.push(QuantizedNode::placeholder());

    let (left_leaves, right_leaves) = leaves.split_at_mut(split_index);
    let left_id = nodes.len();
    build_subtree(nodes, left_leaves, strategy);
    let right_id = nodes.len();
    build_subtree(nodes, right_leaves, strategy);

    let (left, right) = (nodes[left_id], nodes[right_id]);
    let subtree_size = nodes.len() - my_id;
    let node = &mut nodes[my_id];
    node.set_bounds_to_union(&left, &right);
    // Cannot overflow: the number of nodes is bounded by `2 * MAX_NODE_COUNT`.
    node.data = -(subtree_size as i32);
}

/// Selects the axis along which the leaf centers are the most spread out.
///
/// Returns the axis together with twice the mean of the leaf centers along that axis.
pub(super) fn select_split_axis(leaves: &[QuantizedNode]) -> (usize, i64) {
    let count = leaves.len() as i64;
    let mut sums = [0i64; 3];

    for leaf in leaves {
        for (axis, sum) in sums.iter_mut().enumerate() {
            *sum += leaf.doubled_center(axis) as i64;
        }
    }

    let means = sums.map(|sum| sum / (count * 2));
    let mut deviations = [0i64; 3];

    for leaf in leaves {
        for (axis, deviation) in deviations.iter_mut().enumerate() {
            let center = (leaf.doubled_center(axis) >> 1) as i64;
            *deviation += (center - means[axis]).abs();
        }
    }

    let [d0, d1, d2] = deviations;
    let axis = if d0 < d1 {
        if d1 < d2 {
            2
        } else {
            1
        }
    } else if d0 < d2 {
        2
    } else {
        0
    };

    (axis, means[axis] * 2)
}

/// Sorts `leaves` by decreasing center along `axis` and splits them in two halves.
fn partition_sorted(leaves: &mut [QuantizedNode], axis: usize) -> usize {
    leaves.sort_by(|a, b| b.doubled_center(axis).cmp(&a.doubled_center(axis)));
    leaves.len() / 2
}

/// Moves to the front of `leaves` every leaf with a center along `axis` greater than the mean.
///
/// Falls back to splitting in two halves if this results in an unbalanced split.
fn partition_around_mean(leaves: &mut [QuantizedNode], axis: usize, doubled_mean: i64) -> usize {
    let mut split_index = 0;

    for i in 0..leaves.len() {
        if leaves[i].doubled_center(axis) as i64 > doubled_mean {
            leaves.swap(i, split_index);
            split_index += 1;
        }
    }

    let count = leaves.len();
    let balanced_range_min = count / 3;
    let balanced_range_max = count - balanced_range_min - 1;

    if split_index <= balanced_range_min || split_index >= balanced_range_max {
        count / 2
    } else {
        split_index
    }
}
