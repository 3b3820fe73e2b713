/// The maximum number of leaves a [`QuantizedTree`](super::QuantizedTree) can be built from.
///
/// A tree with `n` leaves has `2n - 1` nodes, so keeping `n` below half the `i32` range keeps
/// every skip offset representable in the signed field of [`QuantizedNode`].
pub const MAX_NODE_COUNT: usize = (i32::MAX as usize) >> 1;

/// Can a tree with `leaf_count` leaves be represented?
#[inline]
pub(super) fn fits_in_budget(leaf_count: usize) -> bool {
    leaf_count < MAX_NODE_COUNT
}

/// The largest coordinate of the quantized space.
pub const QUANTIZED_MAX: u16 = u16::MAX;

/// A node of a quantized BVH, either a leaf or an internal node.
///
/// Bounds are stored as 16-bit fixed-point coordinates relative to the tree’s
/// [`Quantizer`](super::Quantizer). The last field is interpreted according to its sign:
/// a non-negative value is the index of the object referenced by a leaf, a non-positive value
/// is the negated size of the subtree rooted at an internal node (the node itself included).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
#[repr(C)]
pub struct QuantizedNode {
    pub(super) mins: [u16; 3],
    pub(super) maxs: [u16; 3],
    pub(super) data: i32,
}

static_assertions::const_assert_eq!(size_of::<QuantizedNode>(), 16);

impl QuantizedNode {
    /// A leaf referencing the object `object_index`, bounded by `mins` and `maxs`.
    ///
    /// Returns `None` if `object_index` doesn’t fit in the non-negative range of the data field.
    #[inline]
    pub(super) fn leaf(mins: [u16; 3], maxs: [u16; 3], object_index: u32) -> Option<Self> {
        let data = i32::try_from(object_index).ok()?;
        Some(Self { mins, maxs, data })
    }

    /// An internal node whose bounds and skip offset are yet to be set.
    #[inline]
    pub(super) fn placeholder() -> Self {
        Self {
            mins: [QUANTIZED_MAX; 3],
            maxs: [0; 3],
            data: 0,
        }
    }

    /// The quantized minimum corner of this node’s bounds.
    #[inline]
    pub fn mins(&self) -> [u16; 3] {
        self.mins
    }

    /// The quantized maximum corner of this node’s bounds.
    #[inline]
    pub fn maxs(&self) -> [u16; 3] {
        self.maxs
    }

    /// Is this node a leaf?
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.data >= 0
    }

    /// The index of the object referenced by this node, if it is a leaf.
    #[inline]
    pub fn object_index(&self) -> Option<u32> {
        if self.is_leaf() {
            Some(self.data as u32)
        } else {
            None
        }
    }

    /// The negated number of nodes in the subtree rooted at this node, if it is an internal
    /// node.
    ///
    /// Subtracting this value from the index of this node gives the index of the first node
    /// following its subtree.
    #[inline]
    pub fn negative_subtree_size(&self) -> Option<i32> {
        if self.is_leaf() {
            None
        } else {
            Some(self.data)
        }
    }

    /// The number of array slots to advance to get past this node’s subtree.
    ///
    /// This is `1` for a leaf.
    #[inline]
    pub fn escape_offset(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.data.unsigned_abs() as usize
        }
    }

    /// Does the quantized box `[mins, maxs]` overlap this node’s bounds?
    ///
    /// Boxes touching along a face are considered overlapping.
    #[inline]
    pub fn overlaps(&self, mins: &[u16; 3], maxs: &[u16; 3]) -> bool {
        !(self.mins[0] > maxs[0]
            || self.maxs[0] < mins[0]
            || self.mins[1] > maxs[1]
            || self.maxs[1] < mins[1]
            || self.mins[2] > maxs[2]
            || self.maxs[2] < mins[2])
    }

    /// Sets this node’s bounds to the union of the bounds of `a` and `b`.
    #[inline]
    pub(super) fn set_bounds_to_union(&mut self, a: &QuantizedNode, b: &QuantizedNode) {
        for i in 0..3 {
            self.mins[i] = a.mins[i].min(b.mins[i]);
            self.maxs[i] = a.maxs[i].max(b.maxs[i]);
        }
    }

    /// Does this node bound `other`?
    #[inline]
    pub(super) fn contains(&self, other: &QuantizedNode) -> bool {
        (0..3).all(|i| self.mins[i] <= other.mins[i] && self.maxs[i] >= other.maxs[i])
    }

    /// The sum `mins + maxs` along `axis`, i.e., twice the center of this node along `axis`.
    #[inline]
    pub(super) fn doubled_center(&self, axis: usize) -> i32 {
        self.mins[axis] as i32 + self.maxs[axis] as i32
    }
}

#[cfg(test)]
mod test {
    use super::QuantizedNode;

    #[test]
    fn leaf_and_internal_discrimination() {
        let leaf = QuantizedNode::leaf([0; 3], [10; 3], 7).unwrap();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.object_index(), Some(7));
        assert_eq!(leaf.negative_subtree_size(), None);
        assert_eq!(leaf.escape_offset(), 1);

        let mut internal = QuantizedNode::placeholder();
        internal.data = -5;
        assert!(!internal.is_leaf());
        assert_eq!(internal.object_index(), None);
        assert_eq!(internal.negative_subtree_size(), Some(-5));
        assert_eq!(internal.escape_offset(), 5);
    }

    #[test]
    fn object_indices_must_stay_non_negative() {
        let max = i32::MAX as u32;
        assert_eq!(
            QuantizedNode::leaf([0; 3], [1; 3], max).and_then(|l| l.object_index()),
            Some(max)
        );
        assert_eq!(QuantizedNode::leaf([0; 3], [1; 3], max + 1), None);
        assert_eq!(QuantizedNode::leaf([0; 3], [1; 3], u32::MAX), None);
    }

    #[test]
    fn quantized_overlap_is_inclusive() {
        let node = QuantizedNode::leaf([10, 10, 10], [20, 20, 20], 0).unwrap();
        assert!(node.overlaps(&[20, 20, 20], &[30, 30, 30]));
        assert!(node.overlaps(&[0, 0, 0], &[10, 10, 10]));
        assert!(!node.overlaps(&[21, 0, 0], &[30, 30, 30]));
        assert!(!node.overlaps(&[0, 0, 0], &[30, 30, 9]));
    }
}
