use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::bounding_volume::Aabb;

use super::node::QuantizedNode;
use super::Quantizer;

/// An immutable quantized bounding volume hierarchy.
///
/// The nodes are stored in a flat array in depth-first pre-order: the root first, then its
/// whole left subtree, then its whole right subtree. An internal node is therefore always
/// immediately followed by its first child, and the node following its subtree can be reached
/// in constant time through [`QuantizedNode::escape_offset`].
///
/// A tree is produced as a whole by [`QuantizedTree::from_volume`] and never modified
/// afterwards. It can be cloned or shared between threads as a consistent snapshot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuantizedTree {
    pub(super) aabb: Aabb,
    pub(super) quantizer: Quantizer,
    pub(super) nodes: Vec<QuantizedNode>,
    pub(super) leaf_count: usize,
}

impl Default for QuantizedTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl QuantizedTree {
    /// A tree without any node.
    pub fn empty() -> Self {
        Self {
            aabb: Aabb::new_invalid(),
            quantizer: Quantizer::default(),
            nodes: Vec::new(),
            leaf_count: 0,
        }
    }

    /// The union of the AABBs of all the objects this tree was built from.
    ///
    /// This is [`Aabb::new_invalid`] if the tree is empty.
    #[inline]
    pub fn bounding_box(&self) -> Aabb {
        self.aabb
    }

    /// The quantizer mapping node bounds to the space of the input AABBs.
    #[inline]
    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// The nodes of this tree, in depth-first pre-order.
    #[inline]
    pub fn nodes(&self) -> &[QuantizedNode] {
        &self.nodes
    }

    /// The number of nodes (leaves included) of this tree.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The number of leaves of this tree.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Does this tree have no node at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The bounds of the `i`-th node, mapped back to the space of the input AABBs.
    ///
    /// Because of quantization, this may be larger than the union of the AABBs of the objects
    /// under that node by up to one quantization step along each axis.
    #[inline]
    pub fn node_aabb(&self, i: usize) -> Aabb {
        let node = &self.nodes[i];
        self.quantizer.dequantize_aabb(&node.mins, &node.maxs)
    }

    /// Iterates through the object indices referenced by the leaves of this tree, in depth-first
    /// order.
    pub fn leaves(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.iter().filter_map(|node| node.object_index())
    }

    /// The number of nodes on the longest path from the root to a leaf.
    ///
    /// This is `0` for an empty tree and `1` for a tree with a single leaf.
    pub fn depth(&self) -> usize {
        // Pending subtree ends along the current path.
        let mut path_ends: SmallVec<[usize; 32]> = SmallVec::new();
        let mut max_depth = 0;

        for (i, node) in self.nodes.iter().enumerate() {
            while path_ends.last().is_some_and(|end| *end <= i) {
                let _ = path_ends.pop();
            }

            max_depth = max_depth.max(path_ends.len() + 1);
            path_ends.push(i + node.escape_offset());
        }

        max_depth
    }
}
