use crate::bounding_volume::Aabb;
use crate::query::Ray;

use super::{
    BvhVolume, PartitionStrategy, QuantizedBvhValidationError, QuantizedNode, QuantizedTree,
    RayHits,
};

/// A quantized bounding volume hierarchy over the objects of a [`BvhVolume`].
///
/// The hierarchy is built from a snapshot of the AABBs of the volume’s objects and answers
/// segment queries: see [`QuantizedBvh::ray_test`] and [`QuantizedBvh::ray_hits`]. It does not
/// track modifications of the volume: call [`QuantizedBvh::rebuild`] after the objects moved.
///
/// Building requires exclusive access (`&mut self`) while queries only borrow the BVH, so a BVH
/// cannot be rebuilt while a query is running. The tree itself is replaced as a whole at the end
/// of each build; use [`QuantizedBvh::tree`] to keep a snapshot around.
#[derive(Clone, Debug)]
pub struct QuantizedBvh<V> {
    volume: Option<V>,
    strategy: PartitionStrategy,
    tree: QuantizedTree,
}

impl<V> Default for QuantizedBvh<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> QuantizedBvh<V> {
    /// An empty BVH, not attached to any volume.
    pub fn new() -> Self {
        Self::with_strategy(PartitionStrategy::default())
    }

    /// An empty BVH that will split its nodes with the given `strategy`.
    pub fn with_strategy(strategy: PartitionStrategy) -> Self {
        Self {
            volume: None,
            strategy,
            tree: QuantizedTree::empty(),
        }
    }

    /// The volume this BVH was last built from, if any.
    #[inline]
    pub fn volume(&self) -> Option<&V> {
        self.volume.as_ref()
    }

    /// Mutable access to the volume this BVH was last built from, if any.
    ///
    /// Modifications of the volume are only taken into account by the next call to
    /// [`QuantizedBvh::rebuild`].
    #[inline]
    pub fn volume_mut(&mut self) -> Option<&mut V> {
        self.volume.as_mut()
    }

    /// The strategy used to split the nodes of this BVH.
    #[inline]
    pub fn strategy(&self) -> PartitionStrategy {
        self.strategy
    }

    /// Sets the strategy used by the next builds.
    ///
    /// The current tree is left untouched.
    #[inline]
    pub fn set_strategy(&mut self, strategy: PartitionStrategy) {
        self.strategy = strategy;
    }

    /// The tree built by the last call to [`QuantizedBvh::build`] or [`QuantizedBvh::rebuild`].
    #[inline]
    pub fn tree(&self) -> &QuantizedTree {
        &self.tree
    }

    /// The nodes of the current tree, in depth-first pre-order.
    #[inline]
    pub fn nodes(&self) -> &[QuantizedNode] {
        self.tree.nodes()
    }

    /// The number of nodes of the current tree.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// The number of leaves of the current tree.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.tree.leaf_count()
    }

    /// Does the current tree have no node?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The union of the AABBs the current tree was built from.
    ///
    /// This is [`Aabb::new_invalid`] if the tree is empty.
    #[inline]
    pub fn bounding_box(&self) -> Aabb {
        self.tree.bounding_box()
    }

    /// Detaches the volume from this BVH and clears its tree.
    pub fn clear(&mut self) -> Option<V> {
        self.tree = QuantizedTree::empty();
        self.volume.take()
    }

    /// Iterates through the objects whose bounds are hit by the segment covered by `ray`.
    ///
    /// See [`QuantizedTree::ray_hits`].
    #[inline]
    pub fn ray_hits(&self, ray: &Ray) -> RayHits<'_> {
        self.tree.ray_hits(ray)
    }

    /// Calls `callback` for each object whose bounds are hit by the segment covered by `ray`,
    /// until it returns `false`.
    ///
    /// Returns `true` if and only if the traversal was stopped by the callback. See
    /// [`QuantizedTree::ray_test`].
    #[inline]
    pub fn ray_test(&self, ray: &Ray, callback: impl FnMut(u32, &Ray) -> bool) -> bool {
        self.tree.ray_test(ray, callback)
    }
}

impl<V: BvhVolume> QuantizedBvh<V> {
    /// Attaches `volume` to this BVH and builds the tree from its objects.
    ///
    /// Any previously attached volume is dropped and the previous tree is replaced.
    pub fn build(&mut self, volume: V) {
        self.tree = QuantizedTree::from_volume(&volume, self.strategy);
        self.volume = Some(volume);
    }

    /// Rebuilds the tree from the current AABBs of the attached volume.
    ///
    /// The result is identical to what [`QuantizedBvh::build`] would produce for the same
    /// objects. Does nothing if no volume is attached.
    pub fn rebuild(&mut self) {
        debug_assert!(
            self.volume.is_some(),
            "Cannot rebuild a quantized BVH that was never built."
        );

        if let Some(volume) = &self.volume {
            self.tree = QuantizedTree::from_volume(volume, self.strategy);
        } else {
            log::warn!("Ignoring the rebuild of a quantized BVH without volume.");
        }
    }

    /// Checks that the current tree is well-formed and that its leaves reference exactly the
    /// objects of the attached volume with a valid AABB.
    ///
    /// A BVH without volume only checks that its tree is well-formed.
    pub fn check_well_formed(&self) -> Result<(), QuantizedBvhValidationError> {
        match &self.volume {
            Some(volume) => self.tree.check_leaves_match(volume),
            None => self.tree.check_well_formed(),
        }
    }
}
