use alloc::vec;

use super::{read_volume, BvhVolume, QuantizedTree};

/// Defects that can be found in a [`QuantizedTree`] by
/// [`QuantizedTree::check_well_formed`].
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum QuantizedBvhValidationError {
    /// The subtree of an internal node reaches past the end of the node array.
    #[error("the subtree of node {node} reaches past the end of the node array")]
    SkipOffsetOutOfRange {
        /// The index of the faulty node.
        node: usize,
    },
    /// The skip offset of an internal node doesn’t match the size of its subtree.
    #[error("node {node} skips {expected} nodes but its subtree contains {actual} nodes")]
    SkipOffsetMismatch {
        /// The index of the faulty node.
        node: usize,
        /// The subtree size encoded in the node.
        expected: usize,
        /// The subtree size obtained by counting the descendants of the node.
        actual: usize,
    },
    /// The bounds of an internal node aren’t the union of the bounds of its children.
    #[error("the bounds of node {node} are not the union of the bounds of its children")]
    InvalidBounds {
        /// The index of the faulty node.
        node: usize,
    },
    /// The same object is referenced by more than one leaf.
    #[error("object {object} is referenced by more than one leaf")]
    DuplicateLeaf {
        /// The index of the object.
        object: u32,
    },
    /// An object with a valid AABB isn’t referenced by any leaf.
    #[error("object {object} has a valid AABB but is not referenced by any leaf")]
    MissingLeaf {
        /// The index of the object.
        object: u32,
    },
    /// A leaf references an object that doesn’t exist or has an invalid AABB.
    #[error("object {object} is referenced by a leaf but is not a valid object of the volume")]
    UnexpectedLeaf {
        /// The index of the object.
        object: u32,
    },
    /// The number of leaves doesn’t match the leaf count recorded at build time.
    #[error("the tree contains {actual} leaves instead of {expected}")]
    LeafCountMismatch {
        /// The recorded leaf count.
        expected: usize,
        /// The number of leaves found in the node array.
        actual: usize,
    },
    /// Some nodes are not part of the subtree of the root.
    #[error("{count} nodes follow the subtree of the root")]
    TrailingNodes {
        /// The number of nodes after the subtree of the root.
        count: usize,
    },
}

impl QuantizedTree {
    /// Checks that this tree is topologically and geometrically correct.
    ///
    /// The tree is well-formed if the subtree of the root spans the whole node array, if every
    /// skip offset is equal to the size of the corresponding subtree, if the bounds of every
    /// internal node are the union of those of its children, and if no object is referenced
    /// twice.
    pub fn check_well_formed(&self) -> Result<(), QuantizedBvhValidationError> {
        if self.nodes.is_empty() {
            return if self.leaf_count == 0 {
                Ok(())
            } else {
                Err(QuantizedBvhValidationError::LeafCountMismatch {
                    expected: self.leaf_count,
                    actual: 0,
                })
            };
        }

        let root_end = self.check_subtree(0)?;
        if root_end != self.nodes.len() {
            return Err(QuantizedBvhValidationError::TrailingNodes {
                count: self.nodes.len() - root_end,
            });
        }

        let max_object = self.leaves().max().unwrap_or(0) as usize;
        let mut seen = vec![false; max_object + 1];
        let mut actual = 0;

        for object in self.leaves() {
            if core::mem::replace(&mut seen[object as usize], true) {
                return Err(QuantizedBvhValidationError::DuplicateLeaf { object });
            }
            actual += 1;
        }

        if actual != self.leaf_count {
            return Err(QuantizedBvhValidationError::LeafCountMismatch {
                expected: self.leaf_count,
                actual,
            });
        }

        Ok(())
    }

    /// Checks that this tree is well-formed, and that its leaves reference exactly the objects
    /// of `volume` with a valid AABB.
    ///
    /// The volume is read between calls to its acquire/release hooks.
    pub fn check_leaves_match<V: BvhVolume + ?Sized>(
        &self,
        volume: &V,
    ) -> Result<(), QuantizedBvhValidationError> {
        self.check_well_formed()?;

        let (_, valid) = read_volume(volume);
        let object_count = valid.last().map(|(object, _)| *object as usize + 1);
        let mut expected = vec![false; object_count.unwrap_or(0)];
        let mut referenced = expected.clone();

        for (object, _) in &valid {
            expected[*object as usize] = true;
        }

        for object in self.leaves() {
            match expected.get(object as usize) {
                Some(true) => referenced[object as usize] = true,
                _ => return Err(QuantizedBvhValidationError::UnexpectedLeaf { object }),
            }
        }

        for (object, _) in &valid {
            if !referenced[*object as usize] {
                return Err(QuantizedBvhValidationError::MissingLeaf { object: *object });
            }
        }

        Ok(())
    }

    /// Panics if the tree isn’t well-formed.
    ///
    /// This is mostly a utility for debugging.
    pub fn assert_well_formed(&self) {
        if let Err(err) = self.check_well_formed() {
            panic!("Malformed quantized BVH: {}", err);
        }
    }

    /// Checks the subtree rooted at `id` and returns the index of the node following it.
    fn check_subtree(&self, id: usize) -> Result<usize, QuantizedBvhValidationError> {
        let node = &self.nodes[id];

        if node.is_leaf() {
            return Ok(id + 1);
        }

        let expected = node.escape_offset();
        // An internal node has two children so its subtree has at least three nodes.
        if expected < 3 || id + expected > self.nodes.len() {
            return Err(QuantizedBvhValidationError::SkipOffsetOutOfRange { node: id });
        }

        let left_id = id + 1;
        let right_id = self.check_subtree(left_id)?;
        if right_id >= id + expected {
            return Err(QuantizedBvhValidationError::SkipOffsetMismatch {
                node: id,
                expected,
                actual: right_id - id,
            });
        }

        let end = self.check_subtree(right_id)?;
        if end != id + expected {
            return Err(QuantizedBvhValidationError::SkipOffsetMismatch {
                node: id,
                expected,
                actual: end - id,
            });
        }

        let (left, right) = (&self.nodes[left_id], &self.nodes[right_id]);
        let mut union = *node;
        union.set_bounds_to_union(left, right);
        if union != *node || !node.contains(left) || !node.contains(right) {
            return Err(QuantizedBvhValidationError::InvalidBounds { node: id });
        }

        Ok(end)
    }
}
