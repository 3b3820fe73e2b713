use core::iter::FusedIterator;

use crate::bounding_volume::Aabb;
use crate::query::{Ray, RayCast};

use super::QuantizedTree;

/// Iterator through the objects of a [`QuantizedTree`] hit by a ray.
///
/// Created by [`QuantizedTree::ray_hits`]. Hits are yielded in the depth-first order of the
/// tree, which is unrelated to their distance along the ray.
#[derive(Clone, Debug)]
pub struct RayHits<'a> {
    tree: &'a QuantizedTree,
    ray: Ray,
    ray_mins: [u16; 3],
    ray_maxs: [u16; 3],
    cursor: usize,
}

impl<'a> RayHits<'a> {
    fn new(tree: &'a QuantizedTree, ray: &Ray) -> Self {
        let mut result = Self {
            tree,
            ray: *ray,
            ray_mins: [0; 3],
            ray_maxs: [0; 3],
            cursor: tree.nodes.len(),
        };

        if tree.nodes.is_empty() {
            return result;
        }

        // Clip the ray from both of its ends against the whole quantized domain.
        let domain = tree.quantizer.domain();
        let reversed = ray.reversed();
        let (Some(t1), Some(t2)) = (
            domain.cast_local_ray(ray, 1.0, true),
            domain.cast_local_ray(&reversed, 1.0, true),
        ) else {
            return result;
        };

        let clipped = Aabb::from_points([ray.point_at(t1), reversed.point_at(t2)]);
        let (ray_mins, ray_maxs) = tree.quantizer.quantize_aabb(&clipped);
        result.ray_mins = ray_mins;
        result.ray_maxs = ray_maxs;
        result.cursor = 0;
        result
    }

    /// The ray this iterator was created for.
    #[inline]
    pub fn ray(&self) -> &Ray {
        &self.ray
    }
}

impl Iterator for RayHits<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let nodes = &self.tree.nodes;

        while let Some(node) = nodes.get(self.cursor) {
            let overlaps = node.overlaps(&self.ray_mins, &self.ray_maxs);

            if let Some(object) = node.object_index() {
                self.cursor += 1;

                if overlaps {
                    let aabb = self.tree.quantizer.dequantize_aabb(&node.mins, &node.maxs);
                    if aabb.intersects_segment(&self.ray) {
                        return Some(object);
                    }
                }
            } else if overlaps {
                self.cursor += 1;
            } else {
                self.cursor += node.escape_offset();
            }
        }

        None
    }
}

impl FusedIterator for RayHits<'_> {}

impl QuantizedTree {
    /// Iterates through the objects whose bounds are hit by the segment covered by `ray`.
    ///
    /// Every candidate leaf passing the quantized overlap test is checked again against its
    /// de-quantized AABB before being yielded. Dropping the iterator stops the traversal.
    pub fn ray_hits(&self, ray: &Ray) -> RayHits<'_> {
        RayHits::new(self, ray)
    }

    /// Calls `callback` for each object whose bounds are hit by the segment covered by `ray`.
    ///
    /// The callback receives the object index and `ray`, and returns `true` to continue the
    /// traversal or `false` to stop it.
    ///
    /// Returns `true` if the traversal was stopped by the callback, and `false` if it ran to
    /// completion, even if some objects were hit. To get only the first hit found, make the
    /// callback return `false`.
    pub fn ray_test(&self, ray: &Ray, mut callback: impl FnMut(u32, &Ray) -> bool) -> bool {
        for object in self.ray_hits(ray) {
            if !callback(object, ray) {
                return true;
            }
        }

        false
    }
}
