use core::mem;

use crate::bounding_volume::Aabb;
use crate::math::{Real, DEFAULT_EPSILON, DIM};
use crate::query::{Ray, RayCast};
use num::Zero;

impl RayCast for Aabb {
    fn cast_local_ray(&self, ray: &Ray, max_toi: Real, solid: bool) -> Option<Real> {
        let (tmin, tmax) = clip_ray_aabb(self, ray, max_toi)?;

        if tmin.is_zero() && !solid {
            Some(tmax)
        } else {
            Some(tmin)
        }
    }
}

/// Clips the ray against the slabs of `aabb`.
///
/// Returns the parameters `(tmin, tmax)` of the part of the ray lying inside of `aabb`, with
/// `0 ≤ tmin ≤ tmax ≤ max_toi`, or `None` if the ray misses the box. Direction components
/// close to zero are not divided by: the ray origin is checked against the corresponding slab
/// instead. A degenerate (zero-length) ray never intersects anything.
pub fn clip_ray_aabb(aabb: &Aabb, ray: &Ray, max_toi: Real) -> Option<(Real, Real)> {
    if ray.is_degenerate() {
        return None;
    }

    let mut tmin: Real = 0.0;
    let mut tmax: Real = max_toi;

    for i in 0usize..DIM {
        if ray.dir[i].abs() <= DEFAULT_EPSILON {
            if ray.origin[i] < aabb.mins[i] || ray.origin[i] > aabb.maxs[i] {
                return None;
            }
        } else {
            let denom = 1.0 / ray.dir[i];
            let mut inter_with_near_halfspace = (aabb.mins[i] - ray.origin[i]) * denom;
            let mut inter_with_far_halfspace = (aabb.maxs[i] - ray.origin[i]) * denom;

            if inter_with_near_halfspace > inter_with_far_halfspace {
                mem::swap(
                    &mut inter_with_near_halfspace,
                    &mut inter_with_far_halfspace,
                )
            }

            tmin = tmin.max(inter_with_near_halfspace);
            tmax = tmax.min(inter_with_far_halfspace);

            if tmin > tmax {
                // This covers the case where tmax is negative because tmin is
                // initialized at zero.
                return None;
            }
        }
    }

    Some((tmin, tmax))
}
