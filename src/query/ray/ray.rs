//! Traits and structure needed to cast rays.

use crate::math::{Point, Real, Vector, DEFAULT_EPSILON};

/// A ray for ray-casting queries.
///
/// A ray here is a finite line segment: it starts at `origin` and ends at `origin + dir`.
/// Points along the ray are computed as `origin + dir * t` for `t ∈ [0, 1]`.
///
/// # Example
///
/// ```rust
/// # #[cfg(all(feature = "dim3", feature = "f32"))] {
/// use quantbvh3d::query::Ray;
/// use nalgebra::Point3;
///
/// let ray = Ray::from_points(Point3::new(-1.0, 0.5, 0.5), Point3::new(2.0, 0.5, 0.5));
///
/// assert_eq!(ray.end_point(), Point3::new(2.0, 0.5, 0.5));
/// assert_eq!(ray.point_at(0.5), Point3::new(0.5, 0.5, 0.5));
/// assert_eq!(ray.reversed().origin, Point3::new(2.0, 0.5, 0.5));
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Ray {
    /// Starting point of the ray.
    pub origin: Point<Real>,
    /// Vector from the starting point to the end point of the ray.
    pub dir: Vector<Real>,
}

impl Ray {
    /// Creates a new ray from an origin point and a direction vector.
    ///
    /// The length of `dir` matters: the ray ends at `origin + dir`.
    pub fn new(origin: Point<Real>, dir: Vector<Real>) -> Ray {
        Ray { origin, dir }
    }

    /// Creates the ray going from `begin` to `end`.
    #[inline]
    pub fn from_points(begin: Point<Real>, end: Point<Real>) -> Ray {
        Ray::new(begin, end - begin)
    }

    /// The last point of this ray.
    #[inline]
    pub fn end_point(&self) -> Point<Real> {
        self.origin + self.dir
    }

    /// The same segment traversed in the opposite direction.
    #[inline]
    pub fn reversed(&self) -> Ray {
        Ray::new(self.end_point(), -self.dir)
    }

    /// Computes a point along the ray at parameter `t`.
    #[inline]
    pub fn point_at(&self, t: Real) -> Point<Real> {
        self.origin + self.dir * t
    }

    /// Is this ray too short to have a meaningful direction?
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.dir.norm_squared() <= DEFAULT_EPSILON * DEFAULT_EPSILON
    }
}

/// Traits of objects which can be tested for intersection with a ray.
pub trait RayCast {
    /// Computes the time of impact between this shape and a ray.
    ///
    /// The time of impact is limited to `max_time_of_impact`. Use `1.0` to restrict the query
    /// to the ray's segment. If `solid` is `false` and the ray starts inside of the shape, the
    /// time of impact of the exit point is returned instead of zero.
    fn cast_local_ray(&self, ray: &Ray, max_time_of_impact: Real, solid: bool) -> Option<Real>;

    /// Tests whether a ray intersects this shape.
    #[inline]
    fn intersects_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        self.cast_local_ray(ray, max_time_of_impact, true).is_some()
    }

    /// Tests whether the segment covered by `ray` intersects this shape.
    #[inline]
    fn intersects_segment(&self, ray: &Ray) -> bool {
        self.intersects_local_ray(ray, 1.0)
    }
}
