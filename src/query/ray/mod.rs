//! Ray-casting related definitions and implementations.

#[doc(inline)]
pub use self::ray::{Ray, RayCast};
pub use self::ray_aabb::clip_ray_aabb;

#[doc(hidden)]
pub mod ray;
mod ray_aabb;
