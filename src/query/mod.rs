//! Non-persistent geometric queries.
//!
//! Ray-casting is achieved by importing the [`query::RayCast`](RayCast) trait. Rays are
//! finite segments going from [`Ray::origin`] to [`Ray::end_point`].

pub use self::ray::{Ray, RayCast};

pub mod ray;
