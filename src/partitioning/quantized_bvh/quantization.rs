use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, Vector, DIM};

use super::node::QUANTIZED_MAX;

#[cfg(not(feature = "std"))]
use na::ComplexField;

/// The smallest extent, along any axis, of the domain of a [`Quantizer`].
///
/// Flat sets of AABBs (all lying on a plane, say) would otherwise produce a zero scale and
/// a division by zero.
pub const MIN_QUANTIZATION_EXTENT: Real = 1.0e-5;

/// Maps coordinates of a fixed domain to 16-bit fixed-point coordinates, and back.
///
/// A coordinate `c` is mapped to `round((c - offset) / scale * 65535)`, clamped to
/// `[0, 65535]`. The precision of the mapping is one [`step`](Self::step) per axis.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quantizer {
    offset: Point<Real>,
    scale: Vector<Real>,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            offset: Point::origin(),
            scale: Vector::repeat(1.0),
        }
    }
}

impl Quantizer {
    /// A quantizer covering the given `domain`.
    ///
    /// The extents of `domain` are floored to [`MIN_QUANTIZATION_EXTENT`].
    pub fn new(domain: &Aabb) -> Self {
        Self {
            offset: domain.mins,
            scale: domain.extents().map(|e| e.max(MIN_QUANTIZATION_EXTENT)),
        }
    }

    /// The point mapped to the quantized coordinates `[0, 0, 0]`.
    #[inline]
    pub fn offset(&self) -> Point<Real> {
        self.offset
    }

    /// The extents of the quantized domain.
    #[inline]
    pub fn scale(&self) -> Vector<Real> {
        self.scale
    }

    /// The AABB covering the whole quantized domain.
    #[inline]
    pub fn domain(&self) -> Aabb {
        Aabb::new(self.offset, self.offset + self.scale)
    }

    /// The length, along each axis, of one quantization step.
    #[inline]
    pub fn step(&self) -> Vector<Real> {
        self.scale / QUANTIZED_MAX as Real
    }

    #[inline]
    fn normalized(&self, pt: &Point<Real>, axis: usize) -> Real {
        (pt[axis] - self.offset[axis]) / self.scale[axis] * QUANTIZED_MAX as Real
    }

    #[inline]
    fn clamp(val: Real) -> u16 {
        val.max(0.0).min(QUANTIZED_MAX as Real) as u16
    }

    /// Quantizes a point, rounding each coordinate to the nearest quantized value.
    ///
    /// Points outside of the domain are clamped to its boundary.
    pub fn quantize_point(&self, pt: &Point<Real>) -> [u16; 3] {
        let mut result = [0; 3];
        for (i, q) in result.iter_mut().enumerate().take(DIM) {
            *q = Self::clamp(self.normalized(pt, i).round());
        }
        result
    }

    /// Quantizes an AABB conservatively.
    ///
    /// The mins are rounded down and the maxs are rounded up so the de-quantized box contains
    /// the part of `aabb` lying inside of the domain.
    pub fn quantize_aabb(&self, aabb: &Aabb) -> ([u16; 3], [u16; 3]) {
        let mut mins = [0; 3];
        let mut maxs = [0; 3];

        for i in 0..DIM {
            mins[i] = Self::clamp(self.normalized(&aabb.mins, i).floor());
            maxs[i] = Self::clamp(self.normalized(&aabb.maxs, i).ceil());
        }

        (mins, maxs)
    }

    /// Maps quantized coordinates back to the domain.
    pub fn dequantize_point(&self, pt: &[u16; 3]) -> Point<Real> {
        Point::from(Vector::from_fn(|i, _| {
            pt[i] as Real / QUANTIZED_MAX as Real * self.scale[i] + self.offset[i]
        }))
    }

    /// Maps a quantized box back to the domain.
    #[inline]
    pub fn dequantize_aabb(&self, mins: &[u16; 3], maxs: &[u16; 3]) -> Aabb {
        Aabb::new(self.dequantize_point(mins), self.dequantize_point(maxs))
    }
}

#[cfg(test)]
mod test {
    use super::{Quantizer, MIN_QUANTIZATION_EXTENT};
    use crate::bounding_volume::{Aabb, BoundingVolume};
    use crate::math::{Point, Real, Vector};

    fn domain() -> Aabb {
        Aabb::new(Point::new(-10.0, 0.0, 5.0), Point::new(10.0, 1.0, 105.0))
    }

    #[test]
    fn domain_corners_map_to_range_ends() {
        let quantizer = Quantizer::new(&domain());
        assert_eq!(quantizer.quantize_point(&domain().mins), [0; 3]);
        assert_eq!(quantizer.quantize_point(&domain().maxs), [u16::MAX; 3]);
        assert_eq!(
            quantizer.quantize_point(&Point::new(100.0, -100.0, 55.0)),
            [u16::MAX, 0, 32768]
        );
    }

    #[test]
    fn point_round_trip_within_one_step() {
        let quantizer = Quantizer::new(&domain());
        let step = quantizer.step();
        let mut rng = oorandom::Rand32::new(0);

        for _ in 0..1000 {
            let pt = Point::from(Vector::from_fn(|i, _| {
                domain().mins[i] + rng.rand_float() as Real * domain().extents()[i]
            }));
            let back = quantizer.dequantize_point(&quantizer.quantize_point(&pt));

            for i in 0..3 {
                assert!(
                    (back[i] - pt[i]).abs() <= step[i],
                    "{:?} round-tripped to {:?}",
                    pt,
                    back
                );
            }
        }
    }

    #[test]
    fn aabb_quantization_is_conservative() {
        let quantizer = Quantizer::new(&domain());
        let aabb = Aabb::new(Point::new(-3.3, 0.25, 17.0), Point::new(4.1, 0.3, 99.9));
        let (mins, maxs) = quantizer.quantize_aabb(&aabb);
        let back = quantizer.dequantize_aabb(&mins, &maxs);

        assert!(back.loosened(1.0e-4).contains(&aabb));
        assert!(aabb.loosened(quantizer.step().max()).contains(&back));
    }

    #[test]
    fn flat_domain_uses_minimum_extent() {
        let flat = Aabb::new(Point::new(0.0, 0.0, 2.0), Point::new(1.0, 1.0, 2.0));
        let quantizer = Quantizer::new(&flat);
        assert_eq!(quantizer.scale().z, MIN_QUANTIZATION_EXTENT);
        assert_eq!(quantizer.quantize_point(&Point::new(0.5, 0.5, 2.0))[2], 0);
    }
}
