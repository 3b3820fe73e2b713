use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::bounding_volume::Aabb;

/// A set of objects a [`QuantizedBvh`](super::QuantizedBvh) can be built from.
///
/// The objects are identified by their index in `0..self.object_count()`. An object whose
/// AABB is not [valid](Aabb::is_valid) is left out of the BVH.
///
/// Implementors whose geometry may be modified concurrently can implement
/// [`acquire`](Self::acquire) and [`release`](Self::release): the BVH calls each of them exactly
/// once per build, around the reads of the object count and AABBs.
pub trait BvhVolume {
    /// The number of objects of this volume.
    fn object_count(&self) -> u32;

    /// The AABB of the object with the given index.
    ///
    /// Return an invalid AABB (e.g. [`Aabb::new_invalid`]) to exclude the object.
    fn object_aabb(&self, index: u32) -> Aabb;

    /// Called before the BVH starts reading this volume.
    fn acquire(&self) {}

    /// Called after the BVH is done reading this volume.
    fn release(&self) {}
}

impl<T: BvhVolume + ?Sized> BvhVolume for &T {
    #[inline]
    fn object_count(&self) -> u32 {
        (**self).object_count()
    }

    #[inline]
    fn object_aabb(&self, index: u32) -> Aabb {
        (**self).object_aabb(index)
    }

    #[inline]
    fn acquire(&self) {
        (**self).acquire()
    }

    #[inline]
    fn release(&self) {
        (**self).release()
    }
}

impl<T: BvhVolume + ?Sized> BvhVolume for Box<T> {
    #[inline]
    fn object_count(&self) -> u32 {
        (**self).object_count()
    }

    #[inline]
    fn object_aabb(&self, index: u32) -> Aabb {
        (**self).object_aabb(index)
    }

    #[inline]
    fn acquire(&self) {
        (**self).acquire()
    }

    #[inline]
    fn release(&self) {
        (**self).release()
    }
}

impl<T: BvhVolume + ?Sized> BvhVolume for Arc<T> {
    #[inline]
    fn object_count(&self) -> u32 {
        (**self).object_count()
    }

    #[inline]
    fn object_aabb(&self, index: u32) -> Aabb {
        (**self).object_aabb(index)
    }

    #[inline]
    fn acquire(&self) {
        (**self).acquire()
    }

    #[inline]
    fn release(&self) {
        (**self).release()
    }
}

impl BvhVolume for [Aabb] {
    #[inline]
    fn object_count(&self) -> u32 {
        u32::try_from(self.len()).unwrap_or(u32::MAX)
    }

    #[inline]
    fn object_aabb(&self, index: u32) -> Aabb {
        self[index as usize]
    }
}

impl BvhVolume for Vec<Aabb> {
    #[inline]
    fn object_count(&self) -> u32 {
        self.as_slice().object_count()
    }

    #[inline]
    fn object_aabb(&self, index: u32) -> Aabb {
        self[index as usize]
    }
}
