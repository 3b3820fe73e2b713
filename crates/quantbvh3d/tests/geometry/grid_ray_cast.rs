use std::sync::Arc;
use std::thread;

use na::{Point3, Vector3};
use quantbvh3d::bounding_volume::{Aabb, BoundingVolume};
use quantbvh3d::partitioning::{PartitionStrategy, QuantizedBvh, QuantizedTree};
use quantbvh3d::query::{Ray, RayCast};

/// Unit cubes centered on the points of a `n * n * n` grid with a spacing of 2.
fn cube_grid(n: usize) -> Vec<Aabb> {
    let mut aabbs = Vec::with_capacity(n * n * n);

    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let center = Point3::new(i as f32, j as f32, k as f32) * 2.0;
                aabbs.push(Aabb::from_half_extents(center, Vector3::repeat(0.5)));
            }
        }
    }

    aabbs
}

fn grid_index(n: usize, i: usize, j: usize, k: usize) -> u32 {
    (i * n * n + j * n + k) as u32
}

#[test]
fn axis_aligned_rays_through_grid_rows() {
    let n = 8;
    let mut bvh = QuantizedBvh::new();
    bvh.build(cube_grid(n));
    assert_eq!(bvh.leaf_count(), n * n * n);
    assert_eq!(bvh.check_well_formed(), Ok(()));

    for j in 0..n {
        for k in 0..n {
            let y = j as f32 * 2.0;
            let z = k as f32 * 2.0;
            let ray = Ray::from_points(Point3::new(-5.0, y, z), Point3::new(20.0, y, z));

            let mut hits: Vec<_> = bvh.ray_hits(&ray).collect();
            hits.sort_unstable();
            let expected: Vec<_> = (0..n).map(|i| grid_index(n, i, j, k)).collect();
            assert_eq!(hits, expected);
        }
    }
}

#[test]
fn rays_between_grid_rows_hit_nothing() {
    let n = 6;
    let tree = QuantizedTree::from_volume(&cube_grid(n), PartitionStrategy::MeanSplit);

    for j in 0..n - 1 {
        let y = j as f32 * 2.0 + 1.0;
        let ray = Ray::from_points(Point3::new(-5.0, y, 3.0), Point3::new(20.0, y, 3.0));
        assert_eq!(tree.ray_hits(&ray).count(), 0, "Unexpected hit at y = {}", y);
    }
}

#[test]
fn first_hit_query() {
    let n = 5;
    let mut bvh = QuantizedBvh::new();
    bvh.build(cube_grid(n));

    let ray = Ray::from_points(Point3::new(-5.0, 4.0, 4.0), Point3::new(20.0, 4.0, 4.0));
    let mut first = None;
    let stopped = bvh.ray_test(&ray, |object, _| {
        first = Some(object);
        false
    });

    assert!(stopped);
    let object = first.unwrap();
    assert!((0..n).any(|i| grid_index(n, i, 2, 2) == object));

    // Find the closest hit by visiting every candidate.
    let aabbs = bvh.volume().unwrap();
    let mut closest = (f32::MAX, u32::MAX);
    let stopped = bvh.ray_test(&ray, |object, ray| {
        if let Some(toi) = aabbs[object as usize].cast_local_ray(ray, 1.0, true) {
            if toi < closest.0 {
                closest = (toi, object);
            }
        }
        true
    });

    assert!(!stopped);
    assert_eq!(closest.1, grid_index(n, 0, 2, 2));
    assert_relative_eq!(closest.0, 4.5 / 25.0, epsilon = 1.0e-5);
}

#[test]
fn shared_snapshot_queried_from_several_threads() {
    let tree = Arc::new(QuantizedTree::from_volume(
        &cube_grid(6),
        PartitionStrategy::FullSort,
    ));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let tree = tree.clone();
            thread::spawn(move || {
                let y = t as f32 * 2.0;
                let ray = Ray::from_points(Point3::new(3.0, y, -5.0), Point3::new(3.0, y, 20.0));
                tree.ray_hits(&ray).count()
            })
        })
        .collect();

    for handle in handles {
        // x = 3.0 lies between two columns of cubes.
        assert_eq!(handle.join().unwrap(), 0);
    }

    let ray = Ray::from_points(Point3::new(2.0, 2.0, -5.0), Point3::new(2.0, 2.0, 20.0));
    assert_eq!(tree.ray_hits(&ray).count(), 6);
}

#[test]
fn diagonal_ray_matches_brute_force() {
    let aabbs = cube_grid(7);
    let ray = Ray::from_points(Point3::new(-1.0, -0.9, -1.1), Point3::new(13.0, 12.8, 13.3));

    let mut expected: Vec<_> = aabbs
        .iter()
        .enumerate()
        .filter(|(_, aabb)| aabb.intersects_segment(&ray))
        .map(|(i, _)| i as u32)
        .collect();
    expected.sort_unstable();
    assert!(!expected.is_empty());

    for strategy in [PartitionStrategy::FullSort, PartitionStrategy::MeanSplit] {
        let tree = QuantizedTree::from_volume(&aabbs, strategy);
        let hits: Vec<_> = tree.ray_hits(&ray).collect();

        for object in &expected {
            assert!(hits.contains(object), "Missed object {}.", object);
        }

        // Extra hits are only allowed within the quantization error.
        for object in &hits {
            let loosened = aabbs[*object as usize].loosened(1.0e-3);
            assert!(loosened.intersects_segment(&ray));
        }
    }
}
