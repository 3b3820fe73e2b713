use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use na::{Point3, Vector3};
use quantbvh3d::bounding_volume::Aabb;
use quantbvh3d::partitioning::{BvhVolume, PartitionStrategy, QuantizedBvh};
use quantbvh3d::query::Ray;

/// Spheres moving along straight lines. Dead spheres are left out of the BVH.
#[derive(Default)]
struct Particles {
    positions: Vec<Point3<f32>>,
    velocities: Vec<Vector3<f32>>,
    alive: Vec<bool>,
    radius: f32,
    reads_in_progress: AtomicUsize,
    builds: AtomicUsize,
}

impl Particles {
    fn spawn(&mut self, position: Point3<f32>, velocity: Vector3<f32>) {
        self.positions.push(position);
        self.velocities.push(velocity);
        self.alive.push(true);
    }

    fn step(&mut self, dt: f32) {
        for (pos, vel) in self.positions.iter_mut().zip(self.velocities.iter()) {
            *pos += vel * dt;
        }
    }
}

impl BvhVolume for Particles {
    fn object_count(&self) -> u32 {
        assert_eq!(self.reads_in_progress.load(Ordering::SeqCst), 1);
        self.positions.len() as u32
    }

    fn object_aabb(&self, index: u32) -> Aabb {
        assert_eq!(self.reads_in_progress.load(Ordering::SeqCst), 1);
        let i = index as usize;

        if self.alive[i] {
            Aabb::from_half_extents(self.positions[i], Vector3::repeat(self.radius))
        } else {
            Aabb::new_invalid()
        }
    }

    fn acquire(&self) {
        let _ = self.reads_in_progress.fetch_add(1, Ordering::SeqCst);
        let _ = self.builds.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        let _ = self.reads_in_progress.fetch_sub(1, Ordering::SeqCst);
    }
}

fn particles_on_a_line(count: usize) -> Particles {
    let mut particles = Particles {
        radius: 0.25,
        ..Default::default()
    };

    for i in 0..count {
        particles.spawn(Point3::new(i as f32, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
    }

    particles
}

#[test]
fn rebuild_follows_moving_particles() {
    let mut bvh = QuantizedBvh::with_strategy(PartitionStrategy::MeanSplit);
    bvh.build(particles_on_a_line(20));

    let at_rest = Ray::from_points(Point3::new(-1.0, 0.0, 0.0), Point3::new(30.0, 0.0, 0.0));
    let moved = Ray::from_points(Point3::new(-1.0, 2.0, 0.0), Point3::new(30.0, 2.0, 0.0));
    assert_eq!(bvh.ray_hits(&at_rest).count(), 20);
    assert_eq!(bvh.ray_hits(&moved).count(), 0);

    if let Some(particles) = bvh.volume_mut() {
        particles.step(2.0);
    }

    // The tree still reflects the old positions.
    assert_eq!(bvh.ray_hits(&at_rest).count(), 20);

    bvh.rebuild();
    assert_eq!(bvh.ray_hits(&at_rest).count(), 0);
    assert_eq!(bvh.ray_hits(&moved).count(), 20);
    assert_relative_eq!(bvh.bounding_box().mins.y, 1.75);

    let particles = bvh.volume().unwrap();
    assert_eq!(particles.builds.load(Ordering::SeqCst), 2);
    assert_eq!(particles.reads_in_progress.load(Ordering::SeqCst), 0);
}

#[test]
fn dead_particles_are_ignored() {
    let mut particles = particles_on_a_line(10);
    for i in [1, 4, 5, 9] {
        particles.alive[i] = false;
    }

    let mut bvh = QuantizedBvh::new();
    bvh.build(particles);
    assert_eq!(bvh.leaf_count(), 6);
    assert_eq!(bvh.check_well_formed(), Ok(()));

    let ray = Ray::from_points(Point3::new(-1.0, 0.0, 0.0), Point3::new(30.0, 0.0, 0.0));
    let mut hits: Vec<_> = bvh.ray_hits(&ray).collect();
    hits.sort_unstable();
    assert_eq!(hits, [0, 2, 3, 6, 7, 8]);

    if let Some(particles) = bvh.volume_mut() {
        particles.alive.iter_mut().for_each(|alive| *alive = false);
    }
    bvh.rebuild();
    assert!(bvh.is_empty());
    assert!(!bvh.ray_test(&ray, |_, _| true));
    assert!(!bvh.bounding_box().is_valid());
}

#[test]
fn shared_volume() {
    let particles = Arc::new(particles_on_a_line(5));
    let mut first = QuantizedBvh::new();
    let mut second = QuantizedBvh::with_strategy(PartitionStrategy::MeanSplit);

    first.build(particles.clone());
    second.build(particles.clone());

    assert_eq!(particles.builds.load(Ordering::SeqCst), 2);
    assert_eq!(first.bounding_box(), second.bounding_box());
    assert_eq!(first.tree().leaf_count(), second.tree().leaf_count());
}
