//! Flat primitives lying in the local XZ plane with normal +Y.

use crate::{Intersect, MaterialId, Primitive};
use umbra_math::{Aabb, Vec2, Vec3};

/// Rays closer to parallel than this miss the plane.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Shared plane test: sets `t` and `inside` and returns the local hit point.
///
/// The plane is two-sided; `inside` means the ray starts below it.
fn hit_xz_plane(hit: &mut Intersect<'_>) -> Option<Vec3> {
    let ray = &hit.local_ray;
    if ray.direction.y.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = -ray.origin.y / ray.direction.y;
    if !ray.contains(t) {
        return None;
    }

    let p = ray.at(t);
    hit.inside = ray.origin.y < 0.0;
    hit.t = t;
    Some(p)
}

/// Square plane with a finite half extent.
#[derive(Debug, Clone)]
pub struct Plane {
    extent: f32,
    material: MaterialId,
}

impl Plane {
    /// Default half extent, large enough to act as a ground plane.
    pub const DEFAULT_EXTENT: f32 = 1e4;

    pub fn new(material: MaterialId) -> Self {
        Self::with_extent(Self::DEFAULT_EXTENT, material)
    }

    pub fn with_extent(extent: f32, material: MaterialId) -> Self {
        Self {
            extent: extent.abs(),
            material,
        }
    }
}

impl Primitive for Plane {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(
            Vec3::new(-self.extent, 0.0, -self.extent),
            Vec3::new(self.extent, 0.0, self.extent),
        )
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let mut trial = *hit;
        match hit_xz_plane(&mut trial) {
            Some(p) if p.x.abs() <= self.extent && p.z.abs() <= self.extent => {
                *hit = trial;
                true
            }
            _ => false,
        }
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        let p = hit.position;
        hit.normal = Vec3::Y;
        hit.uv = Vec2::new(p.x, p.z) / (2.0 * self.extent) + 0.5;
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}

/// Disc of the given radius around the local origin.
#[derive(Debug, Clone)]
pub struct Disc {
    radius: f32,
    material: MaterialId,
}

impl Disc {
    pub fn new(radius: f32, material: MaterialId) -> Self {
        Self {
            radius: radius.abs(),
            material,
        }
    }
}

impl Primitive for Disc {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(
            Vec3::new(-self.radius, 0.0, -self.radius),
            Vec3::new(self.radius, 0.0, self.radius),
        )
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let mut trial = *hit;
        match hit_xz_plane(&mut trial) {
            Some(p) if p.x * p.x + p.z * p.z <= self.radius * self.radius => {
                *hit = trial;
                true
            }
            _ => false,
        }
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        let p = hit.position;
        hit.normal = Vec3::Y;
        hit.uv = Vec2::new(p.x, p.z) / (2.0 * self.radius).max(f32::EPSILON) + 0.5;
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}

/// Rectangle with full extents `width` along X and `depth` along Z.
#[derive(Debug, Clone)]
pub struct Rectangle {
    half: Vec2,
    material: MaterialId,
}

impl Rectangle {
    pub fn new(width: f32, depth: f32, material: MaterialId) -> Self {
        Self {
            half: Vec2::new(width.abs(), depth.abs()) * 0.5,
            material,
        }
    }
}

impl Primitive for Rectangle {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(
            Vec3::new(-self.half.x, 0.0, -self.half.y),
            Vec3::new(self.half.x, 0.0, self.half.y),
        )
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let mut trial = *hit;
        match hit_xz_plane(&mut trial) {
            Some(p) if p.x.abs() <= self.half.x && p.z.abs() <= self.half.y => {
                *hit = trial;
                true
            }
            _ => false,
        }
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        let p = hit.position;
        hit.normal = Vec3::Y;
        hit.uv = Vec2::new(p.x, p.z) / (2.0 * self.half).max(Vec2::splat(f32::EPSILON)) + 0.5;
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}
