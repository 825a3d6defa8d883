//! Axis-aligned box primitive.

use crate::{Intersect, MaterialId, Primitive};
use umbra_math::{Aabb, Vec2, Vec3};

/// A box centred on the local origin.
#[derive(Debug, Clone)]
pub struct Cuboid {
    bounds: Aabb,
    size: Vec3,
    material: MaterialId,
}

impl Cuboid {
    /// Box with the given full extent per axis.
    pub fn new(size: Vec3, material: MaterialId) -> Self {
        let size = size.abs();
        Self {
            bounds: Aabb::centered(size),
            size,
            material,
        }
    }

    pub fn cube(size: f32, material: MaterialId) -> Self {
        Self::new(Vec3::splat(size), material)
    }

    /// Axis whose face contains `p`: the largest coordinate relative to the
    /// half extent.
    fn face_axis(&self, p: Vec3) -> usize {
        let rel = (p / (self.size * 0.5)).abs();
        if rel.x >= rel.y && rel.x >= rel.z {
            0
        } else if rel.y >= rel.z {
            1
        } else {
            2
        }
    }
}

impl Primitive for Cuboid {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let ray = &hit.local_ray;
        let Some(slab) = self.bounds.slab(ray) else {
            return false;
        };

        let (t, inside) = if ray.contains(slab.t_min) {
            (slab.t_min, false)
        } else if slab.t_min < ray.interval.min && ray.contains(slab.t_max) {
            (slab.t_max, true)
        } else {
            return false;
        };

        hit.t = t;
        hit.inside = inside;
        true
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        let p = hit.position;
        let axis = self.face_axis(p);

        let mut normal = Vec3::ZERO;
        normal[axis] = p[axis].signum();
        hit.normal = normal;

        // Planar mapping over the two remaining axes, wrapped into [0,1)
        let (a, b) = match axis {
            0 => (2, 1),
            1 => (0, 2),
            _ => (0, 1),
        };
        let wrap = |x: f32| x - x.floor();
        hit.uv = Vec2::new(
            wrap(p[a] / self.size[a] + 0.5),
            wrap(p[b] / self.size[b] + 0.5),
        );
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}
