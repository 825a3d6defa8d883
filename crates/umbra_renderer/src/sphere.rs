//! Sphere primitive for ray tracing.

use crate::{Intersect, MaterialId, Primitive};
use std::f32::consts::PI;
use umbra_math::{Aabb, Vec2, Vec3};

/// A sphere centred on the local origin.
#[derive(Debug, Clone)]
pub struct Sphere {
    radius: f32,
    material: MaterialId,
}

impl Sphere {
    pub fn new(radius: f32, material: MaterialId) -> Self {
        Self {
            radius: radius.max(0.0),
            material,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

/// UV coordinates for a unit direction from the sphere centre.
///
/// u runs around the Y axis starting at -X, v runs from -Y to +Y.
pub fn spherical_uv(n: Vec3) -> Vec2 {
    let theta = (-n.y).clamp(-1.0, 1.0).acos();
    let phi = (-n.z).atan2(n.x) + PI;

    Vec2::new(phi / (2.0 * PI), theta / PI)
}

impl Primitive for Sphere {
    fn bounds(&self) -> Aabb {
        Aabb::centered(Vec3::splat(self.radius * 2.0))
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let ray = &hit.local_ray;
        let oc = -ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return false;
        }

        let sqrtd = discriminant.sqrt();
        let near = (h - sqrtd) / a;
        let far = (h + sqrtd) / a;

        // Taking the far root means the ray starts inside
        let (t, inside) = if ray.contains(near) {
            (near, false)
        } else if ray.contains(far) {
            (far, true)
        } else {
            return false;
        };

        hit.t = t;
        hit.inside = inside;
        true
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        let normal = hit.position.normalize_or_zero();
        hit.normal = normal;
        hit.uv = spherical_uv(normal);
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}
