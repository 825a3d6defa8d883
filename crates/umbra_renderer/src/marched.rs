//! Implicit surfaces as primitives.

use crate::sphere::spherical_uv;
use crate::{
    march, surface_normal, DistanceField, Intersect, MarchSettings, MaterialId, Primitive,
};
use umbra_math::{Aabb, Interval, Vec3};

/// A distance field confined to a box, rendered by ray marching.
///
/// The march runs only over the part of the ray inside the box, so the box
/// must enclose the whole surface.
#[derive(Debug, Clone)]
pub struct Marched<F> {
    field: F,
    bounds: Aabb,
    settings: MarchSettings,
    material: MaterialId,
}

impl<F: DistanceField> Marched<F> {
    /// Field confined to a centred box with the given full extent.
    pub fn new(field: F, size: Vec3, material: MaterialId) -> Self {
        Self {
            field,
            bounds: Aabb::centered(size),
            settings: MarchSettings::default(),
            material,
        }
    }

    pub fn with_settings(mut self, settings: MarchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn field(&self) -> &F {
        &self.field
    }
}

impl<F: DistanceField> Primitive for Marched<F> {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let ray = hit.local_ray;
        let Some(slab) = self.bounds.slab(&ray) else {
            return false;
        };

        let start = slab.t_min.max(ray.interval.min);
        let end = slab.t_max.min(ray.interval.max);
        if start > end {
            return false;
        }

        let clipped = ray.with_interval(Interval::new(start, end));
        let result = march(&clipped, end, &self.field, &self.settings);
        hit.march_steps = result.steps;
        if !result.is_hit() {
            return false;
        }

        hit.t = result.t;
        hit.inside = result.inside;
        true
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        let p = hit.position;
        let normal = surface_normal(&self.field, p, self.settings.normal_epsilon);

        hit.normal = normal;
        hit.uv = spherical_uv(normal);
        hit.iterations = self.field.iterations(p);
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::random_unit_vector;
    use crate::sdf::{Mandelbulb, SphereField, Torus};
    use crate::{BvhSettings, Diffuse, SceneBuilder, Sphere};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use umbra_math::{Axis, Color, Ray};

    fn local_hit<F: DistanceField>(marched: &Marched<F>, ray: Ray) -> Option<Intersect<'static>> {
        let mut hit = Intersect::new(ray);
        if marched.hit(&mut hit) {
            hit.position = hit.local_ray.at(hit.t);
            marched.intersect(&mut hit);
            Some(hit)
        } else {
            None
        }
    }

    fn unit_sphere_field() -> Marched<SphereField> {
        Marched::new(SphereField { radius: 1.0 }, Vec3::splat(2.5), MaterialId::default())
    }

    #[test]
    fn test_marched_sphere_matches_analytic() {
        let marched = unit_sphere_field();
        let hit = local_hit(&marched, Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z))
            .expect("marched hit");

        assert!((hit.t - 4.0).abs() < 1e-3, "t = {}", hit.t);
        assert!((hit.normal - Vec3::Z).length() < 1e-2);
        assert!(hit.march_steps >= 1);
    }

    #[test]
    fn test_marched_from_inside() {
        let marched = unit_sphere_field();
        let hit = local_hit(&marched, Ray::new(Vec3::ZERO, Vec3::Y)).expect("inside hit");

        assert!(hit.inside);
        assert!((hit.t - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_marched_instance_agrees_with_sphere() {
        let axis = Axis::euler_zyx(Vec3::new(2.0, -1.0, 4.0), Vec3::new(0.3, 1.1, -0.4), 3.0);
        let scene_with = |marched: bool| {
            let mut builder = SceneBuilder::new(Color::ZERO);
            let white = builder.add_material(Diffuse::new(Color::ONE));
            if marched {
                let field = SphereField { radius: 1.0 };
                builder.add(Marched::new(field, Vec3::splat(2.2), white), axis);
            } else {
                builder.add(Sphere::new(1.0, white), axis);
            }
            builder.build(&BvhSettings::default()).expect("valid scene")
        };
        let marched = scene_with(true);
        let analytic = scene_with(false);

        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = 0;
        for _ in 0..200 {
            let origin = axis.origin() + random_unit_vector(&mut rng) * rng.gen_range(4.0..15.0);
            let target = axis.origin() + random_unit_vector(&mut rng) * rng.gen_range(0.0..4.5);
            let direction = (target - origin).normalize();

            // Grazing rays converge too slowly to compare
            let along = (axis.origin() - origin).dot(direction).max(0.0);
            let approach = (origin + direction * along - axis.origin()).length() / 3.0;
            if (approach - 1.0).abs() < 0.05 {
                continue;
            }

            let ray = Ray::new(origin, direction);
            match (marched.hit(&ray), analytic.hit(&ray)) {
                (Some(mut m), Some(mut a)) => {
                    hits += 1;
                    marched.complete(&mut m);
                    analytic.complete(&mut a);
                    assert!((m.t - a.t).abs() < 2e-3, "{ray:?}: {} vs {}", m.t, a.t);
                    assert!((m.position - a.position).length() < 5e-3);
                    assert!((m.normal - a.normal).length() < 1e-2);
                }
                (None, None) => {}
                (m, a) => {
                    let (m, a) = (m.map(|h| h.t), a.map(|h| h.t));
                    panic!("{ray:?}: marched {m:?} analytic {a:?}");
                }
            }
        }
        assert!(hits > 50, "only {hits} rays hit");
    }

    #[test]
    fn test_marched_miss_outside_bounds() {
        let marched = Marched::new(
            Torus {
                major: 1.0,
                minor: 0.25,
            },
            Vec3::new(2.6, 0.6, 2.6),
            MaterialId::default(),
        );

        // Straight down through the hole
        assert!(local_hit(&marched, Ray::new(Vec3::new(0.0, 3.0, 0.0), -Vec3::Y)).is_none());
        // Down onto the tube
        assert!(local_hit(&marched, Ray::new(Vec3::new(1.0, 3.0, 0.0), -Vec3::Y)).is_some());
    }

    #[test]
    fn test_marched_mandelbulb_reports_iterations() {
        let settings = MarchSettings {
            epsilon: 1e-4,
            max_iterations: 2_000,
            ..Default::default()
        };
        let marched = Marched::new(Mandelbulb::default(), Vec3::splat(2.5), MaterialId::default())
            .with_settings(settings);
        let hit = local_hit(&marched, Ray::new(Vec3::new(0.0, 0.0, 3.0), -Vec3::Z))
            .expect("bulb hit");

        assert!(hit.t > 1.0 && hit.t < 3.0, "t = {}", hit.t);
        assert!(hit.iterations > 0);
    }
}
