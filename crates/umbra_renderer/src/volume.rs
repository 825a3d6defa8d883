//! Participating media: a box of constant-density smoke and the fog
//! material that scatters inside it.

use crate::sampling::random_unit_vector;
use crate::{Intersect, Material, MaterialId, Primitive, Scatter};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use umbra_math::{Aabb, Color, Ray, Vec2, Vec3};

/// Box filled with a homogeneous medium, centred on the local origin.
///
/// A ray crossing the box is hit at an exponentially distributed free-flight
/// distance past its entry point, or not at all when that distance lands
/// beyond the exit. Primitives have no access to the worker generator, so
/// the distance is drawn from a generator seeded by hashing the ray; the
/// same ray always lands at the same point.
#[derive(Debug, Clone)]
pub struct SmokeBox {
    bounds: Aabb,
    /// Scattering events per unit of distance
    density: f32,
    seed: u64,
    material: MaterialId,
}

impl SmokeBox {
    /// Box with the given full extent per axis.
    pub fn new(size: Vec3, density: f32, material: MaterialId) -> Self {
        Self {
            bounds: Aabb::centered(size.abs()),
            density: density.max(0.0),
            seed: 0,
            material,
        }
    }

    /// Decorrelate boxes that would otherwise share free-flight samples.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    /// Free-flight distance for `ray`, in world units of the local frame.
    fn free_path(&self, ray: &Ray) -> f32 {
        if self.density <= 0.0 {
            return f32::INFINITY;
        }
        let xi: f32 = StdRng::seed_from_u64(ray_seed(ray, self.seed)).gen();
        -(1.0 - xi).ln() / self.density
    }
}

fn ray_seed(ray: &Ray, seed: u64) -> u64 {
    let values = [
        ray.origin.x,
        ray.origin.y,
        ray.origin.z,
        ray.direction.x,
        ray.direction.y,
        ray.direction.z,
        ray.interval.min,
    ];
    values.iter().fold(seed ^ 0x9E37_79B9_7F4A_7C15, |h, v| {
        (h ^ u64::from(v.to_bits()))
            .wrapping_mul(0x0100_0000_01B3)
            .rotate_left(29)
    })
}

impl Primitive for SmokeBox {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn hit(&self, hit: &mut Intersect<'_>) -> bool {
        let ray = hit.local_ray;
        let Some(slab) = self.bounds.slab(&ray) else {
            return false;
        };

        let enter = slab.t_min.max(ray.interval.min);
        let exit = slab.t_max.min(ray.interval.max);
        let length = ray.direction.length();
        if enter >= exit || length <= 0.0 {
            return false;
        }

        let t = enter + self.free_path(&ray) / length;
        if t >= exit {
            return false;
        }

        hit.t = t;
        hit.inside = slab.t_min < ray.interval.min;
        true
    }

    fn intersect(&self, hit: &mut Intersect<'_>) {
        // No surface: face the incoming ray
        hit.normal = -hit.local_ray.direction.normalize_or_zero();
        hit.uv = Vec2::ZERO;
    }

    fn material(&self) -> MaterialId {
        self.material
    }
}

/// Isotropic scattering medium, tinting each bounce by `color`.
#[derive(Debug, Clone)]
pub struct Fog {
    color: Color,
}

impl Fog {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Material for Fog {
    fn scatter(&self, hit: &Intersect<'_>, rng: &mut dyn RngCore) -> Scatter {
        Scatter::reflected(Ray::new(hit.position, random_unit_vector(rng)), self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BvhSettings, Diffuse, SceneBuilder, Sphere};
    use umbra_math::{Axis, Interval};

    fn local_hit(smoke: &SmokeBox, ray: Ray) -> Option<Intersect<'static>> {
        let mut hit = Intersect::new(ray);
        smoke.hit(&mut hit).then_some(hit)
    }

    fn jittered_ray(rng: &mut StdRng, z: f32) -> Ray {
        let origin = Vec3::new(rng.gen_range(-0.4..0.4), rng.gen_range(-0.4..0.4), z);
        Ray::new(origin, Vec3::Z)
    }

    #[test]
    fn test_empty_medium_is_transparent() {
        let smoke = SmokeBox::new(Vec3::splat(2.0), 0.0, MaterialId::default());

        assert!(local_hit(&smoke, Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z)).is_none());
        assert!(local_hit(&smoke, Ray::new(Vec3::ZERO, Vec3::X)).is_none());
    }

    #[test]
    fn test_dense_medium_hits_at_entry() {
        let smoke = SmokeBox::new(Vec3::splat(2.0), 1e6, MaterialId::default());
        let hit = local_hit(&smoke, Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z))
            .expect("dense smoke stops the ray");

        assert!(!hit.inside);
        assert!((hit.t - 4.0).abs() < 1e-3, "t = {}", hit.t);
    }

    #[test]
    fn test_ray_from_inside() {
        let smoke = SmokeBox::new(Vec3::splat(2.0), 1e6, MaterialId::default());
        let hit = local_hit(&smoke, Ray::new(Vec3::ZERO, Vec3::Y)).expect("hit inside");

        assert!(hit.inside);
        assert!(hit.t < 0.01);
    }

    #[test]
    fn test_same_ray_same_distance() {
        let smoke = SmokeBox::new(Vec3::splat(20.0), 0.3, MaterialId::default());
        let ray = Ray::new(Vec3::new(0.1, 0.2, -30.0), Vec3::new(0.0, 0.01, 1.0));

        let a = local_hit(&smoke, ray).map(|h| h.t);
        let b = local_hit(&smoke, ray).map(|h| h.t);
        assert_eq!(a, b);

        let reseeded = smoke.clone().with_seed(99);
        let distances: Vec<_> = (0..20)
            .map(|i| {
                let ray = ray.with_interval(Interval::new(i as f32 * 1e-3, f32::MAX));
                local_hit(&reseeded, ray).map(|h| h.t)
            })
            .collect();
        assert!(distances.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_mean_free_path() {
        let mut rng = StdRng::seed_from_u64(42);
        let smoke = SmokeBox::new(Vec3::new(1.0, 1.0, 1000.0), 0.5, MaterialId::default());

        let n = 2000;
        let total: f32 = (0..n)
            .map(|_| {
                let ray = jittered_ray(&mut rng, -510.0);
                let hit = local_hit(&smoke, ray).expect("box is far thicker than the path");
                hit.t - 10.0
            })
            .sum();
        let mean = total / n as f32;

        assert!((mean - 2.0).abs() < 0.2, "mean free path {mean}");
    }

    #[test]
    fn test_transmittance_follows_beer_lambert() {
        let mut rng = StdRng::seed_from_u64(42);
        let smoke = SmokeBox::new(Vec3::new(1.0, 1.0, 2.0), 0.5, MaterialId::default());

        let n = 4000;
        let passed = (0..n)
            .filter(|_| local_hit(&smoke, jittered_ray(&mut rng, -5.0)).is_none())
            .count();
        let fraction = passed as f32 / n as f32;

        assert!((fraction - (-1.0f32).exp()).abs() < 0.03, "transmittance {fraction}");
    }

    #[test]
    fn test_fog_scatters_isotropically() {
        let mut rng = StdRng::seed_from_u64(42);
        let fog = Fog::new(Color::new(0.9, 0.7, 0.3));
        let mut hit = Intersect::new(Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::Z));
        hit.t = 1.0;

        let mut forward = 0;
        for _ in 0..1000 {
            let scatter = fog.scatter(&hit, &mut rng);
            assert!((scatter.ray.direction.length() - 1.0).abs() < 1e-4);
            assert_eq!(scatter.attenuation, Color::new(0.9, 0.7, 0.3));
            assert!(!scatter.is_terminal());
            if scatter.ray.direction.z > 0.0 {
                forward += 1;
            }
        }
        assert!((400..600).contains(&forward), "{forward} of 1000 went forward");
    }

    #[test]
    fn test_smoke_instance_in_scene() {
        let mut builder = SceneBuilder::new(Color::ZERO);
        let white = builder.add_material(Diffuse::new(Color::ONE));
        let fog = builder.add_material(Fog::new(Color::ONE));
        builder.add(Sphere::new(1.0, white), Axis::IDENTITY);
        let smoke = builder.add(
            SmokeBox::new(Vec3::splat(1.0), 1e6, fog),
            Axis::translation(Vec3::new(0.0, 0.0, 3.0)).with_scale(2.0),
        );
        let scene = builder.build(&BvhSettings::default()).expect("valid scene");

        let mut hit = scene
            .hit(&Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z))
            .expect("ray hits the smoke");
        scene.complete(&mut hit);

        // Scaled box spans z in [2, 4]
        assert!((hit.t - 6.0).abs() < 1e-3, "t = {}", hit.t);
        assert!(std::ptr::eq(
            hit.instance.expect("instance set"),
            scene.instance(smoke).expect("instance exists")
        ));
        assert!((hit.normal - Vec3::Z).length() < 1e-4);
    }
}
