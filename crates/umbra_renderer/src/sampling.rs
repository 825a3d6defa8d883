//! Random sampling and reflection helpers.
//!
//! Every function takes the caller's generator so each worker samples from
//! its own seeded stream.

use rand::{Rng, RngCore};
use umbra_math::{Vec2, Vec3};

/// Uniform random point inside the unit sphere (rejection sampling).
pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if v.length_squared() < 1.0 {
            return v;
        }
    }
}

/// Uniform random direction on the unit sphere.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let v = random_in_unit_sphere(rng);
        let len_sq = v.length_squared();
        if len_sq > 1e-6 {
            return v / len_sq.sqrt();
        }
    }
}

/// Uniform random point inside the unit disc.
pub fn random_in_unit_disc(rng: &mut dyn RngCore) -> Vec2 {
    loop {
        let p = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with relative index `eta`.
///
/// Returns `None` on total internal reflection.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_theta = (-uv).dot(n).min(1.0);
    let k = 1.0 - eta * eta * (1.0 - cos_theta * cos_theta);
    if k < 0.0 {
        return None;
    }
    Some(eta * uv + (eta * cos_theta - k.sqrt()) * n)
}

/// Schlick's approximation for reflectance.
#[inline]
pub fn schlick(cosine: f32, eta: f32) -> f32 {
    let r0 = ((1.0 - eta) / (1.0 + eta)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let v = random_unit_vector(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_random_in_unit_disc() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(random_in_unit_disc(&mut rng).length() < 1.0);
        }
    }

    #[test]
    fn test_reflect() {
        let r = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y);
        assert_eq!(r, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_refract_straight_through() {
        let d = refract(-Vec3::Y, Vec3::Y, 1.0 / 1.5).expect("normal incidence refracts");
        assert!((d - (-Vec3::Y)).length() < 1e-5);
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        // Grazing ray leaving a dense medium
        let d = Vec3::new(1.0, -0.1, 0.0).normalize();
        assert!(refract(d, Vec3::Y, 1.5).is_none());
    }

    #[test]
    fn test_schlick_bounds() {
        assert!((schlick(1.0, 1.5) - 0.04).abs() < 1e-3);
        assert!((schlick(0.0, 1.5) - 1.0).abs() < 1e-5);
    }
}
