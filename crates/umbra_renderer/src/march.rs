//! Sphere tracing of signed distance fields.

use crate::MarchSettings;
use umbra_math::{Ray, Vec3};

/// A signed distance function: negative inside, positive outside.
///
/// Estimates may be inexact as long as they keep the sign and roughly track
/// the true distance; the marcher's step scale compensates for fields that
/// overestimate.
pub trait DistanceField: Send + Sync {
    fn distance(&self, p: Vec3) -> f32;

    /// Iteration count of an escape-time fractal at `p`, zero otherwise.
    fn iterations(&self, _p: Vec3) -> u32 {
        0
    }
}

impl<F: Fn(Vec3) -> f32 + Send + Sync> DistanceField for F {
    fn distance(&self, p: Vec3) -> f32 {
        self(p)
    }
}

/// Outcome of a march along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct March {
    /// Ray parameter of the surface, negative on a miss
    pub t: f32,
    /// Field evaluations after the first
    pub steps: u32,
    /// The ray started inside the surface
    pub inside: bool,
}

impl March {
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t >= 0.0
    }
}

/// March `ray` from its interval minimum towards `max_dist`.
///
/// Steps are the field value scaled by `step_scale / |direction|`, so they are
/// measured in ray parameter units. Starting inside flips the sign so steps
/// still advance. A sign change between consecutive estimates means the
/// surface was crossed; the step scale is then damped and the march walks
/// back. A step no larger than `epsilon` is a hit. Settings that fail
/// [`MarchSettings::validate`] never hit.
pub fn march<F>(ray: &Ray, max_dist: f32, field: &F, settings: &MarchSettings) -> March
where
    F: DistanceField + ?Sized,
{
    let mut result = March {
        t: -1.0,
        steps: 0,
        inside: false,
    };

    let length = ray.direction.length();
    if length == 0.0 || !length.is_finite() || settings.validate().is_err() {
        return result;
    }

    let mut scale = settings.step_scale / length;
    let mut t = ray.interval.min;
    let start = field.distance(ray.at(t));
    result.inside = start < 0.0;
    if result.inside {
        scale = -scale;
    }

    let mut dt = start * scale;
    while result.steps < settings.max_iterations {
        if dt.abs() <= settings.epsilon {
            if ray.contains(t) && t <= max_dist {
                result.t = t;
            }
            return result;
        }
        if dt > max_dist || t > max_dist {
            return result;
        }

        t += dt;
        let mut next = field.distance(ray.at(t)) * scale;
        result.steps += 1;

        if dt * next < -settings.margin {
            scale *= settings.damping;
            next *= settings.damping;
        }
        dt = next;
    }

    result
}

/// Outward normal by central differences of the field.
pub fn surface_normal<F>(field: &F, p: Vec3, epsilon: f32) -> Vec3
where
    F: DistanceField + ?Sized,
{
    let dx = Vec3::new(epsilon, 0.0, 0.0);
    let dy = Vec3::new(0.0, epsilon, 0.0);
    let dz = Vec3::new(0.0, 0.0, epsilon);

    Vec3::new(
        field.distance(p + dx) - field.distance(p - dx),
        field.distance(p + dy) - field.distance(p - dy),
        field.distance(p + dz) - field.distance(p - dz),
    )
    .normalize_or_zero()
}
