//! Signed distance fields for the ray-marched primitives.

use crate::DistanceField;
use rand::{Rng, RngCore};
use std::f32::consts::PI;
use umbra_math::{Mat3, Vec2, Vec3};

/// Exact sphere field.
#[derive(Debug, Clone, Copy)]
pub struct SphereField {
    pub radius: f32,
}

impl DistanceField for SphereField {
    fn distance(&self, p: Vec3) -> f32 {
        p.length() - self.radius
    }
}

/// Sphere with a sinusoidal bump pattern on its surface.
#[derive(Debug, Clone, Copy)]
pub struct WavySphere {
    pub radius: f32,
    pub amplitude: f32,
}

impl DistanceField for WavySphere {
    fn distance(&self, p: Vec3) -> f32 {
        let q = p * 0.5;
        p.length() - self.radius + self.amplitude * q.x.sin() * q.y.sin() * q.z.sin()
    }
}

/// Sphere whose surface waves twist around the Y axis with height.
#[derive(Debug, Clone, Copy)]
pub struct Swirl {
    pub radius: f32,
    pub wave_height: f32,
}

impl DistanceField for Swirl {
    fn distance(&self, p: Vec3) -> f32 {
        let twisted = Mat3::from_rotation_y(p.y / 6.0) * p;
        let frequency = 8.0 / self.radius;
        p.length()
            - self.radius
            - self.wave_height * (twisted.x * frequency).sin() * (twisted.z * frequency).sin()
    }
}

/// Torus in the XZ plane.
#[derive(Debug, Clone, Copy)]
pub struct Torus {
    /// Distance from the centre to the tube centre
    pub major: f32,
    /// Tube radius
    pub minor: f32,
}

impl DistanceField for Torus {
    fn distance(&self, p: Vec3) -> f32 {
        let q = Vec2::new(Vec2::new(p.x, p.z).length() - self.major, p.y);
        q.length() - self.minor
    }
}

/// Mandelbulb distance estimator.
#[derive(Debug, Clone, Copy)]
pub struct Mandelbulb {
    pub power: f32,
    pub bailout: f32,
    pub max_iterations: u32,
}

impl Default for Mandelbulb {
    fn default() -> Self {
        Self {
            power: 8.0,
            bailout: 2.0,
            max_iterations: 200,
        }
    }
}

impl Mandelbulb {
    /// Escape-time iteration returning (distance estimate, iterations).
    pub fn estimate(&self, p: Vec3) -> (f32, u32) {
        let mut z = p;
        let mut dr = 1.0;
        let mut r = 0.0;
        let mut i = 0;

        while i < self.max_iterations {
            r = z.length();
            if r > self.bailout {
                break;
            }

            // Polar form, raised to the power and rotated
            let theta = if r > 0.0 { (z.z / r).clamp(-1.0, 1.0).acos() } else { 0.0 };
            let phi = z.y.atan2(z.x);
            dr = r.powf(self.power - 1.0) * self.power * dr + 1.0;

            let zr = r.powf(self.power);
            let theta = theta * self.power;
            let phi = phi * self.power;

            z = zr * Vec3::new(theta.sin() * phi.cos(), phi.sin() * theta.sin(), theta.cos()) + p;
            i += 1;
        }

        // ln(0) at the exact origin would poison the march
        let r = r.max(f32::MIN_POSITIVE);
        (0.5 * r.ln() * r / dr, i)
    }
}

impl DistanceField for Mandelbulb {
    fn distance(&self, p: Vec3) -> f32 {
        self.estimate(p).0
    }

    fn iterations(&self, p: Vec3) -> u32 {
        self.estimate(p).1
    }
}

/// Metaballs blended with an exponential smooth minimum.
#[derive(Debug, Clone)]
pub struct Bubbles {
    spheres: Vec<(Vec3, f32)>,
    /// Blend sharpness; larger values give crisper junctions
    pub k: f32,
}

impl Bubbles {
    pub fn new(spheres: Vec<(Vec3, f32)>, k: f32) -> Self {
        Self { spheres, k }
    }

    /// Sixteen bubbles on a double helix filling a column of the given height.
    pub fn helix(height: f32, angle: f32) -> Self {
        let n = 16;
        let spheres = (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let a = t * PI * 4.0 + angle;
                let center = Vec3::new(
                    0.45 * height * a.sin(),
                    (t - 0.5) * height,
                    0.45 * height * a.cos(),
                );
                let radius = ((t / 0.3).fract() + 0.1) * height * 0.1;
                (center, radius)
            })
            .collect();
        Self::new(spheres, 4.0)
    }

    /// Randomly placed bubbles inside a cube of half size `extent`.
    pub fn random(count: usize, extent: f32, rng: &mut dyn RngCore) -> Self {
        let spheres = (0..count)
            .map(|_| {
                let center = Vec3::new(
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                ) * 0.6;
                (center, rng.gen_range(0.1..0.3) * extent)
            })
            .collect();
        Self::new(spheres, 4.0)
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }
}

impl DistanceField for Bubbles {
    fn distance(&self, p: Vec3) -> f32 {
        let sum: f32 = self
            .spheres
            .iter()
            .map(|(c, r)| (-self.k * ((p - *c).length() - r)).exp())
            .sum();
        if sum <= 0.0 {
            return f32::MAX;
        }
        -sum.ln() / self.k
    }
}
