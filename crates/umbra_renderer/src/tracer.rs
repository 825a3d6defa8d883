//! Recursive path tracing integrator.
//!
//! Implements Monte Carlo path tracing with:
//! - Recursive ray tracing with a bounce limit
//! - Anti-aliasing via jittered multi-sampling
//! - Optional early exit once a pixel's samples agree

use crate::settings::MIN_TOLERANCE_SAMPLES;
use crate::{Camera, RenderSettings, Scene};
use rand::RngCore;
use umbra_math::{Color, Ray};

/// Running per-channel mean and variance (Welford's method).
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorStats {
    count: u32,
    mean: Color,
    m2: Color,
}

impl ColorStats {
    pub fn add(&mut self, sample: Color) {
        self.count += 1;
        let delta = sample - self.mean;
        self.mean += delta / self.count as f32;
        self.m2 += delta * (sample - self.mean);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mean(&self) -> Color {
        self.mean
    }

    /// Sample variance per channel, zero until two samples exist.
    pub fn variance(&self) -> Color {
        if self.count < 2 {
            Color::ZERO
        } else {
            self.m2 / (self.count - 1) as f32
        }
    }

    pub fn std_dev(&self) -> Color {
        self.variance().max(Color::ZERO).powf(0.5)
    }
}

/// Traces rays through a scene, counting every ray it casts.
pub struct Tracer<'a> {
    scene: &'a Scene,
    max_depth: u32,
    epsilon: f32,
    rays: u64,
}

impl<'a> Tracer<'a> {
    pub fn new(scene: &'a Scene, max_depth: u32, epsilon: f32) -> Self {
        Self {
            scene,
            max_depth,
            epsilon,
            rays: 0,
        }
    }

    pub fn from_settings(scene: &'a Scene, settings: &RenderSettings) -> Self {
        Self::new(scene, settings.max_depth, settings.ray_epsilon)
    }

    /// Rays cast since creation.
    pub fn ray_count(&self) -> u64 {
        self.rays
    }

    /// Radiance arriving along `ray`.
    ///
    /// Depth 0 is a primary ray. At most `max_depth + 1` rays are cast per
    /// call chain; at the depth limit only emission is returned.
    pub fn trace(&mut self, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> Color {
        self.rays += 1;

        let Some(mut hit) = self.scene.hit(ray) else {
            return self.scene.background();
        };
        self.scene.complete(&mut hit);
        hit.trace_depth = depth;

        let Some(material) = self.scene.material_of(&hit) else {
            return self.scene.background();
        };
        let scatter = material.scatter(&hit, rng);

        if depth >= self.max_depth || scatter.is_terminal() {
            return scatter.emitted;
        }

        let next = scatter.ray.nudged(self.epsilon);
        scatter.emitted + scatter.attenuation * self.trace(&next, depth + 1, rng)
    }

    /// Average radiance through pixel (x, y).
    ///
    /// Takes up to `samples` jittered camera rays. With a positive
    /// `tolerance`, stops once at least 16 samples were taken and the summed
    /// per-channel standard deviation drops below it.
    pub fn sample_pixel(
        &mut self,
        camera: &Camera,
        size: (u32, u32),
        pixel: (u32, u32),
        samples: u32,
        tolerance: f32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let mut stats = ColorStats::default();

        for _ in 0..samples.max(1) {
            let ray = camera.ray(size.0, size.1, pixel.0, pixel.1, rng);
            stats.add(self.trace(&ray, 0, rng));

            if tolerance > 0.0
                && stats.count() >= MIN_TOLERANCE_SAMPLES
                && stats.std_dev().element_sum() < tolerance
            {
                break;
            }
        }

        stats.mean()
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to 8-bit RGB: clamp, gamma 2, round.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    let channel = |c: f32| (255.0 * linear_to_gamma(c.clamp(0.0, 1.0)) + 0.5) as u8;
    [channel(color.x), channel(color.y), channel(color.z)]
}
