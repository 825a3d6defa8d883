//! Camera for ray generation.

use crate::sampling::random_in_unit_disc;
use rand::{Rng, RngCore};
use umbra_math::{Axis, Ray, Vec3};

/// Thin-lens pinhole camera.
///
/// The frame's x axis points to the viewer's left, y up and z along the view
/// direction. Pixel (0, 0) is the top-left corner.
#[derive(Debug, Clone)]
pub struct Camera {
    axis: Axis,
    /// Vertical field of view in radians
    fov: f32,
    /// Lens diameter, 0.0 = pinhole
    aperture: f32,
    /// Distance to the plane of perfect focus
    focus_distance: f32,
}

impl Camera {
    /// Camera at `origin` looking at `target` with +Y up, 60 degree field of
    /// view and focus on the target.
    pub fn new(origin: Vec3, target: Vec3) -> Self {
        Self {
            axis: Axis::look_at(origin, target, Vec3::Y),
            fov: 60f32.to_radians(),
            aperture: 0.0,
            focus_distance: (target - origin).length().max(f32::EPSILON),
        }
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        let target = self.axis.origin() + self.axis.z();
        self.axis = Axis::look_at(self.axis.origin(), target, up);
        self
    }

    /// Vertical field of view in degrees.
    pub fn with_fov(mut self, degrees: f32) -> Self {
        self.fov = degrees.clamp(1.0, 179.0).to_radians();
        self
    }

    pub fn with_lens(mut self, aperture: f32, focus_distance: f32) -> Self {
        self.aperture = aperture.max(0.0);
        self.focus_distance = focus_distance.max(f32::EPSILON);
        self
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn origin(&self) -> Vec3 {
        self.axis.origin()
    }

    /// Jittered primary ray through pixel (x, y) of a `width` x `height`
    /// viewport.
    pub fn ray(&self, width: u32, height: u32, x: u32, y: u32, rng: &mut dyn RngCore) -> Ray {
        let jitter_x: f32 = rng.gen();
        let jitter_y: f32 = rng.gen();
        self.ray_at(
            width,
            height,
            x as f32 + jitter_x,
            y as f32 + jitter_y,
            rng,
        )
    }

    /// Primary ray through a continuous viewport position.
    pub fn ray_at(&self, width: u32, height: u32, px: f32, py: f32, rng: &mut dyn RngCore) -> Ray {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let aspect = w / h;
        let half_height = (self.fov * 0.5).tan();

        let sx = (1.0 - 2.0 * px / w) * half_height * aspect;
        let sy = (1.0 - 2.0 * py / h) * half_height;

        let lens = if self.aperture > 0.0 {
            let disc = random_in_unit_disc(rng) * self.aperture * 0.5;
            Vec3::new(disc.x, disc.y, 0.0)
        } else {
            Vec3::ZERO
        };
        let focus = Vec3::new(sx, sy, 1.0) * self.focus_distance;

        let origin = self.axis.point_from_local(lens);
        let direction = self.axis.direction_from_local(focus - lens).normalize();
        Ray::primary(origin, direction)
    }
}
