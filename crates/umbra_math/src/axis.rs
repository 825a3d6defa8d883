//! Rigid frame with uniform scale.
//!
//! An [`Axis`] places primitives in the world and orients the camera. Mapping
//! a ray into local space scales the direction together with the origin, so a
//! ray parameter `t` means the same point in both spaces.

use glam::{EulerRot, Mat3, Vec3};

use crate::{Aabb, Ray};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Axis {
    basis: Mat3,
    origin: Vec3,
    scale: f32,
}

impl Axis {
    pub const IDENTITY: Axis = Axis {
        basis: Mat3::IDENTITY,
        origin: Vec3::ZERO,
        scale: 1.0,
    };

    /// Identity rotation at `origin`.
    pub fn translation(origin: Vec3) -> Self {
        Self {
            origin,
            ..Self::IDENTITY
        }
    }

    /// Rotation given as Euler angles in radians, applied Z then Y then X.
    pub fn euler_zyx(origin: Vec3, rotation: Vec3, scale: f32) -> Self {
        Self {
            basis: Mat3::from_euler(EulerRot::ZYX, rotation.z, rotation.y, rotation.x),
            origin,
            scale,
        }
    }

    /// Frame at `origin` whose z axis points at `target`.
    ///
    /// The x axis points to the viewer's left and y is the corrected up
    /// vector. Falls back to the world axes when `target` coincides with
    /// `origin` or `up` is parallel to the view direction.
    pub fn look_at(origin: Vec3, target: Vec3, up: Vec3) -> Self {
        let forward = (target - origin).normalize_or_zero();
        let mut left = up.cross(forward).normalize_or_zero();
        if forward == Vec3::ZERO {
            return Self::translation(origin);
        }
        if left == Vec3::ZERO {
            left = forward.any_orthonormal_vector();
        }
        let up = forward.cross(left);

        Self {
            basis: Mat3::from_cols(left, up, forward),
            origin,
            scale: 1.0,
        }
    }

    /// Same frame with a different uniform scale.
    pub fn with_scale(self, scale: f32) -> Self {
        Self { scale, ..self }
    }

    /// Same frame moved to `origin`.
    pub fn with_origin(self, origin: Vec3) -> Self {
        Self { origin, ..self }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    pub fn x(&self) -> Vec3 {
        self.basis.x_axis
    }

    #[inline]
    pub fn y(&self) -> Vec3 {
        self.basis.y_axis
    }

    #[inline]
    pub fn z(&self) -> Vec3 {
        self.basis.z_axis
    }

    #[inline]
    pub fn point_to_local(&self, p: Vec3) -> Vec3 {
        self.basis.transpose() * (p - self.origin) / self.scale
    }

    #[inline]
    pub fn point_from_local(&self, p: Vec3) -> Vec3 {
        self.basis * (p * self.scale) + self.origin
    }

    #[inline]
    pub fn direction_to_local(&self, d: Vec3) -> Vec3 {
        self.basis.transpose() * d / self.scale
    }

    #[inline]
    pub fn direction_from_local(&self, d: Vec3) -> Vec3 {
        self.basis * (d * self.scale)
    }

    /// Rotate a local unit normal into world space. Scale is uniform, so
    /// the rotation alone keeps it perpendicular and unit length.
    #[inline]
    pub fn normal_from_local(&self, n: Vec3) -> Vec3 {
        self.basis * n
    }

    /// Map a world ray into this frame, keeping its parameter range.
    pub fn ray_to_local(&self, ray: &Ray) -> Ray {
        Ray {
            primary: ray.primary,
            ..Ray::new(self.point_to_local(ray.origin), self.direction_to_local(ray.direction))
        }
        .with_interval(ray.interval)
    }

    pub fn ray_from_local(&self, ray: &Ray) -> Ray {
        Ray {
            primary: ray.primary,
            ..Ray::new(self.point_from_local(ray.origin), self.direction_from_local(ray.direction))
        }
        .with_interval(ray.interval)
    }

    /// World bounds of local bounds: the box around the 8 mapped corners.
    pub fn transform_bounds(&self, bounds: &Aabb) -> Aabb {
        if bounds.is_empty() {
            return Aabb::EMPTY;
        }

        let corners = bounds.corners().map(|c| self.point_from_local(c));
        let lo = corners.iter().copied().fold(Vec3::INFINITY, Vec3::min);
        let hi = corners.iter().copied().fold(Vec3::NEG_INFINITY, Vec3::max);
        Aabb::from_points(lo, hi)
    }
}

impl Default for Axis {
    fn default() -> Self {
        Self::IDENTITY
    }
}
