use crate::{Interval, Vec3};

/// A ray in 3D space.
///
/// The direction is not required to be unit length. The reciprocal direction
/// is computed once at construction so box tests can multiply instead of
/// divide, and the valid parameter range limits which hits are accepted.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub inv_direction: Vec3,
    pub interval: Interval,
    /// True for rays leaving the camera.
    pub primary: bool,
}

impl Ray {
    /// Smallest accepted ray parameter, keeps secondary rays from re-hitting
    /// the surface they start on.
    pub const MIN_DIST: f32 = 1e-4;
    pub const MAX_DIST: f32 = f32::MAX;

    /// Create a secondary ray with the default parameter range.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
            interval: Interval::new(Self::MIN_DIST, Self::MAX_DIST),
            primary: false,
        }
    }

    /// Create a camera ray.
    pub fn primary(origin: Vec3, direction: Vec3) -> Self {
        Self {
            primary: true,
            ..Self::new(origin, direction)
        }
    }

    /// Same ray with a different valid parameter range.
    #[inline]
    pub fn with_interval(&self, interval: Interval) -> Self {
        Self { interval, ..*self }
    }

    /// Same ray with a new upper parameter limit.
    #[inline]
    pub fn with_max(&self, max: f32) -> Self {
        self.with_interval(self.interval.with_max(max))
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Point along the ray at parameter t: origin + t * direction.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Whether `t` lies inside the valid parameter range.
    #[inline]
    pub fn contains(&self, t: f32) -> bool {
        self.interval.contains(t)
    }

    /// Move the origin `epsilon` along the unit direction.
    pub fn nudged(&self, epsilon: f32) -> Self {
        let offset = self.direction.normalize_or_zero() * epsilon;
        Self {
            origin: self.origin + offset,
            ..*self
        }
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}
