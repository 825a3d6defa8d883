//! Hit record threaded through the two-phase intersection protocol.

use crate::PrimitiveInstance;
use umbra_math::{Ray, Vec2, Vec3};

/// Record of a ray-primitive intersection.
///
/// Filled in two phases. `hit` sets only `t`, `inside`, the instance and
/// shape-private bookkeeping (triangle, barycentrics, march steps).
/// `intersect` then completes position, normal and UV for the winning
/// candidate only. The record is `Copy` so candidates can be tested on a
/// scratch copy and kept only when closer.
#[derive(Debug, Clone, Copy)]
pub struct Intersect<'a> {
    /// Ray in world space
    pub view_ray: Ray,
    /// Ray in the local space of the instance being tested
    pub local_ray: Ray,
    /// Instance that produced the hit
    pub instance: Option<&'a PrimitiveInstance>,
    /// Ray parameter of the hit, negative when there is none
    pub t: f32,
    /// Hit position (world space once completed)
    pub position: Vec3,
    /// Unit outward surface normal (world space once completed)
    pub normal: Vec3,
    /// Surface coordinates in [0,1]^2
    pub uv: Vec2,
    /// Ray started inside the primitive
    pub inside: bool,
    /// Triangle index for meshes
    pub triangle: Option<u32>,
    /// Barycentric (u, v) on the hit triangle
    pub barycentric: Vec2,
    /// Marching steps spent finding the surface
    pub march_steps: u32,
    /// Fractal iterations at the hit point
    pub iterations: u32,
    /// Bounce depth of the ray that made this hit
    pub trace_depth: u32,
}

impl<'a> Intersect<'a> {
    pub fn new(view_ray: Ray) -> Self {
        Self {
            view_ray,
            local_ray: view_ray,
            instance: None,
            t: -1.0,
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
            inside: false,
            triangle: None,
            barycentric: Vec2::ZERO,
            march_steps: 0,
            iterations: 0,
            trace_depth: 0,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t >= 0.0
    }

    /// Normal flipped to face the incoming ray.
    pub fn facing_normal(&self) -> Vec3 {
        if self.view_ray.direction.dot(self.normal) > 0.0 {
            -self.normal
        } else {
            self.normal
        }
    }

    /// Unit direction of the incoming world ray.
    pub fn view_direction(&self) -> Vec3 {
        self.view_ray.direction.normalize_or_zero()
    }
}
