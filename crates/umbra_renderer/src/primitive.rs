//! Primitive trait and placed primitive instances.

use crate::{Intersect, MaterialId, PrimitiveId};
use umbra_math::{Aabb, Axis};

/// A shape in its own local space.
///
/// Intersection is split in two so the expensive part runs once per ray:
///
/// 1. [`Primitive::hit`] reads `hit.local_ray` and sets `t` (within the local
///    ray's interval), `inside` and any bookkeeping `intersect` needs later.
/// 2. [`Primitive::intersect`] runs on the closest candidate only. On entry
///    `hit.position` holds the local hit point; it fills the unit outward
///    normal and UV (and may refine the position).
pub trait Primitive: Send + Sync {
    /// Local-space bounds.
    fn bounds(&self) -> Aabb;

    fn hit(&self, hit: &mut Intersect<'_>) -> bool;

    fn intersect(&self, hit: &mut Intersect<'_>);

    fn material(&self) -> MaterialId;
}

/// A primitive placed in the world by an [`Axis`].
///
/// World bounds are computed eagerly and kept in sync with the axis. Several
/// instances may share one primitive.
#[derive(Debug, Clone)]
pub struct PrimitiveInstance {
    primitive: PrimitiveId,
    axis: Axis,
    local_bounds: Aabb,
    bounds: Aabb,
}

impl PrimitiveInstance {
    pub fn new(primitive: PrimitiveId, axis: Axis, local_bounds: Aabb) -> Self {
        Self {
            primitive,
            axis,
            local_bounds,
            bounds: axis.transform_bounds(&local_bounds),
        }
    }

    #[inline]
    pub fn primitive(&self) -> PrimitiveId {
        self.primitive
    }

    #[inline]
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// World-space bounds.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn set_axis(&mut self, axis: Axis) {
        self.axis = axis;
        self.bounds = axis.transform_bounds(&self.local_bounds);
    }

    /// Cheap phase: bounds check, map the view ray to local space, delegate.
    pub fn hit<'a>(&'a self, primitive: &dyn Primitive, hit: &mut Intersect<'a>) -> bool {
        if self.bounds.hit_distance(&hit.view_ray) < 0.0 {
            return false;
        }

        hit.local_ray = self.axis.ray_to_local(&hit.view_ray);
        if primitive.hit(hit) {
            hit.instance = Some(self);
            true
        } else {
            false
        }
    }

    /// Completion phase: local surface data mapped back to world space.
    pub fn intersect(&self, primitive: &dyn Primitive, hit: &mut Intersect<'_>) {
        hit.position = hit.local_ray.at(hit.t);
        primitive.intersect(hit);

        hit.position = self.axis.point_from_local(hit.position);
        hit.normal = self
            .axis
            .normal_from_local(hit.normal)
            .normalize_or_zero();
    }
}
