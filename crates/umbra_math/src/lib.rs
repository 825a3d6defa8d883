// Re-export glam for convenience
pub use glam::*;

// Umbra math types
mod aabb;
mod axis;
mod interval;
mod ray;

pub use aabb::{Aabb, SlabHit};
pub use axis::Axis;
pub use interval::Interval;
pub use ray::Ray;

/// Color value type shared by the renderer (linear RGB, unbounded).
pub type Color = Vec3;
