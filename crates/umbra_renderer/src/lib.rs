//! Umbra - CPU path tracer
//!
//! A Monte Carlo path tracer over analytic primitives, triangle meshes and
//! ray-marched distance fields. Scenes are built once into an immutable arena
//! with a BVH over instances; frames are rendered by a pool of worker threads
//! pulling scanline jobs from a shared queue.

mod bvh;
mod camera;
mod cuboid;
mod error;
mod frame;
mod intersect;
mod jobs;
mod march;
mod marched;
mod material;
mod mesh;
mod output;
mod plane;
mod primitive;
pub mod sampling;
mod scene;
pub mod sdf;
mod settings;
mod sphere;
mod tracer;
mod volume;

pub use bvh::{Bvh, BvhHit, BvhNode};
pub use camera::Camera;
pub use cuboid::Cuboid;
pub use error::{MeshError, RenderError, SceneError};
pub use frame::{Frame, FrameStats, PixelJob};
pub use intersect::Intersect;
pub use jobs::{Job, JobContext, JobQueue, Worker};
pub use march::{march, surface_normal, DistanceField, March};
pub use marched::Marched;
pub use material::{
    escape_time, Checkered, Diffuse, Glass, IterationShade, Light, Mandelbrot, MarchCost,
    Material, Metal, NormalShade, Scatter,
};
pub use mesh::{intersect_triangle, Mesh, MeshData, TriangleHit};
pub use output::OutputImage;
pub use plane::{Disc, Plane, Rectangle};
pub use primitive::{Primitive, PrimitiveInstance};
pub use scene::{InstanceId, MaterialId, PrimitiveId, Scene, SceneBuilder};
pub use settings::{BvhSettings, MarchSettings, RenderSettings, MIN_TOLERANCE_SAMPLES};
pub use sphere::{spherical_uv, Sphere};
pub use tracer::{color_to_rgb, linear_to_gamma, ColorStats, Tracer};
pub use volume::{Fog, SmokeBox};

/// Re-export the math types used throughout the public API
pub use umbra_math::{Aabb, Axis, Color, Interval, Ray, Vec2, Vec3};
