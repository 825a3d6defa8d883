//! Error types for scene construction and rendering.

use thiserror::Error;

use crate::{MaterialId, PrimitiveId};

/// Errors raised when a scene builder is turned into a scene.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("primitive {primitive} references unknown material {material:?}")]
    UnknownMaterial {
        primitive: usize,
        material: MaterialId,
    },

    #[error("instance {instance} references unknown primitive {primitive:?}")]
    UnknownPrimitive {
        instance: usize,
        primitive: PrimitiveId,
    },
}

/// Errors raised when a frame cannot be started.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("frame size {width}x{height} has no pixels")]
    EmptyFrame { width: u32, height: u32 },

    #[error("at least one worker is required")]
    NoWorkers,

    #[error("at least one sample per pixel is required")]
    NoSamples,

    #[error("job chunk size must be positive")]
    ZeroChunkSize,

    #[error("march setting {field} = {value} is out of range")]
    InvalidMarch { field: &'static str, value: f32 },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors raised while assembling a triangle mesh.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{attribute} count {found} does not match vertex count {expected}")]
    AttributeCount {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },
}
