//! Render, marching and BVH configuration.
//!
//! All settings deserialize with defaults for missing fields so a partial
//! JSON file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Frame-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Worker thread count
    pub workers: usize,
    /// Maximum samples per pixel
    pub samples: u32,
    /// Maximum bounce depth (0 = primary rays only)
    pub max_depth: u32,
    /// Early-exit threshold on the summed per-channel standard deviation.
    /// Zero disables early exit.
    pub color_tolerance: f32,
    /// Seed for job shuffling and per-worker generators
    pub seed: u64,
    /// Jobs taken from the queue per lock
    pub chunk_size: usize,
    /// Randomize scanline order
    pub shuffle: bool,
    /// Offset applied to scattered ray origins
    pub ray_epsilon: f32,
}

/// Minimum samples taken before the color tolerance can stop a pixel.
pub const MIN_TOLERANCE_SAMPLES: u32 = 16;

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            workers: default_workers(),
            samples: 64,
            max_depth: 16,
            color_tolerance: 0.0,
            seed: 0,
            chunk_size: 4,
            shuffle: true,
            ray_epsilon: 1e-4,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        if self.workers == 0 {
            return Err(RenderError::NoWorkers);
        }
        if self.samples == 0 {
            return Err(RenderError::NoSamples);
        }
        if self.chunk_size == 0 {
            return Err(RenderError::ZeroChunkSize);
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Twice the hardware concurrency, so workers blocked on the queue lock do
/// not leave cores idle.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(2)
}

/// Ray-marching parameters for implicit surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchSettings {
    /// A step at or below this size is a surface hit
    pub epsilon: f32,
    /// Step cap per ray
    pub max_iterations: u32,
    /// Multiplier on the distance estimate; below 1 for fields that
    /// overestimate distance
    pub step_scale: f32,
    /// Step scale factor applied after crossing the surface
    pub damping: f32,
    /// Sign-change product below `-margin` counts as an overshoot
    pub margin: f32,
    /// Central-difference offset for normals
    pub normal_epsilon: f32,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            max_iterations: 100_000,
            step_scale: 1.0,
            damping: 0.5,
            margin: 0.0,
            normal_epsilon: 1e-4,
        }
    }
}

impl MarchSettings {
    /// Same settings with a different step scale.
    pub fn with_step_scale(self, step_scale: f32) -> Self {
        Self { step_scale, ..self }
    }

    /// Reject settings that would stall or run away: a march with a zero
    /// step scale never advances, and one with damping above 1 grows its
    /// step on every overshoot.
    pub fn validate(&self) -> Result<(), RenderError> {
        let positive = [
            ("epsilon", self.epsilon),
            ("step_scale", self.step_scale),
            ("normal_epsilon", self.normal_epsilon),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RenderError::InvalidMarch { field, value });
            }
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(RenderError::InvalidMarch {
                field: "damping",
                value: self.damping,
            });
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(RenderError::InvalidMarch {
                field: "margin",
                value: self.margin,
            });
        }
        if self.max_iterations == 0 {
            return Err(RenderError::InvalidMarch {
                field: "max_iterations",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// BVH build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Leaves hold at most this many items unless the depth cap is reached
    pub min_leaf_size: usize,
    /// Depth at which the build stops splitting
    pub max_depth: u32,
}

impl BvhSettings {
    /// Defaults for triangle meshes.
    pub const MESH: BvhSettings = BvhSettings {
        min_leaf_size: 4,
        max_depth: 16,
    };
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            min_leaf_size: 2,
            max_depth: 16,
        }
    }
}
