//! Shared types used throughout the library.

use glam::{Vec2, Vec3};

/// An axis-aligned bounding box in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A bounding box stored as 16-bit integer coordinates, as nodes and leaves
/// carry them in the map format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortBounds {
    pub min: [u16; 3],
    pub max: [u16; 3],
}

/// A resolved boundary vertex: world position plus texture-space UV.
///
/// UVs are in texel units; consumers divide by the texture dimensions when
/// normalized coordinates are needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceVertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl FaceVertex {
    pub fn new(position: Vec3, uv: Vec2) -> Self {
        Self { position, uv }
    }
}

/// Per-leaf ambient sound levels, one byte per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ambience {
    pub water: u8,
    pub sky: u8,
    pub slime: u8,
    pub lava: u8,
}
