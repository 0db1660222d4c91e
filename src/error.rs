//! Error and diagnostic types for the BSP loader.

use serde::Serialize;
use thiserror::Error;

use crate::bsp::header::LumpKind;

/// Result type alias using BspError.
pub type Result<T> = std::result::Result<T, BspError>;

/// Hard errors: nothing useful can be returned to the caller.
///
/// Everything past the map header decodes best-effort and surfaces problems
/// as [`Diagnostic`] values instead.
#[derive(Error, Debug)]
pub enum BspError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode or decode an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Buffer too short to hold the structure being read.
    #[error("Buffer truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The archive does not start with the PACK magic.
    #[error("Not a PAK archive (bad magic)")]
    NotAPack,

    /// Named entry missing from the archive directory.
    #[error("Archive entry not found: {0}")]
    EntryNotFound(String),

    /// An archive entry's byte range lies outside the archive data.
    #[error("Archive entry {name:?} range {offset}+{length} exceeds {size} byte archive")]
    EntryOutOfBounds {
        name: String,
        offset: u32,
        length: u32,
        size: usize,
    },

    /// No free atlas region can hold the requested rectangle.
    #[error("No free atlas region fits {width}x{height}")]
    AtlasFull { width: u32, height: u32 },

    /// Pixel buffer handed to the atlas has the wrong length.
    #[error("Atlas pixel buffer is {actual} bytes, expected {expected}")]
    AtlasPixelSize { expected: usize, actual: usize },

    /// Palette data is not 256 RGB triplets.
    #[error("Palette is {0} bytes, expected 768")]
    PaletteSize(usize),
}

/// A non-fatal decode event.
///
/// Diagnostics are collected while loading; the affected record or lump is
/// skipped and decoding continues. The caller decides whether a degraded
/// load is acceptable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Format-version tag did not match; decoding proceeds best-effort.
    #[error("unexpected BSP version {found} (expected {expected})")]
    UnexpectedVersion { found: i32, expected: i32 },

    /// Lump byte length is not an exact multiple of its record size.
    #[error("{lump} lump length {length} is not a multiple of {record_size}-byte records")]
    NonIntegralLump {
        lump: LumpKind,
        length: u32,
        record_size: u32,
    },

    /// Lump byte range exceeds the map buffer.
    #[error("{lump} lump range {offset}+{length} exceeds {buffer} byte buffer")]
    LumpOutOfBounds {
        lump: LumpKind,
        offset: u32,
        length: u32,
        buffer: usize,
    },

    /// A record references another lump with an index past its record count.
    #[error("{lump} record {record} has {target} index {index} out of {limit}")]
    IndexOutOfRange {
        lump: LumpKind,
        record: usize,
        target: LumpKind,
        index: i64,
        limit: usize,
    },

    /// Archive directory length is not a multiple of the entry size.
    #[error("archive directory length {length} is not a multiple of {entry_size}-byte entries")]
    RaggedDirectory { length: u32, entry_size: u32 },

    /// A mip texture header or mip byte range lies outside its lump.
    #[error("mip texture {texture} data lies outside the texture lump")]
    MipOutOfBounds { texture: usize },

    /// A face's edge loop is too short to triangulate; the face is dropped.
    #[error("face {face} has {edges} edges, need at least 3")]
    DegenerateFace { face: usize, edges: u16 },
}

impl Diagnostic {
    /// Whether this event marks the load as structurally degraded.
    ///
    /// Degenerate faces occur in real assets and only cost their own
    /// geometry; everything else signals a corrupt or unsupported buffer.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Diagnostic::DegenerateFace { .. })
    }
}
