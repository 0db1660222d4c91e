//! Map buffer header: the fixed directory of lump byte ranges.

use serde::Serialize;

use crate::bsp::read;
use crate::error::{BspError, Diagnostic, Result};

/// The one format version this loader understands.
pub const BSP_VERSION: i32 = 29;

/// Version tag plus 15 offset/length pairs.
pub const HEADER_SIZE: usize = 124;

/// The 15 lumps of a map buffer, in directory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LumpKind {
    Entities,
    Planes,
    MipTextures,
    Vertices,
    Visibility,
    Nodes,
    TexInfo,
    Faces,
    Lightmaps,
    ClipNodes,
    Leaves,
    FaceList,
    Edges,
    EdgeList,
    Models,
}

impl LumpKind {
    /// All lumps in directory order.
    pub const ALL: [LumpKind; 15] = [
        LumpKind::Entities,
        LumpKind::Planes,
        LumpKind::MipTextures,
        LumpKind::Vertices,
        LumpKind::Visibility,
        LumpKind::Nodes,
        LumpKind::TexInfo,
        LumpKind::Faces,
        LumpKind::Lightmaps,
        LumpKind::ClipNodes,
        LumpKind::Leaves,
        LumpKind::FaceList,
        LumpKind::Edges,
        LumpKind::EdgeList,
        LumpKind::Models,
    ];

    /// Fixed record size in bytes, or 0 for variable-layout lumps
    /// (entities, mip textures, visibility, lightmaps).
    pub fn record_size(self) -> u32 {
        match self {
            LumpKind::Planes => 20,
            LumpKind::Vertices => 12,
            LumpKind::Nodes => 24,
            LumpKind::TexInfo => 40,
            LumpKind::Faces => 20,
            LumpKind::ClipNodes => 8,
            LumpKind::Leaves => 28,
            LumpKind::FaceList => 2,
            LumpKind::Edges => 4,
            LumpKind::EdgeList => 2,
            LumpKind::Models => 64,
            LumpKind::Entities
            | LumpKind::MipTextures
            | LumpKind::Visibility
            | LumpKind::Lightmaps => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LumpKind::Entities => "entities",
            LumpKind::Planes => "planes",
            LumpKind::MipTextures => "miptex",
            LumpKind::Vertices => "vertices",
            LumpKind::Visibility => "visilist",
            LumpKind::Nodes => "nodes",
            LumpKind::TexInfo => "texinfo",
            LumpKind::Faces => "faces",
            LumpKind::Lightmaps => "lightmaps",
            LumpKind::ClipNodes => "clipnodes",
            LumpKind::Leaves => "leaves",
            LumpKind::FaceList => "listfaces",
            LumpKind::Edges => "edges",
            LumpKind::EdgeList => "listedges",
            LumpKind::Models => "models",
        }
    }
}

impl std::fmt::Display for LumpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte range of one lump within the map buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LumpEntry {
    pub offset: u32,
    pub length: u32,
}

/// The decoded map header: version tag plus one entry per lump.
#[derive(Debug, Clone)]
pub struct LumpDirectory {
    pub version: i32,
    entries: [LumpEntry; 15],
}

impl LumpDirectory {
    /// Decode the fixed 124-byte header.
    ///
    /// A buffer too short for the directory is the only hard failure in map
    /// loading; a version mismatch and non-integral lump lengths are
    /// reported as diagnostics and decoding proceeds best-effort.
    pub fn parse(data: &[u8], diagnostics: &mut Vec<Diagnostic>) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(BspError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let version = read::i32_at(data, 0);
        if version != BSP_VERSION {
            diagnostics.push(Diagnostic::UnexpectedVersion {
                found: version,
                expected: BSP_VERSION,
            });
        }

        let mut entries = [LumpEntry::default(); 15];
        for (i, slot) in entries.iter_mut().enumerate() {
            *slot = LumpEntry {
                offset: read::u32_at(data, 4 + i * 8),
                length: read::u32_at(data, 8 + i * 8),
            };
        }

        let dir = Self { version, entries };
        for kind in LumpKind::ALL {
            let record_size = kind.record_size();
            if record_size == 0 {
                continue;
            }
            let length = dir.entry(kind).length;
            if length % record_size != 0 {
                diagnostics.push(Diagnostic::NonIntegralLump {
                    lump: kind,
                    length,
                    record_size,
                });
            }
        }

        Ok(dir)
    }

    pub fn entry(&self, kind: LumpKind) -> LumpEntry {
        self.entries[kind as usize]
    }

    /// Record count for a fixed-size lump: `length / record_size`.
    ///
    /// Zero for variable-layout lumps and for lumps whose length is not an
    /// exact multiple of the record size (those were diagnosed at parse and
    /// decode no records).
    pub fn count(&self, kind: LumpKind) -> usize {
        let record_size = kind.record_size();
        if record_size == 0 {
            return 0;
        }
        let length = self.entry(kind).length;
        if length % record_size != 0 {
            return 0;
        }
        (length / record_size) as usize
    }
}
