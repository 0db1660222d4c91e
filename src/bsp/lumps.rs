//! Decoders for the fixed-record lumps.
//!
//! Each decoder slices its lump's byte range and walks exact-size record
//! chunks, so individual field reads need no bounds checks. Cross-lump
//! indices stay raw here; the resolver replaces them with direct links.

use glam::Vec3;

use crate::bsp::header::{LumpDirectory, LumpKind};
use crate::bsp::read;
use crate::error::Diagnostic;
use crate::types::{Ambience, Bounds, ShortBounds};

/// A plane in normal/distance form, with the format's axis-alignment tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub dist: f32,
    /// Format-defined alignment class; carried through, not computed.
    pub kind: i32,
}

/// Two indices into the vertex lump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub v0: u16,
    pub v1: u16,
}

/// One node of the collision tree: a plane and two child indices, where
/// negative children index leaf contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipNode {
    pub plane_id: u32,
    pub front: i16,
    pub back: i16,
}

/// Texinfo record before its texture reference is resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawSurface {
    pub vec_s: Vec3,
    pub dist_s: f32,
    pub vec_t: Vec3,
    pub dist_t: f32,
    pub texture_id: u32,
    pub animated: u32,
}

/// Face record before plane/surface/edge references are resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawFace {
    pub plane_id: u16,
    pub side: u16,
    pub first_edge: i32,
    pub edge_count: u16,
    pub surface_id: u16,
    pub type_light: u8,
    pub base_light: u8,
    pub light: [u8; 2],
    pub lightmap: i32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RawNode {
    pub plane_id: i32,
    pub front: u16,
    pub back: u16,
    pub bounds: ShortBounds,
    pub first_face: u16,
    pub face_count: u16,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RawLeaf {
    pub contents: i32,
    pub vis_list: i32,
    pub bounds: ShortBounds,
    pub first_face_index: u16,
    pub face_index_count: u16,
    pub ambience: Ambience,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RawModel {
    pub bounds: Bounds,
    pub origin: Vec3,
    pub node_ids: [i32; 4],
    pub leaf_count: i32,
    pub first_face: i32,
    pub face_count: i32,
}

/// Slice a fixed-record lump down to exactly `count * record_size` bytes
/// and iterate record chunks. A range past the buffer end is diagnosed and
/// yields no records.
fn fixed_records<'a>(
    data: &'a [u8],
    dir: &LumpDirectory,
    kind: LumpKind,
    diagnostics: &mut Vec<Diagnostic>,
) -> std::slice::ChunksExact<'a, u8> {
    let entry = dir.entry(kind);
    let record_size = kind.record_size() as usize;
    let start = entry.offset as usize;
    let len = dir.count(kind) * record_size;

    let bytes = match data.get(start..start.saturating_add(len)) {
        Some(bytes) => bytes,
        None => {
            diagnostics.push(Diagnostic::LumpOutOfBounds {
                lump: kind,
                offset: entry.offset,
                length: entry.length,
                buffer: data.len(),
            });
            &[]
        }
    };
    bytes.chunks_exact(record_size.max(1))
}

pub(crate) fn decode_vertices(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Vec3> {
    fixed_records(data, dir, LumpKind::Vertices, diagnostics)
        .map(|r| read::vec3_at(r, 0))
        .collect()
}

pub(crate) fn decode_edges(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Edge> {
    fixed_records(data, dir, LumpKind::Edges, diagnostics)
        .map(|r| Edge {
            v0: read::u16_at(r, 0),
            v1: read::u16_at(r, 2),
        })
        .collect()
}

pub(crate) fn decode_planes(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Plane> {
    fixed_records(data, dir, LumpKind::Planes, diagnostics)
        .map(|r| Plane {
            normal: read::vec3_at(r, 0),
            dist: read::f32_at(r, 12),
            kind: read::i32_at(r, 16),
        })
        .collect()
}

/// The signed edge-index list: `abs` indexes the edge lump, the sign picks
/// the traversal direction.
pub(crate) fn decode_edge_list(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<i16> {
    fixed_records(data, dir, LumpKind::EdgeList, diagnostics)
        .map(|r| read::i16_at(r, 0))
        .collect()
}

/// The face-index list leaves use to reference faces.
pub(crate) fn decode_face_list(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<u16> {
    fixed_records(data, dir, LumpKind::FaceList, diagnostics)
        .map(|r| read::u16_at(r, 0))
        .collect()
}

pub(crate) fn decode_surfaces(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<RawSurface> {
    fixed_records(data, dir, LumpKind::TexInfo, diagnostics)
        .map(|r| RawSurface {
            vec_s: read::vec3_at(r, 0),
            dist_s: read::f32_at(r, 12),
            vec_t: read::vec3_at(r, 16),
            dist_t: read::f32_at(r, 28),
            texture_id: read::u32_at(r, 32),
            animated: read::u32_at(r, 36),
        })
        .collect()
}

pub(crate) fn decode_faces(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<RawFace> {
    fixed_records(data, dir, LumpKind::Faces, diagnostics)
        .map(|r| RawFace {
            plane_id: read::u16_at(r, 0),
            side: read::u16_at(r, 2),
            first_edge: read::i32_at(r, 4),
            edge_count: read::u16_at(r, 8),
            surface_id: read::u16_at(r, 10),
            type_light: read::u8_at(r, 12),
            base_light: read::u8_at(r, 13),
            light: [read::u8_at(r, 14), read::u8_at(r, 15)],
            lightmap: read::i32_at(r, 16),
        })
        .collect()
}

pub(crate) fn decode_clip_nodes(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ClipNode> {
    fixed_records(data, dir, LumpKind::ClipNodes, diagnostics)
        .map(|r| ClipNode {
            plane_id: read::u32_at(r, 0),
            front: read::i16_at(r, 4),
            back: read::i16_at(r, 6),
        })
        .collect()
}

pub(crate) fn decode_nodes(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<RawNode> {
    fixed_records(data, dir, LumpKind::Nodes, diagnostics)
        .map(|r| RawNode {
            plane_id: read::i32_at(r, 0),
            front: read::u16_at(r, 4),
            back: read::u16_at(r, 6),
            bounds: ShortBounds {
                min: read::u16x3_at(r, 8),
                max: read::u16x3_at(r, 14),
            },
            first_face: read::u16_at(r, 20),
            face_count: read::u16_at(r, 22),
        })
        .collect()
}

pub(crate) fn decode_leaves(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<RawLeaf> {
    fixed_records(data, dir, LumpKind::Leaves, diagnostics)
        .map(|r| RawLeaf {
            contents: read::i32_at(r, 0),
            vis_list: read::i32_at(r, 4),
            bounds: ShortBounds {
                min: read::u16x3_at(r, 8),
                max: read::u16x3_at(r, 14),
            },
            first_face_index: read::u16_at(r, 20),
            face_index_count: read::u16_at(r, 22),
            ambience: Ambience {
                water: read::u8_at(r, 24),
                sky: read::u8_at(r, 25),
                slime: read::u8_at(r, 26),
                lava: read::u8_at(r, 27),
            },
        })
        .collect()
}

pub(crate) fn decode_models(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<RawModel> {
    fixed_records(data, dir, LumpKind::Models, diagnostics)
        .map(|r| RawModel {
            bounds: Bounds::new(read::vec3_at(r, 0), read::vec3_at(r, 12)),
            origin: read::vec3_at(r, 24),
            node_ids: [
                read::i32_at(r, 36),
                read::i32_at(r, 40),
                read::i32_at(r, 44),
                read::i32_at(r, 48),
            ],
            leaf_count: read::i32_at(r, 52),
            first_face: read::i32_at(r, 56),
            face_count: read::i32_at(r, 60),
        })
        .collect()
}
