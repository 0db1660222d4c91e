//! Cross-reference resolution and face geometry building.
//!
//! Lump decoding leaves raw integer indices in place; this module is the
//! second phase that replaces them with shared handles, bounds-checked
//! centrally. A record with an out-of-range reference is skipped with a
//! diagnostic and the rest of its lump continues.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::bsp::header::LumpKind;
use crate::bsp::lumps::{Edge, Plane, RawFace, RawLeaf, RawModel, RawNode, RawSurface};
use crate::bsp::texture::MipTexture;
use crate::error::Diagnostic;
use crate::types::{Ambience, Bounds, FaceVertex, ShortBounds};

/// A texinfo record with its texture reference resolved: a planar UV
/// projection onto a shared texture.
#[derive(Debug, Clone)]
pub struct Surface {
    pub vec_s: Vec3,
    pub dist_s: f32,
    pub vec_t: Vec3,
    pub dist_t: f32,
    pub animated: bool,
    pub texture: Arc<MipTexture>,
}

impl Surface {
    /// Project a world position into texture space (texel units).
    pub fn project(&self, position: Vec3) -> Vec2 {
        Vec2::new(
            position.dot(self.vec_s) + self.dist_s,
            position.dot(self.vec_t) + self.dist_t,
        )
    }
}

/// A fully resolved face: direct plane/surface links plus triangle-fan
/// geometry with per-vertex UVs.
#[derive(Debug, Clone)]
pub struct Face {
    pub plane: Arc<Plane>,
    /// Which half-space the face normal points into.
    pub side: u16,
    pub type_light: u8,
    pub base_light: u8,
    pub light: [u8; 2],
    /// Byte offset into the lightmap lump, if the face carries one.
    pub lightmap: Option<u32>,
    pub surface: Arc<Surface>,
    /// Triangle-fan vertices, three per triangle.
    pub vertices: Vec<FaceVertex>,
}

impl Face {
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// A node of the visible BSP tree, its face range resolved.
///
/// Child indices follow the format's sign/range convention and are left
/// raw, as is the plane index.
#[derive(Debug, Clone)]
pub struct Node {
    pub plane_id: i32,
    pub front: u16,
    pub back: u16,
    pub bounds: ShortBounds,
    pub faces: Vec<Arc<Face>>,
}

/// A leaf of the BSP tree with its faces resolved via the face-index lump.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub contents: i32,
    pub vis_list: i32,
    pub bounds: ShortBounds,
    pub ambience: Ambience,
    pub faces: Vec<Arc<Face>>,
}

/// A sub-model: a face range plus its tree roots. Model 0 is the world
/// geometry; later models are movable sub-objects (doors, platforms).
#[derive(Debug, Clone)]
pub struct Model {
    pub bounds: Bounds,
    pub origin: Vec3,
    pub node_ids: [i32; 4],
    pub leaf_count: i32,
    pub faces: Vec<Arc<Face>>,
}

/// Resolve texinfo records against the decoded texture list.
///
/// An out-of-range texture reference binds the shared placeholder instead
/// of dropping the record, so face texinfo indices keep their alignment.
pub(crate) fn resolve_surfaces(
    raw: &[RawSurface],
    textures: &[Arc<MipTexture>],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Arc<Surface>> {
    let placeholder = Arc::new(MipTexture::placeholder());
    raw.iter()
        .enumerate()
        .map(|(record, surface)| {
            let texture = match textures.get(surface.texture_id as usize) {
                Some(texture) => Arc::clone(texture),
                None => {
                    diagnostics.push(Diagnostic::IndexOutOfRange {
                        lump: LumpKind::TexInfo,
                        record,
                        target: LumpKind::MipTextures,
                        index: surface.texture_id as i64,
                        limit: textures.len(),
                    });
                    Arc::clone(&placeholder)
                }
            };
            Arc::new(Surface {
                vec_s: surface.vec_s,
                dist_s: surface.dist_s,
                vec_t: surface.vec_t,
                dist_t: surface.dist_t,
                animated: surface.animated != 0,
                texture,
            })
        })
        .collect()
}

/// Builds resolved faces from raw face records and the lumps they
/// reference.
pub(crate) struct FaceResolver<'a> {
    pub vertices: &'a [Vec3],
    pub edges: &'a [Edge],
    pub edge_list: &'a [i16],
    pub planes: &'a [Arc<Plane>],
    pub surfaces: &'a [Arc<Surface>],
}

impl FaceResolver<'_> {
    pub fn resolve(
        &self,
        raw_faces: &[RawFace],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Arc<Face>> {
        let mut faces = Vec::with_capacity(raw_faces.len());
        for (record, raw) in raw_faces.iter().enumerate() {
            if let Some(face) = self.resolve_face(record, raw, diagnostics) {
                faces.push(Arc::new(face));
            }
        }
        faces
    }

    fn resolve_face(
        &self,
        record: usize,
        raw: &RawFace,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Face> {
        if raw.edge_count < 3 {
            diagnostics.push(Diagnostic::DegenerateFace {
                face: record,
                edges: raw.edge_count,
            });
            return None;
        }

        let plane = self.checked(record, LumpKind::Planes, raw.plane_id as i64, self.planes, diagnostics)?;
        let surface = self.checked(record, LumpKind::TexInfo, raw.surface_id as i64, self.surfaces, diagnostics)?;

        let mut boundary = Vec::with_capacity(raw.edge_count as usize);
        for step in 0..raw.edge_count {
            boundary.push(self.loop_vertex(record, raw.first_edge, step, diagnostics)?);
        }

        // Fan out from the first boundary vertex, then project each emitted
        // vertex onto the surface axes.
        let mut positions = Vec::with_capacity((boundary.len() - 2) * 3);
        let first = boundary[0];
        let mut previous = boundary[1];
        for &current in &boundary[2..] {
            positions.extend_from_slice(&[first, previous, current]);
            previous = current;
        }
        let vertices = positions
            .into_iter()
            .map(|position| FaceVertex::new(position, surface.project(position)))
            .collect();

        Some(Face {
            plane: Arc::clone(plane),
            side: raw.side,
            type_light: raw.type_light,
            base_light: raw.base_light,
            light: raw.light,
            lightmap: u32::try_from(raw.lightmap).ok(),
            surface: Arc::clone(surface),
            vertices,
        })
    }

    /// One boundary vertex of a face's edge loop: the edge-index entry at
    /// `first_edge + step`, sign picking which endpoint leads.
    fn loop_vertex(
        &self,
        record: usize,
        first_edge: i32,
        step: u16,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Vec3> {
        let list_index = first_edge as i64 + step as i64;
        let entry = *index_checked(self.edge_list, list_index).or_else(|| {
            diagnostics.push(Diagnostic::IndexOutOfRange {
                lump: LumpKind::Faces,
                record,
                target: LumpKind::EdgeList,
                index: list_index,
                limit: self.edge_list.len(),
            });
            None
        })?;

        let edge = *index_checked(self.edges, entry.unsigned_abs() as i64).or_else(|| {
            diagnostics.push(Diagnostic::IndexOutOfRange {
                lump: LumpKind::Faces,
                record,
                target: LumpKind::Edges,
                index: entry as i64,
                limit: self.edges.len(),
            });
            None
        })?;

        let vertex_index = if entry < 0 { edge.v1 } else { edge.v0 };
        index_checked(self.vertices, vertex_index as i64)
            .copied()
            .or_else(|| {
                diagnostics.push(Diagnostic::IndexOutOfRange {
                    lump: LumpKind::Faces,
                    record,
                    target: LumpKind::Vertices,
                    index: vertex_index as i64,
                    limit: self.vertices.len(),
                });
                None
            })
    }

    fn checked<'s, T>(
        &self,
        record: usize,
        target: LumpKind,
        index: i64,
        pool: &'s [T],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<&'s T> {
        index_checked(pool, index).or_else(|| {
            diagnostics.push(Diagnostic::IndexOutOfRange {
                lump: LumpKind::Faces,
                record,
                target,
                index,
                limit: pool.len(),
            });
            None
        })
    }
}

fn index_checked<T>(pool: &[T], index: i64) -> Option<&T> {
    usize::try_from(index).ok().and_then(|i| pool.get(i))
}

/// Slice the resolved face sequence for a contiguous range reference; a
/// range escaping the sequence is diagnosed and the record is skipped.
fn face_range(
    lump: LumpKind,
    record: usize,
    first: i64,
    count: i64,
    faces: &[Arc<Face>],
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<Arc<Face>>> {
    let out_of_range = |diagnostics: &mut Vec<Diagnostic>, index: i64| {
        diagnostics.push(Diagnostic::IndexOutOfRange {
            lump,
            record,
            target: LumpKind::Faces,
            index,
            limit: faces.len(),
        });
        None
    };

    if first < 0 || count < 0 {
        return out_of_range(diagnostics, first.min(count));
    }
    let (first, count) = (first as usize, count as usize);
    match first.checked_add(count) {
        Some(end) if end <= faces.len() => Some(faces[first..end].to_vec()),
        _ => out_of_range(diagnostics, first as i64 + count as i64 - 1),
    }
}

pub(crate) fn resolve_nodes(
    raw: &[RawNode],
    faces: &[Arc<Face>],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Node> {
    raw.iter()
        .enumerate()
        .filter_map(|(record, node)| {
            let faces = face_range(
                LumpKind::Nodes,
                record,
                node.first_face as i64,
                node.face_count as i64,
                faces,
                diagnostics,
            )?;
            Some(Node {
                plane_id: node.plane_id,
                front: node.front,
                back: node.back,
                bounds: node.bounds,
                faces,
            })
        })
        .collect()
}

pub(crate) fn resolve_leaves(
    raw: &[RawLeaf],
    face_list: &[u16],
    faces: &[Arc<Face>],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Leaf> {
    raw.iter()
        .enumerate()
        .filter_map(|(record, leaf)| {
            let mut resolved = Vec::with_capacity(leaf.face_index_count as usize);
            for step in 0..leaf.face_index_count {
                let list_index = leaf.first_face_index as i64 + step as i64;
                let face_index = *index_checked(face_list, list_index).or_else(|| {
                    diagnostics.push(Diagnostic::IndexOutOfRange {
                        lump: LumpKind::Leaves,
                        record,
                        target: LumpKind::FaceList,
                        index: list_index,
                        limit: face_list.len(),
                    });
                    None
                })?;
                let face = index_checked(faces, face_index as i64).or_else(|| {
                    diagnostics.push(Diagnostic::IndexOutOfRange {
                        lump: LumpKind::Leaves,
                        record,
                        target: LumpKind::Faces,
                        index: face_index as i64,
                        limit: faces.len(),
                    });
                    None
                })?;
                resolved.push(Arc::clone(face));
            }
            Some(Leaf {
                contents: leaf.contents,
                vis_list: leaf.vis_list,
                bounds: leaf.bounds,
                ambience: leaf.ambience,
                faces: resolved,
            })
        })
        .collect()
}

pub(crate) fn resolve_models(
    raw: &[RawModel],
    faces: &[Arc<Face>],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Model> {
    raw.iter()
        .enumerate()
        .filter_map(|(record, model)| {
            let faces = face_range(
                LumpKind::Models,
                record,
                model.first_face as i64,
                model.face_count as i64,
                faces,
                diagnostics,
            )?;
            Some(Model {
                bounds: model.bounds,
                origin: model.origin,
                node_ids: model.node_ids,
                leaf_count: model.leaf_count,
                faces,
            })
        })
        .collect()
}
