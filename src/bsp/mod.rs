//! Map buffer decoding.
//!
//! [`BspMap::parse`] runs the whole pipeline: header directory, one decoder
//! per lump, then the resolver pass that links records together and builds
//! face geometry. Loading is best-effort: structural problems surface as
//! [`Diagnostic`] values on the returned map, never as hard failures past
//! the header.

pub mod header;
pub mod lumps;
pub(crate) mod read;
pub mod texture;

use std::borrow::Cow;
use std::sync::Arc;

use glam::Vec3;

use crate::error::{Diagnostic, Result};
use crate::resolver::{
    self, Face, FaceResolver, Leaf, Model, Node, Surface,
};
use self::header::{LumpDirectory, LumpKind};
use self::lumps::{ClipNode, Edge, Plane};
use self::texture::MipTexture;

/// A fully decoded and resolved map.
#[derive(Debug, Clone)]
pub struct BspMap {
    /// Version tag as read from the header, even when unexpected.
    pub version: i32,
    pub vertices: Vec<Vec3>,
    pub edges: Vec<Edge>,
    /// Signed edge-index list faces reference their edge loops through.
    pub edge_list: Vec<i16>,
    /// Face-index list leaves reference their faces through.
    pub face_list: Vec<u16>,
    pub planes: Vec<Arc<Plane>>,
    pub textures: Vec<Arc<MipTexture>>,
    pub surfaces: Vec<Arc<Surface>>,
    pub faces: Vec<Arc<Face>>,
    pub clip_nodes: Vec<ClipNode>,
    pub nodes: Vec<Node>,
    pub leaves: Vec<Leaf>,
    pub models: Vec<Model>,
    entities: Vec<u8>,
    visibility: Vec<u8>,
    lightmaps: Vec<u8>,
    diagnostics: Vec<Diagnostic>,
}

impl BspMap {
    /// Decode a map buffer.
    ///
    /// The only hard failure is a buffer too short for the 124-byte header
    /// directory; everything else decodes what it can and reports the rest
    /// through [`BspMap::diagnostics`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut diagnostics = Vec::new();
        let dir = LumpDirectory::parse(data, &mut diagnostics)?;

        let vertices = lumps::decode_vertices(data, &dir, &mut diagnostics);
        let edges = lumps::decode_edges(data, &dir, &mut diagnostics);
        let edge_list = lumps::decode_edge_list(data, &dir, &mut diagnostics);
        let face_list = lumps::decode_face_list(data, &dir, &mut diagnostics);
        let planes: Vec<Arc<Plane>> = lumps::decode_planes(data, &dir, &mut diagnostics)
            .into_iter()
            .map(Arc::new)
            .collect();
        let textures = texture::decode_mip_textures(data, &dir, &mut diagnostics);
        let raw_surfaces = lumps::decode_surfaces(data, &dir, &mut diagnostics);
        let raw_faces = lumps::decode_faces(data, &dir, &mut diagnostics);
        let clip_nodes = lumps::decode_clip_nodes(data, &dir, &mut diagnostics);
        let raw_nodes = lumps::decode_nodes(data, &dir, &mut diagnostics);
        let raw_leaves = lumps::decode_leaves(data, &dir, &mut diagnostics);
        let raw_models = lumps::decode_models(data, &dir, &mut diagnostics);

        let surfaces = resolver::resolve_surfaces(&raw_surfaces, &textures, &mut diagnostics);
        let faces = FaceResolver {
            vertices: &vertices,
            edges: &edges,
            edge_list: &edge_list,
            planes: &planes,
            surfaces: &surfaces,
        }
        .resolve(&raw_faces, &mut diagnostics);
        let nodes = resolver::resolve_nodes(&raw_nodes, &faces, &mut diagnostics);
        let leaves = resolver::resolve_leaves(&raw_leaves, &face_list, &faces, &mut diagnostics);
        let models = resolver::resolve_models(&raw_models, &faces, &mut diagnostics);

        let entities = variable_lump(data, &dir, LumpKind::Entities, &mut diagnostics);
        let visibility = variable_lump(data, &dir, LumpKind::Visibility, &mut diagnostics);
        let lightmaps = variable_lump(data, &dir, LumpKind::Lightmaps, &mut diagnostics);

        Ok(Self {
            version: dir.version,
            vertices,
            edges,
            edge_list,
            face_list,
            planes,
            textures,
            surfaces,
            faces,
            clip_nodes,
            nodes,
            leaves,
            models,
            entities,
            visibility,
            lightmaps,
            diagnostics,
        })
    }

    /// Model 0: the level's world geometry. Subsequent models are movable
    /// sub-objects (doors, platforms) positioned by entities.
    pub fn world_model(&self) -> Option<&Model> {
        self.models.first()
    }

    /// The entities lump as text (a sequence of key/value blocks).
    pub fn entities_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.entities)
    }

    /// Raw visibility lump bytes.
    pub fn visibility_data(&self) -> &[u8] {
        &self.visibility
    }

    /// Raw lightmap lump bytes; faces carry byte offsets into this.
    pub fn lightmap_data(&self) -> &[u8] {
        &self.lightmaps
    }

    /// Every non-fatal event collected while loading.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether any structural problem was found. A degraded map still holds
    /// everything that decoded cleanly.
    pub fn is_degraded(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_structural)
    }
}

/// Copy out a variable-layout lump's raw bytes.
fn variable_lump(
    data: &[u8],
    dir: &LumpDirectory,
    kind: LumpKind,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<u8> {
    let entry = dir.entry(kind);
    if entry.length == 0 {
        return Vec::new();
    }
    let start = entry.offset as usize;
    match data.get(start..start.saturating_add(entry.length as usize)) {
        Some(bytes) => bytes.to_vec(),
        None => {
            diagnostics.push(Diagnostic::LumpOutOfBounds {
                lump: kind,
                offset: entry.offset,
                length: entry.length,
                buffer: data.len(),
            });
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::header::{BSP_VERSION, HEADER_SIZE};

    /// Appends lumps to a growing buffer and patches their directory
    /// entries into the header.
    struct MapBuilder {
        data: Vec<u8>,
    }

    impl MapBuilder {
        fn new() -> Self {
            let mut data = vec![0u8; HEADER_SIZE];
            data[0..4].copy_from_slice(&BSP_VERSION.to_le_bytes());
            Self { data }
        }

        fn lump(mut self, kind: LumpKind, payload: &[u8]) -> Self {
            let base = 4 + (kind as usize) * 8;
            let offset = self.data.len() as u32;
            self.data[base..base + 4].copy_from_slice(&offset.to_le_bytes());
            self.data[base + 4..base + 8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
            self.data.extend_from_slice(payload);
            self
        }

        fn build(self) -> Vec<u8> {
            self.data
        }
    }

    fn le_f32s(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn le_u16s(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// A one-triangle level: three vertices, three forward edges, one
    /// plane, one textured surface, one face, and the tree records
    /// pointing at that single face.
    fn minimal_map() -> Vec<u8> {
        let vertices = le_f32s(&[
            0.0, 0.0, 0.0, //
            64.0, 0.0, 0.0, //
            64.0, 64.0, 0.0,
        ]);
        let edges = le_u16s(&[0, 1, 1, 2, 2, 0]);
        let edge_list = le_u16s(&[0, 1, 2]); // all forward, sign bit clear
        let face_list = le_u16s(&[0]);

        let mut planes = le_f32s(&[0.0, 0.0, 1.0, 0.0]);
        planes.extend_from_slice(&2i32.to_le_bytes());

        let miptex = crate::bsp::texture::tests::build_miptex_lump(&[("floor", 16, 16)]);

        let mut texinfo = le_f32s(&[1.0, 0.0, 0.0, 0.0]); // s axis
        texinfo.extend_from_slice(&le_f32s(&[0.0, 1.0, 0.0, 0.0])); // t axis
        texinfo.extend_from_slice(&0u32.to_le_bytes()); // texture 0
        texinfo.extend_from_slice(&0u32.to_le_bytes()); // not animated

        let mut face = Vec::new();
        face.extend_from_slice(&0u16.to_le_bytes()); // plane
        face.extend_from_slice(&0u16.to_le_bytes()); // side
        face.extend_from_slice(&0i32.to_le_bytes()); // first edge index
        face.extend_from_slice(&3u16.to_le_bytes()); // edge count
        face.extend_from_slice(&0u16.to_le_bytes()); // texinfo
        face.extend_from_slice(&[0, 200, 255, 255]); // light type/base/styles
        face.extend_from_slice(&0i32.to_le_bytes()); // lightmap offset

        let mut clip_node = 0u32.to_le_bytes().to_vec();
        clip_node.extend_from_slice(&le_u16s(&[1, 0xfffe])); // front 1, back -2

        let mut node = 0i32.to_le_bytes().to_vec();
        node.extend_from_slice(&le_u16s(&[0, 1])); // children
        node.extend_from_slice(&le_u16s(&[0, 0, 0, 64, 64, 0])); // bounds
        node.extend_from_slice(&le_u16s(&[0, 1])); // face range

        let mut leaf = Vec::new();
        leaf.extend_from_slice(&(-2i32).to_le_bytes()); // solid contents
        leaf.extend_from_slice(&(-1i32).to_le_bytes()); // no vis list
        leaf.extend_from_slice(&le_u16s(&[0, 0, 0, 64, 64, 0]));
        leaf.extend_from_slice(&le_u16s(&[0, 1])); // face-list range
        leaf.extend_from_slice(&[0, 0, 0, 0]); // ambience

        let mut model = le_f32s(&[
            0.0, 0.0, 0.0, 64.0, 64.0, 0.0, // bounds
            0.0, 0.0, 0.0, // origin
        ]);
        for node_id in [0i32, -1, -1, 0] {
            model.extend_from_slice(&node_id.to_le_bytes());
        }
        model.extend_from_slice(&1i32.to_le_bytes()); // leaves
        model.extend_from_slice(&0i32.to_le_bytes()); // first face
        model.extend_from_slice(&1i32.to_le_bytes()); // face count

        MapBuilder::new()
            .lump(LumpKind::Entities, b"{\"classname\" \"worldspawn\"}\0")
            .lump(LumpKind::Planes, &planes)
            .lump(LumpKind::MipTextures, &miptex)
            .lump(LumpKind::Vertices, &vertices)
            .lump(LumpKind::Visibility, &[0x01])
            .lump(LumpKind::Nodes, &node)
            .lump(LumpKind::TexInfo, &texinfo)
            .lump(LumpKind::Faces, &face)
            .lump(LumpKind::Lightmaps, &[128; 16])
            .lump(LumpKind::ClipNodes, &clip_node)
            .lump(LumpKind::Leaves, &leaf)
            .lump(LumpKind::FaceList, &face_list)
            .lump(LumpKind::Edges, &edges)
            .lump(LumpKind::EdgeList, &edge_list)
            .lump(LumpKind::Models, &model)
            .build()
    }

    #[test]
    fn test_minimal_map_round_trip() {
        let map = BspMap::parse(&minimal_map()).unwrap();

        assert!(map.diagnostics().is_empty());
        assert!(!map.is_degraded());
        assert_eq!(map.version, BSP_VERSION);
        assert_eq!(map.vertices.len(), 3);
        assert_eq!(map.edges.len(), 3);
        assert_eq!(map.planes.len(), 1);
        assert_eq!(map.textures.len(), 1);
        assert_eq!(map.surfaces.len(), 1);
        assert_eq!(map.clip_nodes.len(), 1);
        assert_eq!(map.clip_nodes[0].back, -2);

        // One face, one triangle, with its references resolved to the
        // decoded records.
        assert_eq!(map.faces.len(), 1);
        let face = &map.faces[0];
        assert_eq!(face.triangle_count(), 1);
        assert!(Arc::ptr_eq(&face.plane, &map.planes[0]));
        assert!(Arc::ptr_eq(&face.surface, &map.surfaces[0]));
        assert!(Arc::ptr_eq(&face.surface.texture, &map.textures[0]));
        assert_eq!(face.surface.texture.name, "floor");
        assert_eq!(face.lightmap, Some(0));
        assert_eq!(face.base_light, 200);

        // Geometry: the fan emits the boundary in order for a triangle,
        // UVs are the planar projection.
        assert_eq!(face.vertices[1].position, Vec3::new(64.0, 0.0, 0.0));
        assert_eq!(face.vertices[1].uv, glam::Vec2::new(64.0, 0.0));

        // Tree records all reach the same face.
        assert_eq!(map.nodes.len(), 1);
        assert!(Arc::ptr_eq(&map.nodes[0].faces[0], &map.faces[0]));
        assert_eq!(map.leaves.len(), 1);
        assert!(Arc::ptr_eq(&map.leaves[0].faces[0], &map.faces[0]));
        let world = map.world_model().unwrap();
        assert_eq!(world.faces.len(), 1);
        assert!(Arc::ptr_eq(&world.faces[0], &map.faces[0]));

        assert!(map.entities_text().contains("worldspawn"));
        assert_eq!(map.lightmap_data().len(), 16);
        assert_eq!(map.visibility_data(), &[0x01]);
    }

    #[test]
    fn test_corrupt_lump_degrades_but_loads() {
        let mut data = minimal_map();
        // Truncate the edges lump to a non-integral length.
        let base = 4 + (LumpKind::Edges as usize) * 8;
        data[base + 4..base + 8].copy_from_slice(&6u32.to_le_bytes());

        let map = BspMap::parse(&data).unwrap();
        assert!(map.is_degraded());
        assert!(map
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::NonIntegralLump { lump: LumpKind::Edges, .. })));

        // Edges decoded nothing, so the face (and everything that ranges
        // over it) is skipped while unaffected lumps survive.
        assert!(map.edges.is_empty());
        assert!(map.faces.is_empty());
        assert_eq!(map.vertices.len(), 3);
        assert_eq!(map.textures.len(), 1);
    }

    #[test]
    fn test_world_model_is_first() {
        let map = BspMap::parse(&minimal_map()).unwrap();
        let world = map.world_model().unwrap();
        assert_eq!(world.leaf_count, 1);
        assert_eq!(world.node_ids, [0, -1, -1, 0]);
        assert!(std::ptr::eq(world, &map.models[0]));
    }
}
