//! # BSP Mesher
//!
//! A Rust library for loading Quake-style BSP levels.
//!
//! ## Overview
//!
//! This library reads a PAK archive and a BSP map buffer, decodes the
//! map's binary lumps into typed records, resolves the cross-references
//! between them (faces to planes, surfaces and textures; tree records to
//! face ranges) into triangle-fan geometry with per-vertex UVs, and packs
//! texture and lightmap bitmaps into fixed-size atlases with a guillotine
//! rectangle allocator.
//!
//! Loading is best-effort: structural problems in the asset are collected
//! as [`Diagnostic`] events on the loaded map rather than aborting it, and
//! the caller decides whether a degraded load is acceptable.
//!
//! ## Quick Start
//!
//! ```ignore
//! use bsp_mesher::{Atlas, BspMap, Pak, Palette};
//!
//! // Open the archive and pull the level and palette out of it
//! let pak = Pak::open("data/pak0.pak")?;
//! let map = BspMap::parse(pak.read("maps/e1m1.bsp")?)?;
//! let palette = Palette::parse(pak.read("gfx/palette.lmp")?)?;
//!
//! // World geometry is model 0; every face is a resolved triangle fan
//! let world = map.world_model().expect("level has no models");
//!
//! // Pack each texture's full-size mip into an atlas
//! let mut atlas = Atlas::new(2048, 2048);
//! for texture in &map.textures {
//!     let rgb = palette.expand(&texture.mips[0]);
//!     let rect = atlas.allocate(texture.width, texture.height, Some(&rgb))?;
//! }
//! ```

pub mod atlas;
pub mod bsp;
pub mod error;
pub mod pak;
pub mod resolver;
pub mod types;

// Re-export main types for convenience
pub use atlas::{Atlas, AtlasRect};
pub use bsp::header::{LumpDirectory, LumpEntry, LumpKind, BSP_VERSION};
pub use bsp::lumps::{ClipNode, Edge, Plane};
pub use bsp::texture::{MipTexture, Palette};
pub use bsp::BspMap;
pub use error::{BspError, Diagnostic, Result};
pub use pak::{Pak, PakEntry};
pub use resolver::{Face, Leaf, Model, Node, Surface};
pub use types::{Ambience, Bounds, FaceVertex, ShortBounds};

/// Load an archive from a file path.
pub fn load_pak<P: AsRef<std::path::Path>>(path: P) -> Result<Pak> {
    Pak::open(path)
}

/// Load and resolve a map stored in an archive.
pub fn load_level(pak: &Pak, name: &str) -> Result<BspMap> {
    BspMap::parse(pak.read(name)?)
}
