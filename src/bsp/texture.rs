//! Mip texture decoding and palette expansion.
//!
//! The texture lump is two-level: a count, then per-texture sub-offsets,
//! then at each sub-offset a header (name, dimensions, four mip offsets)
//! followed by the mip pixel data. Pixels are palette indices, one byte
//! each; [`Palette`] expands them to RGB for atlas upload.

use std::sync::Arc;

use crate::bsp::header::{LumpDirectory, LumpKind};
use crate::bsp::read;
use crate::error::{BspError, Diagnostic, Result};

/// Mip levels per texture: full size down to one eighth.
pub const MIP_LEVELS: usize = 4;

/// Byte size of a texture header: 16-byte name, width, height, 4 mip offsets.
const TEXTURE_HEADER_SIZE: usize = 40;

/// A wall texture with its four mip levels of palette-indexed pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// One byte per pixel, level `m` sized `(width >> m) * (height >> m)`.
    pub mips: [Vec<u8>; MIP_LEVELS],
}

impl MipTexture {
    /// Pixel count of mip level `level` for the given dimensions.
    pub fn mip_len(width: u32, height: u32, level: usize) -> usize {
        ((width >> level) * (height >> level)) as usize
    }

    /// A 16x16 checkerboard standing in for a texture that failed to
    /// decode, so texinfo indices keep their alignment.
    pub fn placeholder() -> Self {
        let size = 16u32;
        let mut mips: [Vec<u8>; MIP_LEVELS] = Default::default();
        for (level, mip) in mips.iter_mut().enumerate() {
            let side = size >> level;
            let mut pixels = vec![0u8; (side * side) as usize];
            for y in 0..side {
                for x in 0..side {
                    if ((x / 2) + (y / 2)) % 2 == 0 {
                        pixels[(y * side + x) as usize] = 255;
                    }
                }
            }
            *mip = pixels;
        }
        Self {
            name: String::new(),
            width: size,
            height: size,
            mips,
        }
    }
}

/// Decode the texture lump.
///
/// Failures are reported per texture; a texture that cannot be decoded
/// takes a placeholder slot and the rest of the lump continues.
pub(crate) fn decode_mip_textures(
    data: &[u8],
    dir: &LumpDirectory,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Arc<MipTexture>> {
    let entry = dir.entry(LumpKind::MipTextures);
    if entry.length == 0 {
        return Vec::new();
    }

    let lump_out_of_bounds = |buffer: usize| Diagnostic::LumpOutOfBounds {
        lump: LumpKind::MipTextures,
        offset: entry.offset,
        length: entry.length,
        buffer,
    };

    let start = entry.offset as usize;
    let end = start.saturating_add(entry.length as usize);
    let lump = match data.get(start..end) {
        Some(lump) => lump,
        None => {
            diagnostics.push(lump_out_of_bounds(data.len()));
            return Vec::new();
        }
    };

    if lump.len() < 4 {
        diagnostics.push(lump_out_of_bounds(data.len()));
        return Vec::new();
    }
    let count = read::i32_at(lump, 0).max(0) as usize;
    if 4 + count * 4 > lump.len() {
        diagnostics.push(lump_out_of_bounds(data.len()));
        return Vec::new();
    }

    let mut textures = Vec::with_capacity(count);
    for i in 0..count {
        let texture_offset = read::i32_at(lump, 4 + i * 4);
        match decode_one(lump, texture_offset) {
            Some(texture) => textures.push(Arc::new(texture)),
            None => {
                diagnostics.push(Diagnostic::MipOutOfBounds { texture: i });
                textures.push(Arc::new(MipTexture::placeholder()));
            }
        }
    }
    textures
}

/// Decode one texture at its lump-relative sub-offset; `None` if any byte
/// range escapes the lump.
fn decode_one(lump: &[u8], texture_offset: i32) -> Option<MipTexture> {
    if texture_offset < 0 {
        return None;
    }
    let base = texture_offset as usize;
    let header = lump.get(base..base.checked_add(TEXTURE_HEADER_SIZE)?)?;

    let name = read::name_at(header, 0, 16);
    let width = read::u32_at(header, 16);
    let height = read::u32_at(header, 20);

    let mut mips: [Vec<u8>; MIP_LEVELS] = Default::default();
    for (level, mip) in mips.iter_mut().enumerate() {
        let mip_offset = read::u32_at(header, 24 + level * 4) as usize;
        let mip_start = base.checked_add(mip_offset)?;
        let mip_end = mip_start.checked_add(MipTexture::mip_len(width, height, level))?;
        *mip = lump.get(mip_start..mip_end)?.to_vec();
    }

    Some(MipTexture {
        name,
        width,
        height,
        mips,
    })
}

/// Byte length of a palette: 256 RGB triplets.
pub const PALETTE_SIZE: usize = 768;

/// The 256-color RGB palette mip pixels index into
/// (the archive's `gfx/palette.lmp` entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    rgb: [u8; PALETTE_SIZE],
}

impl Palette {
    /// Parse a raw 768-byte palette.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let rgb: [u8; PALETTE_SIZE] = data
            .try_into()
            .map_err(|_| BspError::PaletteSize(data.len()))?;
        Ok(Self { rgb })
    }

    /// The RGB triplet for one palette index.
    pub fn color(&self, index: u8) -> [u8; 3] {
        let i = index as usize * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }

    /// Expand palette-indexed pixels to RGB bytes, three per pixel.
    pub fn expand(&self, indices: &[u8]) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(indices.len() * 3);
        for &index in indices {
            rgb.extend_from_slice(&self.color(index));
        }
        rgb
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bsp::header::{BSP_VERSION, HEADER_SIZE};

    /// Serialize textures into a miptex lump: count, sub-offsets, then each
    /// texture's header and mip data.
    pub(crate) fn build_miptex_lump(textures: &[(&str, u32, u32)]) -> Vec<u8> {
        let mut lump = Vec::new();
        lump.extend_from_slice(&(textures.len() as i32).to_le_bytes());
        let table_start = lump.len();
        lump.resize(lump.len() + textures.len() * 4, 0);

        for (i, &(name, width, height)) in textures.iter().enumerate() {
            let texture_offset = lump.len() as u32;
            lump[table_start + i * 4..table_start + i * 4 + 4]
                .copy_from_slice(&texture_offset.to_le_bytes());

            let mut name_field = [0u8; 16];
            name_field[..name.len()].copy_from_slice(name.as_bytes());
            lump.extend_from_slice(&name_field);
            lump.extend_from_slice(&width.to_le_bytes());
            lump.extend_from_slice(&height.to_le_bytes());

            let mut mip_offset = TEXTURE_HEADER_SIZE as u32;
            for level in 0..MIP_LEVELS {
                lump.extend_from_slice(&mip_offset.to_le_bytes());
                mip_offset += MipTexture::mip_len(width, height, level) as u32;
            }
            for level in 0..MIP_LEVELS {
                let len = MipTexture::mip_len(width, height, level);
                lump.extend_from_slice(&vec![level as u8; len]);
            }
        }
        lump
    }

    fn buffer_with_miptex_lump(lump: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&BSP_VERSION.to_le_bytes());
        let base = 4 + (LumpKind::MipTextures as usize) * 8;
        buf[base..base + 4].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
        buf[base + 4..base + 8].copy_from_slice(&(lump.len() as u32).to_le_bytes());
        buf.extend_from_slice(lump);
        buf
    }

    fn parse(data: &[u8]) -> (Vec<Arc<MipTexture>>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let dir = LumpDirectory::parse(data, &mut diagnostics).unwrap();
        let textures = decode_mip_textures(data, &dir, &mut diagnostics);
        (textures, diagnostics)
    }

    #[test]
    fn test_mip_len_shifts_dimensions() {
        assert_eq!(MipTexture::mip_len(64, 64, 0), 4096);
        assert_eq!(MipTexture::mip_len(64, 64, 2), 256);
        assert_eq!(MipTexture::mip_len(64, 32, 3), 8 * 4);
    }

    #[test]
    fn test_decode_two_textures() {
        let lump = build_miptex_lump(&[("rock", 16, 16), ("water", 32, 16)]);
        let buf = buffer_with_miptex_lump(&lump);
        let (textures, diagnostics) = parse(&buf);

        assert!(diagnostics.is_empty());
        assert_eq!(textures.len(), 2);
        assert_eq!(textures[0].name, "rock");
        assert_eq!(textures[0].width, 16);
        assert_eq!(textures[1].name, "water");
        for level in 0..MIP_LEVELS {
            assert_eq!(
                textures[1].mips[level].len(),
                MipTexture::mip_len(32, 16, level)
            );
            assert!(textures[1].mips[level].iter().all(|&p| p == level as u8));
        }
    }

    #[test]
    fn test_bad_sub_offset_yields_placeholder_slot() {
        let mut lump = build_miptex_lump(&[("rock", 16, 16), ("dirt", 16, 16)]);
        // Corrupt the second sub-offset to point far past the lump.
        lump[8..12].copy_from_slice(&0x0fff_ffffu32.to_le_bytes());
        let buf = buffer_with_miptex_lump(&lump);
        let (textures, diagnostics) = parse(&buf);

        assert_eq!(textures.len(), 2);
        assert_eq!(textures[0].name, "rock");
        assert_eq!(*textures[1], MipTexture::placeholder());
        assert_eq!(diagnostics, vec![Diagnostic::MipOutOfBounds { texture: 1 }]);
    }

    #[test]
    fn test_truncated_mip_data_yields_placeholder() {
        let mut lump = build_miptex_lump(&[("rock", 16, 16)]);
        lump.truncate(lump.len() - 1);
        let buf = buffer_with_miptex_lump(&lump);
        let (textures, diagnostics) = parse(&buf);

        assert_eq!(textures.len(), 1);
        assert_eq!(*textures[0], MipTexture::placeholder());
        assert_eq!(diagnostics, vec![Diagnostic::MipOutOfBounds { texture: 0 }]);
    }

    #[test]
    fn test_palette_expand() {
        let mut raw = vec![0u8; PALETTE_SIZE];
        raw[3] = 10; // index 1 -> (10, 20, 30)
        raw[4] = 20;
        raw[5] = 30;
        let palette = Palette::parse(&raw).unwrap();

        assert_eq!(palette.color(1), [10, 20, 30]);
        assert_eq!(palette.expand(&[1, 0, 1]), vec![10, 20, 30, 0, 0, 0, 10, 20, 30]);
        assert!(matches!(
            Palette::parse(&[0u8; 100]),
            Err(BspError::PaletteSize(100))
        ));
    }
}
