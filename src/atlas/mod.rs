//! Atlas allocation: packing many small bitmaps into one fixed canvas.
//!
//! Allocation is write-once: regions are carved out of a free list and
//! never released. The split rule is a plain guillotine: the remainder
//! below the allocation keeps the region's full width, the remainder
//! beside it keeps the allocated height. Split regions are never clipped
//! against other free regions nor merged, so the free list can come to
//! hold overlapping rectangles; every single allocation still lands in a
//! valid region, and the packing order stays deterministic, which
//! consumers rely on for stable texture coordinates.

use serde::Serialize;

use crate::error::{BspError, Result};

/// Bytes per canvas pixel (RGB).
pub const BYTES_PER_PIXEL: usize = 3;

/// The rectangle written by a successful allocation, in canvas pixels.
/// Never resized, moved, or released once returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A currently unused rectangle of canvas space.
#[derive(Debug, Clone, Copy)]
struct FreeRegion {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// A fixed-size canvas with a guillotine rectangle allocator over it.
#[derive(Debug, Clone)]
pub struct Atlas {
    width: u32,
    height: u32,
    free: Vec<FreeRegion>,
    pixels: Vec<u8>,
}

impl Atlas {
    /// Create an empty canvas; dimensions are fixed for its lifetime.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            free: vec![FreeRegion {
                x: 0,
                y: 0,
                width,
                height,
            }],
            pixels: vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The RGB canvas backing store, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Claim a `width` x `height` rectangle, optionally blitting RGB pixel
    /// data into it.
    ///
    /// The best-fitting free region wins by lowest `(region width - width)
    /// + (region height - height)`; an exact fit short-circuits the scan.
    /// When nothing fits the request fails without touching the free list,
    /// so the same allocation sequence always produces the same layout.
    pub fn allocate(&mut self, width: u32, height: u32, pixels: Option<&[u8]>) -> Result<AtlasRect> {
        if let Some(pixels) = pixels {
            let expected = width as usize * height as usize * BYTES_PER_PIXEL;
            if pixels.len() != expected {
                return Err(BspError::AtlasPixelSize {
                    expected,
                    actual: pixels.len(),
                });
            }
        }

        let mut best: Option<(usize, u32)> = None;
        for (i, region) in self.free.iter().enumerate() {
            if region.width < width || region.height < height {
                continue;
            }
            let score = (region.width - width) + (region.height - height);
            if score == 0 {
                best = Some((i, 0));
                break;
            }
            if best.map_or(true, |(_, s)| score < s) {
                best = Some((i, score));
            }
        }
        let Some((chosen, _)) = best else {
            return Err(BspError::AtlasFull { width, height });
        };

        let region = self.free.remove(chosen);
        let below = FreeRegion {
            x: region.x,
            y: region.y + height,
            width: region.width,
            height: region.height - height,
        };
        let beside = FreeRegion {
            x: region.x + width,
            y: region.y,
            width: region.width - width,
            height,
        };
        for child in [below, beside] {
            if child.width > 0 && child.height > 0 {
                self.free.push(child);
            }
        }

        let rect = AtlasRect {
            x: region.x,
            y: region.y,
            width,
            height,
        };
        if let Some(pixels) = pixels {
            self.blit(rect, pixels);
        }
        Ok(rect)
    }

    fn blit(&mut self, rect: AtlasRect, pixels: &[u8]) {
        let row_bytes = rect.width as usize * BYTES_PER_PIXEL;
        for row in 0..rect.height as usize {
            let src = row * row_bytes;
            let dst = ((rect.y as usize + row) * self.width as usize + rect.x as usize)
                * BYTES_PER_PIXEL;
            self.pixels[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
        }
    }

    /// Encode the canvas as a PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        use image::ImageEncoder;

        let mut bytes = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(std::io::Cursor::new(&mut bytes));
        encoder.write_image(
            &self.pixels,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
        )?;
        Ok(bytes)
    }

    #[cfg(test)]
    fn free_regions(&self) -> Vec<(u32, u32, u32, u32)> {
        self.free
            .iter()
            .map(|r| (r.x, r.y, r.width, r.height))
            .collect()
    }
}
