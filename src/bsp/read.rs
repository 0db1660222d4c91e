//! Little-endian field readers for fixed-layout records.
//!
//! Callers slice each record to its exact size first (`chunks_exact`), so
//! in-record offsets are in bounds by construction.

use glam::Vec3;

pub(crate) fn u8_at(record: &[u8], offset: usize) -> u8 {
    record[offset]
}

pub(crate) fn u16_at(record: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([record[offset], record[offset + 1]])
}

pub(crate) fn i16_at(record: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([record[offset], record[offset + 1]])
}

pub(crate) fn u32_at(record: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
    ])
}

pub(crate) fn i32_at(record: &[u8], offset: usize) -> i32 {
    u32_at(record, offset) as i32
}

pub(crate) fn f32_at(record: &[u8], offset: usize) -> f32 {
    f32::from_bits(u32_at(record, offset))
}

pub(crate) fn vec3_at(record: &[u8], offset: usize) -> Vec3 {
    Vec3::new(
        f32_at(record, offset),
        f32_at(record, offset + 4),
        f32_at(record, offset + 8),
    )
}

/// Three consecutive u16s, as node and leaf bounding boxes are stored.
pub(crate) fn u16x3_at(record: &[u8], offset: usize) -> [u16; 3] {
    [
        u16_at(record, offset),
        u16_at(record, offset + 2),
        u16_at(record, offset + 4),
    ]
}

/// A NUL-terminated name from a fixed-width field.
pub(crate) fn name_at(record: &[u8], offset: usize, width: usize) -> String {
    let field = &record[offset..offset + width];
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_reads_are_little_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(u16_at(&bytes, 0), 0x0201);
        assert_eq!(u32_at(&bytes, 0), 0x0403_0201);
        assert_eq!(i16_at(&[0xff, 0xff], 0), -1);
        assert_eq!(f32_at(&1.5f32.to_le_bytes(), 0), 1.5);
    }

    #[test]
    fn test_name_stops_at_nul() {
        let mut field = [0u8; 16];
        field[..4].copy_from_slice(b"rock");
        assert_eq!(name_at(&field, 0, 16), "rock");

        let full = *b"0123456789abcdef";
        assert_eq!(name_at(&full, 0, 16), "0123456789abcdef");
    }
}
