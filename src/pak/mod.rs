//! PAK archive reading.
//!
//! A PAK is a flat container: a 12-byte header pointing at a directory of
//! 64-byte entries, each naming a byte range in the file. The loader only
//! ever needs "name to byte range" lookups, so the whole archive is held
//! in memory and entries are served as slices of it.

use std::collections::HashMap;
use std::path::Path;

use crate::bsp::read;
use crate::error::{BspError, Diagnostic, Result};

/// Archive magic: "PACK", little-endian.
pub const PAK_MAGIC: [u8; 4] = *b"PACK";

const HEADER_SIZE: usize = 12;
const ENTRY_SIZE: usize = 64;
const ENTRY_NAME_SIZE: usize = 56;

/// One named byte range within the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakEntry {
    pub name: String,
    pub offset: u32,
    pub length: u32,
}

/// A loaded archive: owned bytes plus the decoded directory.
#[derive(Debug, Clone)]
pub struct Pak {
    data: Vec<u8>,
    entries: Vec<PakEntry>,
    index: HashMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
}

impl Pak {
    /// Read and parse an archive from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(std::fs::read(path)?)
    }

    /// Parse an archive from owned bytes.
    ///
    /// A missing or wrong magic is a hard error; a directory length that is
    /// not a multiple of the 64-byte entry size is diagnosed and the
    /// directory is read best-effort from the whole entries.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(BspError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[0..4] != PAK_MAGIC {
            return Err(BspError::NotAPack);
        }

        let dir_offset = read::u32_at(&data, 4) as usize;
        let dir_length = read::u32_at(&data, 8) as usize;

        let mut diagnostics = Vec::new();
        if dir_length % ENTRY_SIZE != 0 {
            diagnostics.push(Diagnostic::RaggedDirectory {
                length: dir_length as u32,
                entry_size: ENTRY_SIZE as u32,
            });
        }

        let directory = data
            .get(dir_offset..dir_offset.saturating_add(dir_length))
            .ok_or(BspError::Truncated {
                expected: dir_offset.saturating_add(dir_length),
                actual: data.len(),
            })?;

        let mut entries = Vec::with_capacity(directory.len() / ENTRY_SIZE);
        let mut index = HashMap::new();
        for record in directory.chunks_exact(ENTRY_SIZE) {
            let entry = PakEntry {
                name: read::name_at(record, 0, ENTRY_NAME_SIZE),
                offset: read::u32_at(record, 56),
                length: read::u32_at(record, 60),
            };
            index.insert(entry.name.clone(), entries.len());
            entries.push(entry);
        }

        Ok(Self {
            data,
            entries,
            index,
            diagnostics,
        })
    }

    /// Look up a directory entry by name.
    pub fn entry(&self, name: &str) -> Option<&PakEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// The bytes of a named entry.
    pub fn read(&self, name: &str) -> Result<&[u8]> {
        let entry = self
            .entry(name)
            .ok_or_else(|| BspError::EntryNotFound(name.to_string()))?;
        let start = entry.offset as usize;
        self.data
            .get(start..start.saturating_add(entry.length as usize))
            .ok_or_else(|| BspError::EntryOutOfBounds {
                name: entry.name.clone(),
                offset: entry.offset,
                length: entry.length,
                size: self.data.len(),
            })
    }

    /// All directory entries, in archive order.
    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-fatal problems found while parsing the directory.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
