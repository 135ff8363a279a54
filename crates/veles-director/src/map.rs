//! Container bookkeeping chunks: initial map, memory map, and key table.
//!
//! The initial map locates the memory map, the memory map assigns every
//! chunk in the container a section id, and the key table records which
//! cast owns which auxiliary chunk. Consumers filter key-table entries by
//! `cast_id` and `fourcc` to discover cross-chunk edges.

use serde_json::{json, Value};
use veles_common::{BinaryReader, BinaryWriter, FourCC};

use crate::Result;

/// The `imap` chunk, a fixed 24-byte header locating the memory map.
#[derive(Debug, Clone, Default)]
pub struct InitialMapChunk {
    pub one: u32,
    pub mmap_offset: u32,
    pub version: u32,
    pub unused1: u32,
    pub unused2: u32,
    pub unused3: u32,
}

impl InitialMapChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            one: cur.read_u32()?,
            mmap_offset: cur.read_u32()?,
            version: cur.read_u32()?,
            unused1: cur.read_u32()?,
            unused2: cur.read_u32()?,
            unused3: cur.read_u32()?,
        })
    }

    pub fn size(&self) -> usize {
        24
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_u32(self.one);
        w.write_u32(self.mmap_offset);
        w.write_u32(self.version);
        w.write_u32(self.unused1);
        w.write_u32(self.unused2);
        w.write_u32(self.unused3);
    }

    pub fn to_json(&self) -> Value {
        json!({
            "one": self.one,
            "mmapOffset": self.mmap_offset,
            "version": self.version,
            "unused1": self.unused1,
            "unused2": self.unused2,
            "unused3": self.unused3,
        })
    }
}

/// One section of the container: a chunk's tag, length, and file offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapEntry {
    pub fourcc: FourCC,
    pub len: u32,
    pub offset: u32,
    pub flags: i16,
    pub unknown0: i16,
    pub next: i32,
}

impl MemoryMapEntry {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            fourcc: cur.read_fourcc()?,
            len: cur.read_u32()?,
            offset: cur.read_u32()?,
            flags: cur.read_i16()?,
            unknown0: cur.read_i16()?,
            next: cur.read_i32()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_fourcc(self.fourcc);
        w.write_u32(self.len);
        w.write_u32(self.offset);
        w.write_i16(self.flags);
        w.write_i16(self.unknown0);
        w.write_i32(self.next);
    }

    pub fn to_json(&self) -> Value {
        json!({
            "fourCC": self.fourcc.to_string(),
            "len": self.len,
            "offset": self.offset,
            "flags": self.flags,
            "unknown0": self.unknown0,
            "next": self.next,
        })
    }
}

/// The `mmap` chunk: an array of [`MemoryMapEntry`] indexed by section id.
#[derive(Debug, Clone, Default)]
pub struct MemoryMapChunk {
    pub header_length: u16,
    pub entry_length: u16,
    pub chunk_count_max: i32,
    pub chunk_count_used: i32,
    pub junk_head: i32,
    pub junk_head2: i32,
    pub free_head: i32,
    pub entries: Vec<MemoryMapEntry>,
}

impl MemoryMapChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        let header_length = cur.read_u16()?;
        let entry_length = cur.read_u16()?;
        let chunk_count_max = cur.read_i32()?;
        let chunk_count_used = cur.read_i32()?;
        let junk_head = cur.read_i32()?;
        let junk_head2 = cur.read_i32()?;
        let free_head = cur.read_i32()?;
        let mut entries = Vec::with_capacity(chunk_count_used.max(0) as usize);
        for _ in 0..chunk_count_used.max(0) {
            entries.push(MemoryMapEntry::read(cur)?);
        }
        Ok(Self {
            header_length,
            entry_length,
            chunk_count_max,
            chunk_count_used,
            junk_head,
            junk_head2,
            free_head,
            entries,
        })
    }

    /// On-disk size preserves the reservation: the max entry count, not the
    /// used count, determines the section length.
    pub fn size(&self) -> usize {
        self.header_length as usize + self.chunk_count_max as usize * self.entry_length as usize
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_u16(self.header_length);
        w.write_u16(self.entry_length);
        w.write_i32(self.chunk_count_max);
        w.write_i32(self.chunk_count_used);
        w.write_i32(self.junk_head);
        w.write_i32(self.junk_head2);
        w.write_i32(self.free_head);
        for entry in &self.entries {
            entry.write(w);
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "headerLength": self.header_length,
            "entryLength": self.entry_length,
            "chunkCountMax": self.chunk_count_max,
            "chunkCountUsed": self.chunk_count_used,
            "junkHead": self.junk_head,
            "junkHead2": self.junk_head2,
            "freeHead": self.free_head,
            "mapArray": self.entries.iter().map(MemoryMapEntry::to_json).collect::<Vec<_>>(),
        })
    }
}

/// A key-table edge: cast `cast_id` references a chunk of type `fourcc` at
/// section `section_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTableEntry {
    pub section_id: i32,
    pub cast_id: i32,
    pub fourcc: FourCC,
}

impl KeyTableEntry {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            section_id: cur.read_i32()?,
            cast_id: cur.read_i32()?,
            fourcc: cur.read_fourcc()?,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_i32(self.section_id);
        w.write_i32(self.cast_id);
        w.write_fourcc(self.fourcc);
    }

    pub fn to_json(&self) -> Value {
        json!({
            "sectionID": self.section_id,
            "castID": self.cast_id,
            "fourCC": self.fourcc.to_string(),
        })
    }
}

/// The `KEY*` chunk relating casts to their auxiliary chunks.
#[derive(Debug, Clone, Default)]
pub struct KeyTableChunk {
    pub entry_size: u16,
    pub entry_size2: u16,
    pub entry_count: u32,
    pub used_count: u32,
    pub entries: Vec<KeyTableEntry>,
}

impl KeyTableChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        let entry_size = cur.read_u16()?;
        let entry_size2 = cur.read_u16()?;
        let entry_count = cur.read_u32()?;
        let used_count = cur.read_u32()?;
        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            entries.push(KeyTableEntry::read(cur)?);
        }
        Ok(Self {
            entry_size,
            entry_size2,
            entry_count,
            used_count,
            entries,
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.write_u16(self.entry_size);
        w.write_u16(self.entry_size2);
        w.write_u32(self.entry_count);
        w.write_u32(self.used_count);
        for entry in &self.entries {
            entry.write(w);
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "entrySize": self.entry_size,
            "entrySize2": self.entry_size2,
            "entryCount": self.entry_count,
            "usedCount": self.used_count,
            "entries": self.entries.iter().map(KeyTableEntry::to_json).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veles_common::Endianness;

    #[test]
    fn test_initial_map_roundtrip() {
        let imap = InitialMapChunk {
            one: 1,
            mmap_offset: 0x2C,
            version: 0x4C1,
            ..Default::default()
        };
        let mut w = BinaryWriter::new(Endianness::Big);
        imap.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), imap.size());

        let back =
            InitialMapChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big)).unwrap();
        assert_eq!(back.mmap_offset, 0x2C);
        assert_eq!(back.one, 1);
    }

    #[test]
    fn test_memory_map_roundtrip() {
        let mmap = MemoryMapChunk {
            header_length: 24,
            entry_length: 20,
            chunk_count_max: 4,
            chunk_count_used: 1,
            junk_head: 0,
            junk_head2: 0,
            free_head: -1,
            entries: vec![MemoryMapEntry {
                fourcc: FourCC::new(b"CASt"),
                len: 100,
                offset: 0x40,
                flags: 0,
                unknown0: 0,
                next: 0,
            }],
        };
        let mut w = BinaryWriter::new(Endianness::Big);
        mmap.write(&mut w);
        let bytes = w.into_bytes();

        let back = MemoryMapChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big)).unwrap();
        assert_eq!(back.entries, mmap.entries);
        assert_eq!(back.size(), 24 + 4 * 20);
    }

    #[test]
    fn test_key_table_roundtrip_little_endian() {
        let table = KeyTableChunk {
            entry_size: 12,
            entry_size2: 12,
            entry_count: 1,
            used_count: 1,
            entries: vec![KeyTableEntry {
                section_id: 5,
                cast_id: 42,
                fourcc: FourCC::new(b"Lctx"),
            }],
        };
        let mut w = BinaryWriter::new(Endianness::Little);
        table.write(&mut w);
        let bytes = w.into_bytes();

        let back =
            KeyTableChunk::read(&mut BinaryReader::new(&bytes, Endianness::Little)).unwrap();
        assert_eq!(back.entries, table.entries);
        assert_eq!(back.used_count, 1);
    }
}
