//! Cast library chunks: the movie-level cast list (`MCsL`) and the
//! per-library member table (`CAS*`).

use std::collections::BTreeMap;

use serde_json::{json, Value};
use veles_common::{BinaryReader, BinaryWriter, Endianness};

use crate::chunk::{ChunkHandle, ChunkKey};
use crate::list::{ListBody, ListChunk};
use crate::Result;

/// One cast library as described by the cast list.
#[derive(Debug, Clone, Default)]
pub struct CastListEntry {
    pub name: String,
    pub file_path: String,
    pub preload_settings: u16,
    pub min_member: u16,
    pub max_member: u16,
    pub id: i32,
}

impl CastListEntry {
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "filePath": self.file_path,
            "preloadSettings": self.preload_settings,
            "minMember": self.min_member,
            "maxMember": self.max_member,
            "id": self.id,
        })
    }
}

/// The `MCsL` chunk: a list of cast libraries.
///
/// Built on the list substrate; each cast owns `items_per_cast` consecutive
/// items, of which only the four defined ones are decoded. Files written by
/// older tool versions carry fewer items per cast, so each decode is
/// guarded.
#[derive(Debug, Clone, Default)]
pub struct CastListChunk {
    pub list: ListBody,
    pub unk0: u16,
    pub cast_count: u16,
    pub items_per_cast: u16,
    pub unk1: u16,
    pub entries: Vec<CastListEntry>,
}

impl ListChunk for CastListChunk {
    fn body(&self) -> &ListBody {
        &self.list
    }

    fn body_mut(&mut self) -> &mut ListBody {
        &mut self.list
    }

    fn read_header(&mut self, cur: &mut BinaryReader<'_>) -> Result<()> {
        self.list.data_offset = cur.read_u32()?;
        self.unk0 = cur.read_u16()?;
        self.cast_count = cur.read_u16()?;
        self.items_per_cast = cur.read_u16()?;
        self.unk1 = cur.read_u16()?;
        Ok(())
    }

    fn header_size(&self) -> usize {
        12
    }

    fn write_header(&self, w: &mut BinaryWriter) {
        w.write_u32(self.header_size() as u32);
        w.write_u16(self.unk0);
        w.write_u16(self.cast_count);
        w.write_u16(self.items_per_cast);
        w.write_u16(self.unk1);
    }
}

impl CastListChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        cur.endianness = Endianness::Big;
        let mut chunk = Self::default();
        chunk.read_list(cur)?;

        chunk.entries = Vec::with_capacity(chunk.cast_count as usize);
        for i in 0..chunk.cast_count {
            let mut entry = CastListEntry::default();
            if chunk.items_per_cast >= 1 {
                entry.name = chunk.list.pascal_string(i * chunk.items_per_cast + 1)?;
            }
            if chunk.items_per_cast >= 2 {
                entry.file_path = chunk.list.pascal_string(i * chunk.items_per_cast + 2)?;
            }
            if chunk.items_per_cast >= 3 {
                entry.preload_settings = chunk.list.u16(i * chunk.items_per_cast + 3)?;
            }
            if chunk.items_per_cast >= 4 {
                if let Some(mut item) = chunk.list.reader(i * chunk.items_per_cast + 4) {
                    entry.min_member = item.read_u16()?;
                    entry.max_member = item.read_u16()?;
                    entry.id = item.read_i32()?;
                }
            }
            chunk.entries.push(entry);
        }
        Ok(chunk)
    }

    pub fn write(&mut self, w: &mut BinaryWriter) {
        w.endianness = Endianness::Big;
        self.write_list(w);
    }

    pub fn to_json(&self) -> Value {
        json!({
            "dataOffset": self.list.data_offset,
            "unk0": self.unk0,
            "castCount": self.cast_count,
            "itemsPerCast": self.items_per_cast,
            "unk1": self.unk1,
            "entries": self.entries.iter().map(CastListEntry::to_json).collect::<Vec<_>>(),
        })
    }
}

/// The `CAS*` chunk: one cast library's member table.
///
/// On disk it is nothing but section ids, one per member slot (zero for an
/// empty slot). Population resolves the slots into member chunks and binds
/// the library's script context; that lives on the directory, which owns
/// every chunk involved.
#[derive(Debug, Default)]
pub struct CastChunk {
    pub member_ids: Vec<i32>,
    /// Library name, assigned during population.
    pub name: String,
    /// Key of the library's script context, when one exists.
    pub lctx: Option<ChunkKey>,
    /// Members by logical id, filled during population.
    pub members: BTreeMap<i32, ChunkHandle>,
}

impl CastChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        cur.endianness = Endianness::Big;
        let mut member_ids = Vec::new();
        while !cur.is_empty() {
            member_ids.push(cur.read_i32()?);
        }
        Ok(Self {
            member_ids,
            ..Default::default()
        })
    }

    pub fn write(&self, w: &mut BinaryWriter) {
        w.endianness = Endianness::Big;
        for &id in &self.member_ids {
            w.write_i32(id);
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "memberIDs": self.member_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_chunk_reads_ids_to_eof() {
        let mut w = BinaryWriter::new(Endianness::Big);
        for id in [3i32, 0, 7] {
            w.write_i32(id);
        }
        let bytes = w.into_bytes();

        // The id stream is big endian even in a little-endian movie.
        let mut cur = BinaryReader::new(&bytes, Endianness::Little);
        let cast = CastChunk::read(&mut cur).unwrap();
        assert_eq!(cast.member_ids, vec![3, 0, 7]);
    }

    #[test]
    fn test_cast_chunk_rejects_trailing_partial_id() {
        let bytes = [0, 0, 0, 1, 0, 0];
        let mut cur = BinaryReader::new(&bytes, Endianness::Big);
        assert!(CastChunk::read(&mut cur).is_err());
    }

    #[test]
    fn test_cast_list_entries() {
        let mut chunk = CastListChunk {
            cast_count: 1,
            items_per_cast: 4,
            ..Default::default()
        };

        // Items 0..=4; the per-cast slots are 1-based.
        let mut compound = BinaryWriter::new(Endianness::Big);
        compound.write_u16(1); // min_member
        compound.write_u16(5); // max_member
        compound.write_i32(42); // id
        chunk.list.items = vec![
            Vec::new(),
            vec![4, b'M', b'a', b'i', b'n'],
            Vec::new(),
            vec![0, 2],
            compound.into_bytes(),
        ];
        chunk.list.offset_table = vec![0; 5];

        let mut w = BinaryWriter::new(Endianness::Big);
        chunk.write(&mut w);
        let bytes = w.into_bytes();

        let back = CastListChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big)).unwrap();
        assert_eq!(back.entries.len(), 1);
        let entry = &back.entries[0];
        assert_eq!(entry.name, "Main");
        assert_eq!(entry.file_path, "");
        assert_eq!(entry.preload_settings, 2);
        assert_eq!(entry.min_member, 1);
        assert_eq!(entry.max_member, 5);
        assert_eq!(entry.id, 42);
    }
}
