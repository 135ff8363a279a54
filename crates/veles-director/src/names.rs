//! The `Lnam` script names chunk.

use serde_json::{json, Value};
use veles_common::{BinaryReader, Endianness};

use crate::Result;

/// A table of interned names referenced by index from script chunks.
#[derive(Debug, Clone, Default)]
pub struct ScriptNamesChunk {
    pub unknown0: i32,
    pub unknown1: i32,
    pub len1: u32,
    pub len2: u32,
    pub names_offset: u16,
    pub names_count: u16,
    pub names: Vec<String>,
}

impl ScriptNamesChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        // Bytecode-related chunks are big endian regardless of the file.
        cur.endianness = Endianness::Big;

        let unknown0 = cur.read_i32()?;
        let unknown1 = cur.read_i32()?;
        let len1 = cur.read_u32()?;
        let len2 = cur.read_u32()?;
        let names_offset = cur.read_u16()?;
        let names_count = cur.read_u16()?;

        cur.seek(names_offset as usize);
        let mut names = Vec::with_capacity(names_count as usize);
        for _ in 0..names_count {
            names.push(cur.read_pascal_string()?);
        }

        Ok(Self {
            unknown0,
            unknown1,
            len1,
            len2,
            names_offset,
            names_count,
            names,
        })
    }

    /// Look up a name by index. Total over all of `i32`: out-of-range ids
    /// yield the `UNKNOWN_NAME_<id>` sentinel instead of an error, since
    /// scripts may carry dangling ids.
    pub fn get_name(&self, id: i32) -> String {
        if id >= 0 && (id as usize) < self.names.len() {
            self.names[id as usize].clone()
        } else {
            format!("UNKNOWN_NAME_{}", id)
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "unknown0": self.unknown0,
            "unknown1": self.unknown1,
            "len1": self.len1,
            "len2": self.len2,
            "namesOffset": self.names_offset,
            "namesCount": self.names_count,
            "names": self.names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veles_common::BinaryWriter;

    fn names_chunk(names: &[&str]) -> ScriptNamesChunk {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_i32(0);
        w.write_i32(0);
        w.write_u32(0);
        w.write_u32(0);
        w.write_u16(20); // names_offset
        w.write_u16(names.len() as u16);
        for name in names {
            w.write_pascal_string(name);
        }
        let bytes = w.into_bytes();
        // A little-endian cursor must not leak into the names chunk.
        ScriptNamesChunk::read(&mut BinaryReader::new(&bytes, Endianness::Little)).unwrap()
    }

    #[test]
    fn test_name_lookup_is_total() {
        let chunk = names_chunk(&["foo", "bar"]);
        assert_eq!(chunk.get_name(0), "foo");
        assert_eq!(chunk.get_name(1), "bar");
        assert_eq!(chunk.get_name(2), "UNKNOWN_NAME_2");
        assert_eq!(chunk.get_name(-1), "UNKNOWN_NAME_-1");
    }
}
