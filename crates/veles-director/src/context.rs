//! The `Lctx` / `LctX` script context chunk.
//!
//! A context enumerates a cast library's script sections. Reading one is
//! what wires the script subsystem together: the names chunk is faulted in,
//! every live section becomes a script chunk bound back to this context
//! (keyed by 1-based ordinal), and the translation pass runs over the
//! result.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use veles_common::{BinaryReader, Endianness};

use crate::chunk::{tags, ChunkHandle, ChunkKey};
use crate::directory::Directory;
use crate::{Error, Result};

/// One slot of the context's section map.
#[derive(Debug, Clone, Copy)]
pub struct ScriptContextMapEntry {
    pub unknown0: i32,
    /// Section id of the script, or a negative value for a dead slot.
    pub section_id: i32,
    pub unknown1: u16,
    pub unknown2: u16,
}

impl ScriptContextMapEntry {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            unknown0: cur.read_i32()?,
            section_id: cur.read_i32()?,
            unknown1: cur.read_u16()?,
            unknown2: cur.read_u16()?,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "unknown0": self.unknown0,
            "sectionID": self.section_id,
            "unknown1": self.unknown1,
            "unknown2": self.unknown2,
        })
    }
}

#[derive(Debug, Default)]
pub struct ScriptContextChunk {
    pub unknown0: i32,
    pub unknown1: i32,
    pub entry_count: u32,
    pub entry_count2: u32,
    pub entries_offset: u16,
    pub unknown2: i16,
    pub unknown3: i32,
    pub unknown4: i32,
    pub unknown5: i32,
    pub lnam_section_id: i32,
    pub valid_count: u16,
    pub flags: u16,
    pub free_pointer: i16,
    pub section_map: Vec<ScriptContextMapEntry>,
    /// The resolved names chunk.
    pub lnam: Option<ChunkHandle>,
    /// Scripts keyed by 1-based ordinal; member info records refer to
    /// scripts by these ordinals.
    pub scripts: BTreeMap<u32, ChunkHandle>,
}

impl ScriptContextChunk {
    pub fn read(cur: &mut BinaryReader<'_>, dir: &mut Directory, key: ChunkKey) -> Result<Self> {
        // Bytecode-related chunks are big endian regardless of the file.
        cur.endianness = Endianness::Big;

        let mut ctx = Self {
            unknown0: cur.read_i32()?,
            unknown1: cur.read_i32()?,
            entry_count: cur.read_u32()?,
            entry_count2: cur.read_u32()?,
            entries_offset: cur.read_u16()?,
            unknown2: cur.read_i16()?,
            unknown3: cur.read_i32()?,
            unknown4: cur.read_i32()?,
            unknown5: cur.read_i32()?,
            lnam_section_id: cur.read_i32()?,
            valid_count: cur.read_u16()?,
            flags: cur.read_u16()?,
            free_pointer: cur.read_i16()?,
            ..Default::default()
        };

        cur.seek(ctx.entries_offset as usize);
        ctx.section_map = Vec::with_capacity(ctx.entry_count as usize);
        for _ in 0..ctx.entry_count {
            ctx.section_map.push(ScriptContextMapEntry::read(cur)?);
        }

        let lnam = dir.get_chunk(tags::LNAM, ctx.lnam_section_id)?;
        for i in 1..=ctx.entry_count {
            let section = ctx.section_map[(i - 1) as usize];
            if section.section_id > -1 {
                let handle = dir.get_chunk(tags::LSCR, section.section_id)?;
                {
                    let lnam_ref = lnam.borrow();
                    let names =
                        lnam_ref
                            .as_script_names()
                            .ok_or(Error::UnresolvedReference {
                                fourcc: tags::LNAM,
                                section_id: ctx.lnam_section_id,
                            })?;
                    let mut chunk = handle.borrow_mut();
                    let script =
                        chunk
                            .as_script_mut()
                            .ok_or(Error::UnresolvedReference {
                                fourcc: tags::LSCR,
                                section_id: section.section_id,
                            })?;
                    script.set_context(key, names);
                }
                ctx.scripts.insert(i, handle);
            }
        }
        ctx.lnam = Some(lnam);

        if let Some(translator) = dir.translator() {
            for handle in ctx.scripts.values() {
                if let Some(script) = handle.borrow_mut().as_script_mut() {
                    script.translate(translator);
                }
            }
        }

        Ok(ctx)
    }

    /// Look up a name through the bound names chunk; total like the chunk's
    /// own lookup.
    pub fn get_name(&self, id: i32) -> String {
        match &self.lnam {
            Some(handle) => match handle.borrow().as_script_names() {
                Some(names) => names.get_name(id),
                None => format!("UNKNOWN_NAME_{}", id),
            },
            None => format!("UNKNOWN_NAME_{}", id),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "unknown0": self.unknown0,
            "unknown1": self.unknown1,
            "entryCount": self.entry_count,
            "entryCount2": self.entry_count2,
            "entriesOffset": self.entries_offset,
            "unknown2": self.unknown2,
            "unknown3": self.unknown3,
            "unknown4": self.unknown4,
            "unknown5": self.unknown5,
            "lnamSectionID": self.lnam_section_id,
            "validCount": self.valid_count,
            "flags": self.flags,
            "freePointer": self.free_pointer,
            "sectionMap": self.section_map.iter().map(ScriptContextMapEntry::to_json).collect::<Vec<_>>(),
        })
    }
}
