//! The chunk model: every typed chunk behind one discriminated union.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use veles_common::FourCC;

use crate::cast::{CastChunk, CastListChunk};
use crate::config::ConfigChunk;
use crate::context::ScriptContextChunk;
use crate::map::{InitialMapChunk, KeyTableChunk, MemoryMapChunk};
use crate::member::{CastInfoChunk, CastMemberChunk};
use crate::names::ScriptNamesChunk;
use crate::script::ScriptChunk;

/// Well-known chunk tags.
pub mod tags {
    use veles_common::FourCC;

    pub const RIFX: FourCC = FourCC::new(b"RIFX");
    pub const XFIR_RAW: [u8; 4] = *b"XFIR";
    pub const MV93: FourCC = FourCC::new(b"MV93");
    pub const IMAP: FourCC = FourCC::new(b"imap");
    pub const MMAP: FourCC = FourCC::new(b"mmap");
    pub const KEY_TABLE: FourCC = FourCC::new(b"KEY*");
    pub const CONFIG: FourCC = FourCC::new(b"VWCF");
    pub const CONFIG_D: FourCC = FourCC::new(b"DRCF");
    pub const CAST_LIST: FourCC = FourCC::new(b"MCsL");
    pub const CAST: FourCC = FourCC::new(b"CAS*");
    pub const CAST_MEMBER: FourCC = FourCC::new(b"CASt");
    pub const CAST_INFO: FourCC = FourCC::new(b"VWCI");
    pub const LCTX: FourCC = FourCC::new(b"Lctx");
    pub const LCTX_CAPITAL: FourCC = FourCC::new(b"LctX");
    pub const LNAM: FourCC = FourCC::new(b"Lnam");
    pub const LSCR: FourCC = FourCC::new(b"Lscr");
    pub const FREE: FourCC = FourCC::new(b"free");
    pub const JUNK: FourCC = FourCC::new(b"junk");
}

/// Identity of a chunk inside the container: tag plus section id.
pub type ChunkKey = (FourCC, i32);

/// Shared handle to a materialized chunk. The directory owns the registry;
/// handles stay valid for as long as the directory lives.
pub type ChunkHandle = Rc<RefCell<Chunk>>;

/// Back-reference from a cast member to its script: the owning context's
/// key plus the script's ordinal in that context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRef {
    pub context: ChunkKey,
    pub ordinal: u32,
}

/// Discriminant of [`Chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Cast,
    CastList,
    CastMember,
    CastInfo,
    Config,
    InitialMap,
    KeyTable,
    MemoryMap,
    Script,
    ScriptContext,
    ScriptNames,
}

/// A materialized chunk of any of the eleven decoded types.
#[derive(Debug)]
pub enum Chunk {
    Cast(CastChunk),
    CastList(CastListChunk),
    CastMember(CastMemberChunk),
    CastInfo(CastInfoChunk),
    Config(ConfigChunk),
    InitialMap(InitialMapChunk),
    KeyTable(KeyTableChunk),
    MemoryMap(MemoryMapChunk),
    Script(ScriptChunk),
    ScriptContext(ScriptContextChunk),
    ScriptNames(ScriptNamesChunk),
}

impl Chunk {
    pub fn chunk_type(&self) -> ChunkType {
        match self {
            Chunk::Cast(_) => ChunkType::Cast,
            Chunk::CastList(_) => ChunkType::CastList,
            Chunk::CastMember(_) => ChunkType::CastMember,
            Chunk::CastInfo(_) => ChunkType::CastInfo,
            Chunk::Config(_) => ChunkType::Config,
            Chunk::InitialMap(_) => ChunkType::InitialMap,
            Chunk::KeyTable(_) => ChunkType::KeyTable,
            Chunk::MemoryMap(_) => ChunkType::MemoryMap,
            Chunk::Script(_) => ChunkType::Script,
            Chunk::ScriptContext(_) => ChunkType::ScriptContext,
            Chunk::ScriptNames(_) => ChunkType::ScriptNames,
        }
    }

    /// Diagnostic JSON with each chunk type's documented field set.
    pub fn to_json(&self) -> Value {
        match self {
            Chunk::Cast(c) => c.to_json(),
            Chunk::CastList(c) => c.to_json(),
            Chunk::CastMember(c) => c.to_json(),
            Chunk::CastInfo(c) => c.to_json(),
            Chunk::Config(c) => c.to_json(),
            Chunk::InitialMap(c) => c.to_json(),
            Chunk::KeyTable(c) => c.to_json(),
            Chunk::MemoryMap(c) => c.to_json(),
            Chunk::Script(c) => c.to_json(),
            Chunk::ScriptContext(c) => c.to_json(),
            Chunk::ScriptNames(c) => c.to_json(),
        }
    }

    pub fn as_cast(&self) -> Option<&CastChunk> {
        match self {
            Chunk::Cast(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cast_mut(&mut self) -> Option<&mut CastChunk> {
        match self {
            Chunk::Cast(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cast_list(&self) -> Option<&CastListChunk> {
        match self {
            Chunk::CastList(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cast_member(&self) -> Option<&CastMemberChunk> {
        match self {
            Chunk::CastMember(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cast_member_mut(&mut self) -> Option<&mut CastMemberChunk> {
        match self {
            Chunk::CastMember(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&ConfigChunk> {
        match self {
            Chunk::Config(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_key_table(&self) -> Option<&KeyTableChunk> {
        match self {
            Chunk::KeyTable(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_script(&self) -> Option<&ScriptChunk> {
        match self {
            Chunk::Script(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_script_mut(&mut self) -> Option<&mut ScriptChunk> {
        match self {
            Chunk::Script(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_script_context(&self) -> Option<&ScriptContextChunk> {
        match self {
            Chunk::ScriptContext(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_script_names(&self) -> Option<&ScriptNamesChunk> {
        match self {
            Chunk::ScriptNames(c) => Some(c),
            _ => None,
        }
    }
}
