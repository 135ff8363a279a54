//! Decoder and re-encoder for a legacy authoring tool's packaged movies.
//!
//! A packaged movie is a tagged-chunk container whose map chunks
//! cross-reference the embedded resources: configuration, cast libraries,
//! cast members, compiled script resources, and name tables. This crate
//! materializes that on-disk graph into a consistent object model:
//!
//! - [`Directory`] - container walker and lazy chunk registry
//! - [`Chunk`] - discriminated union over the eleven decoded chunk types
//! - [`ListChunk`] - the shared header + offset table + items substrate
//! - [`lingo`] - handler and literal records plus the translation seam
//!
//! Chunks re-serialize through the same types, preserving unknown fields
//! verbatim for bit-exact round trips.

mod cast;
mod chunk;
mod config;
mod context;
mod directory;
mod error;
mod list;
mod map;
mod member;
mod names;
mod script;
mod util;

pub mod lingo;

pub use cast::{CastChunk, CastListChunk, CastListEntry};
pub use chunk::{tags, Chunk, ChunkHandle, ChunkKey, ChunkType, ScriptRef};
pub use config::ConfigChunk;
pub use context::{ScriptContextChunk, ScriptContextMapEntry};
pub use directory::Directory;
pub use error::{Error, Result};
pub use list::{ListBody, ListChunk};
pub use map::{InitialMapChunk, KeyTableChunk, KeyTableEntry, MemoryMapChunk, MemoryMapEntry};
pub use member::{
    CastInfoChunk, CastMemberChunk, GenericMember, MemberKind, MemberType, ScriptMember,
    ScriptType,
};
pub use names::ScriptNamesChunk;
pub use script::ScriptChunk;
pub use util::human_version;
