//! The chunk directory.
//!
//! The directory walks the outer container (signature, codec, initial map,
//! memory map), serves raw section bytes, and materializes typed chunks
//! lazily through an idempotent registry keyed by `(fourcc, section id)`.
//! It also drives the load sequence that resolves cross-references: key
//! table, config, then cast population.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use memmap2::Mmap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use veles_common::{BinaryReader, Endianness, FourCC};

use crate::cast::CastListChunk;
use crate::chunk::{tags, Chunk, ChunkHandle, ChunkKey, ScriptRef};
use crate::config::ConfigChunk;
use crate::context::ScriptContextChunk;
use crate::lingo::Translator;
use crate::map::{InitialMapChunk, KeyTableChunk, KeyTableEntry, MemoryMapChunk};
use crate::member::{CastInfoChunk, CastMemberChunk};
use crate::names::ScriptNamesChunk;
use crate::script::ScriptChunk;
use crate::util::human_version;
use crate::{CastChunk, Error, Result};

/// Cast id used for the single unnamed cast of older movies.
const DEFAULT_CAST_ID: i32 = 1024;

enum Backing {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mmap(mmap) => mmap.as_ref(),
            Backing::Owned(data) => data.as_slice(),
        }
    }
}

/// Owner of every chunk materialized from one movie file.
pub struct Directory {
    backing: Backing,
    /// Byte order of the container. Several chunk types override this
    /// locally; the raw section reader always starts from it.
    pub endianness: Endianness,
    pub codec: FourCC,
    pub initial_map: InitialMapChunk,
    pub memory_map: MemoryMapChunk,
    registry: FxHashMap<ChunkKey, ChunkHandle>,
    loading: FxHashSet<ChunkKey>,
    /// Human product version, derived from the config chunk during load.
    pub version: u16,
    /// Whether translated scripts should render dot syntax.
    pub dot_syntax: bool,
    /// Set when a script context was found under the capital-X tag; the
    /// handler record layout grows a field in that revision.
    pub capital_x: bool,
    key_table: Option<ChunkHandle>,
    config: Option<ChunkHandle>,
    casts: Vec<ChunkKey>,
    translator: Option<Box<dyn Translator>>,
}

impl Directory {
    /// Open a movie file, memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::new(Backing::Mmap(mmap))
    }

    /// Open a movie from an owned buffer.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::new(Backing::Owned(data))
    }

    fn new(backing: Backing) -> Result<Self> {
        let (endianness, codec, initial_map, memory_map) =
            Self::read_container(backing.bytes())?;
        Ok(Self {
            backing,
            endianness,
            codec,
            initial_map,
            memory_map,
            registry: FxHashMap::default(),
            loading: FxHashSet::default(),
            version: 0,
            dot_syntax: false,
            capital_x: false,
            key_table: None,
            config: None,
            casts: Vec::new(),
            translator: None,
        })
    }

    fn read_container(
        bytes: &[u8],
    ) -> Result<(Endianness, FourCC, InitialMapChunk, MemoryMapChunk)> {
        if bytes.len() < 12 {
            return Err(Error::InvalidMagic);
        }
        let endianness = if bytes[0..4] == tags::RIFX.to_bytes(Endianness::Big) {
            Endianness::Big
        } else if bytes[0..4] == tags::XFIR_RAW {
            Endianness::Little
        } else {
            return Err(Error::InvalidMagic);
        };

        let mut cur = BinaryReader::new(bytes, endianness);
        cur.seek(4);
        let _container_len = cur.read_u32()?;
        let codec = cur.read_fourcc()?;
        if codec != tags::MV93 {
            return Err(Error::UnsupportedCodec(codec));
        }

        // The initial map sits directly after the container header.
        let imap_data = Self::read_raw_chunk(&mut cur, tags::IMAP)?;
        let initial_map =
            InitialMapChunk::read(&mut BinaryReader::new(imap_data, endianness))?;

        cur.seek(initial_map.mmap_offset as usize);
        let mmap_data = Self::read_raw_chunk(&mut cur, tags::MMAP)?;
        let memory_map =
            MemoryMapChunk::read(&mut BinaryReader::new(mmap_data, endianness))?;

        Ok((endianness, codec, initial_map, memory_map))
    }

    fn read_raw_chunk<'a>(
        cur: &mut BinaryReader<'a>,
        expected: FourCC,
    ) -> Result<&'a [u8]> {
        let fourcc = cur.read_fourcc()?;
        if fourcc != expected {
            return Err(Error::UnresolvedReference {
                fourcc: expected,
                section_id: -1,
            });
        }
        let len = cur.read_u32()?;
        Ok(cur.read_bytes(len as usize)?)
    }

    /// Whether the memory map carries a live `(fourcc, section id)` entry.
    pub fn chunk_exists(&self, fourcc: FourCC, section_id: i32) -> bool {
        usize::try_from(section_id)
            .ok()
            .and_then(|i| self.memory_map.entries.get(i))
            .is_some_and(|entry| entry.fourcc == fourcc)
    }

    /// Raw payload bytes of a section, validated against its chunk header.
    fn raw_chunk_data(&self, fourcc: FourCC, section_id: i32) -> Result<Vec<u8>> {
        let entry = usize::try_from(section_id)
            .ok()
            .and_then(|i| self.memory_map.entries.get(i))
            .filter(|entry| entry.fourcc == fourcc)
            .ok_or(Error::UnresolvedReference { fourcc, section_id })?;

        let mut cur = BinaryReader::new(self.backing.bytes(), self.endianness);
        cur.seek(entry.offset as usize);
        let stored = cur.read_fourcc()?;
        let len = cur.read_u32()?;
        if stored != fourcc || len != entry.len {
            return Err(Error::MapMismatch { fourcc, section_id });
        }
        Ok(cur.copy_bytes(len as usize)?)
    }

    /// Look up or materialize the chunk at `(fourcc, section_id)`.
    ///
    /// Idempotent within a load: repeated lookups return the same handle.
    /// A chunk whose materialization is already on the stack cannot be
    /// requested again; a well-formed movie has no such cycle.
    pub fn get_chunk(&mut self, fourcc: FourCC, section_id: i32) -> Result<ChunkHandle> {
        let key = (fourcc, section_id);
        if let Some(handle) = self.registry.get(&key) {
            return Ok(handle.clone());
        }
        if !self.loading.insert(key) {
            return Err(Error::CyclicReference { fourcc, section_id });
        }
        let result = self.materialize(fourcc, section_id);
        self.loading.remove(&key);
        let handle: ChunkHandle = Rc::new(RefCell::new(result?));
        self.registry.insert(key, handle.clone());
        Ok(handle)
    }

    fn materialize(&mut self, fourcc: FourCC, section_id: i32) -> Result<Chunk> {
        if fourcc == tags::LCTX_CAPITAL {
            self.capital_x = true;
        }
        let data = self.raw_chunk_data(fourcc, section_id)?;
        debug!(%fourcc, section_id, len = data.len(), "materializing chunk");
        let mut cur = BinaryReader::new(&data, self.endianness);
        Ok(match fourcc {
            tags::CAST => Chunk::Cast(CastChunk::read(&mut cur)?),
            tags::CAST_LIST => Chunk::CastList(CastListChunk::read(&mut cur)?),
            tags::CAST_MEMBER => {
                Chunk::CastMember(CastMemberChunk::read(&mut cur, self.version)?)
            }
            tags::CAST_INFO => Chunk::CastInfo(CastInfoChunk::read(&mut cur)?),
            tags::CONFIG | tags::CONFIG_D => Chunk::Config(ConfigChunk::read(&mut cur)?),
            tags::IMAP => Chunk::InitialMap(InitialMapChunk::read(&mut cur)?),
            tags::KEY_TABLE => Chunk::KeyTable(KeyTableChunk::read(&mut cur)?),
            tags::MMAP => Chunk::MemoryMap(MemoryMapChunk::read(&mut cur)?),
            tags::LSCR => {
                Chunk::Script(ScriptChunk::read(&mut cur, self.version, self.capital_x)?)
            }
            tags::LCTX | tags::LCTX_CAPITAL => Chunk::ScriptContext(
                ScriptContextChunk::read(&mut cur, self, (fourcc, section_id))?,
            ),
            tags::LNAM => Chunk::ScriptNames(ScriptNamesChunk::read(&mut cur)?),
            _ => return Err(Error::UnknownChunkType { fourcc, section_id }),
        })
    }

    /// Full load: key table, config, casts.
    pub fn load(&mut self) -> Result<()> {
        self.read_key_table()?;
        self.read_config()?;
        self.read_casts()
    }

    fn first_section(&self, fourcc: FourCC) -> Option<i32> {
        self.memory_map
            .entries
            .iter()
            .position(|entry| entry.fourcc == fourcc)
            .map(|i| i as i32)
    }

    fn read_key_table(&mut self) -> Result<()> {
        let id = self
            .first_section(tags::KEY_TABLE)
            .ok_or(Error::UnresolvedReference {
                fourcc: tags::KEY_TABLE,
                section_id: -1,
            })?;
        self.key_table = Some(self.get_chunk(tags::KEY_TABLE, id)?);
        Ok(())
    }

    fn read_config(&mut self) -> Result<()> {
        let (fourcc, id) = self
            .first_section(tags::CONFIG)
            .map(|id| (tags::CONFIG, id))
            .or_else(|| self.first_section(tags::CONFIG_D).map(|id| (tags::CONFIG_D, id)))
            .ok_or(Error::UnresolvedReference {
                fourcc: tags::CONFIG,
                section_id: -1,
            })?;
        let handle = self.get_chunk(fourcc, id)?;
        {
            let chunk = handle.borrow();
            let config = chunk.as_config().ok_or(Error::UnresolvedReference {
                fourcc,
                section_id: id,
            })?;
            self.version = human_version(config.director_version) as u16;
            self.dot_syntax = self.version >= 700;
        }
        self.config = Some(handle);
        debug!(version = self.version, dot_syntax = self.dot_syntax, "read config");
        Ok(())
    }

    fn read_casts(&mut self) -> Result<()> {
        if self.version >= 500 {
            let Some(id) = self.first_section(tags::CAST_LIST) else {
                return Ok(());
            };
            let handle = self.get_chunk(tags::CAST_LIST, id)?;
            let entries = handle
                .borrow()
                .as_cast_list()
                .map(|list| list.entries.clone())
                .unwrap_or_default();
            for entry in entries {
                let section = self
                    .key_table_entries()?
                    .into_iter()
                    .find(|k| k.cast_id == entry.id && k.fourcc == tags::CAST)
                    .map(|k| k.section_id);
                if let Some(section_id) = section {
                    if self.chunk_exists(tags::CAST, section_id) {
                        let key = (tags::CAST, section_id);
                        self.populate_cast(key, &entry.name, entry.id, entry.min_member)?;
                        self.casts.push(key);
                    }
                }
            }
        } else if let Some(id) = self.first_section(tags::CAST) {
            let min_member = self
                .config
                .as_ref()
                .and_then(|handle| handle.borrow().as_config().map(|c| c.min_member))
                .unwrap_or(0);
            let key = (tags::CAST, id);
            self.populate_cast(key, "Internal", DEFAULT_CAST_ID, min_member)?;
            self.casts.push(key);
        }
        Ok(())
    }

    /// Resolve one cast library: bind its script context (first matching
    /// key-table edge), fault in every occupied member slot, assign logical
    /// member ids, and link members to their scripts both ways.
    pub fn populate_cast(
        &mut self,
        cast_key: ChunkKey,
        name: &str,
        id: i32,
        min_member: u16,
    ) -> Result<()> {
        let cast_handle = self.get_chunk(cast_key.0, cast_key.1)?;
        let member_ids = {
            let chunk = cast_handle.borrow();
            let cast = chunk.as_cast().ok_or(Error::UnresolvedReference {
                fourcc: cast_key.0,
                section_id: cast_key.1,
            })?;
            cast.member_ids.clone()
        };

        let mut lctx_key = None;
        for entry in self.key_table_entries()? {
            if entry.cast_id == id
                && (entry.fourcc == tags::LCTX || entry.fourcc == tags::LCTX_CAPITAL)
                && self.chunk_exists(entry.fourcc, entry.section_id)
            {
                self.get_chunk(entry.fourcc, entry.section_id)?;
                lctx_key = Some((entry.fourcc, entry.section_id));
                break;
            }
        }

        let mut members = BTreeMap::new();
        for (i, &section_id) in member_ids.iter().enumerate() {
            if section_id <= 0 {
                continue;
            }
            let member_handle = self.get_chunk(tags::CAST_MEMBER, section_id)?;
            let member_id = i as i32 + min_member as i32;
            let script_id = {
                let mut chunk = member_handle.borrow_mut();
                let member = chunk.as_cast_member_mut().ok_or(Error::UnresolvedReference {
                    fourcc: tags::CAST_MEMBER,
                    section_id,
                })?;
                member.id = member_id;
                member.script_id()
            };

            if let Some(ctx_key) = lctx_key {
                let script_handle = self.registry.get(&ctx_key).and_then(|ctx| {
                    ctx.borrow()
                        .as_script_context()
                        .and_then(|ctx| ctx.scripts.get(&script_id).cloned())
                });
                if let Some(script_handle) = script_handle {
                    if let Some(script) = script_handle.borrow_mut().as_script_mut() {
                        script.member = Some((tags::CAST_MEMBER, section_id));
                    }
                    if let Some(member) = member_handle.borrow_mut().as_cast_member_mut() {
                        member.script = Some(ScriptRef {
                            context: ctx_key,
                            ordinal: script_id,
                        });
                    }
                }
            }
            members.insert(member_id, member_handle);
        }

        let mut chunk = cast_handle.borrow_mut();
        if let Some(cast) = chunk.as_cast_mut() {
            cast.name = name.to_string();
            cast.lctx = lctx_key;
            cast.members = members;
        }
        Ok(())
    }

    fn key_table_entries(&self) -> Result<Vec<KeyTableEntry>> {
        let handle = self.key_table.as_ref().ok_or(Error::UnresolvedReference {
            fourcc: tags::KEY_TABLE,
            section_id: -1,
        })?;
        let chunk = handle.borrow();
        let table = chunk.as_key_table().ok_or(Error::UnresolvedReference {
            fourcc: tags::KEY_TABLE,
            section_id: -1,
        })?;
        Ok(table.entries.clone())
    }

    /// Handle to the key table, once the load has read it.
    pub fn key_table(&self) -> Option<ChunkHandle> {
        self.key_table.clone()
    }

    /// Handle to the config chunk, once the load has read it.
    pub fn config(&self) -> Option<ChunkHandle> {
        self.config.clone()
    }

    /// Keys of the populated cast libraries, in cast-list order.
    pub fn casts(&self) -> &[ChunkKey] {
        &self.casts
    }

    /// A chunk handle if (and only if) it has already been materialized.
    pub fn registered(&self, key: ChunkKey) -> Option<ChunkHandle> {
        self.registry.get(&key).cloned()
    }

    /// Keys of every materialized chunk, in a stable order.
    pub fn chunk_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.registry.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Install the external bytecode translator used by the translation
    /// pass. Must happen before `load` for scripts to receive ASTs.
    pub fn set_translator(&mut self, translator: Box<dyn Translator>) {
        self.translator = Some(translator);
    }

    pub fn translator(&self) -> Option<&dyn Translator> {
        self.translator.as_deref()
    }
}
