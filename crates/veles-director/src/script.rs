//! The `Lscr` script chunk: a compiled script resource.
//!
//! The chunk is a sparse fixed-offset header followed by regions located by
//! offset/count pairs: property and global name-id tables, handler records
//! plus their data, and literal records plus theirs. Handlers and literals
//! are both two-pass reads, since their data offsets only resolve once all
//! records are in.

use serde_json::{json, Value};
use veles_common::{BinaryReader, Endianness};

use crate::chunk::ChunkKey;
use crate::lingo::{read_varnames_table, Handler, Literal, Translator, LINE_ENDING};
use crate::names::ScriptNamesChunk;
use crate::Result;

#[derive(Debug, Default)]
pub struct ScriptChunk {
    pub total_length: u32,
    pub total_length2: u32,
    pub header_length: u16,
    pub script_number: u16,
    pub script_behavior: u32,
    pub handler_vectors_count: u16,
    pub handler_vectors_offset: u32,
    pub handler_vectors_size: u32,
    pub properties_count: u16,
    pub properties_offset: u32,
    pub globals_count: u16,
    pub globals_offset: u32,
    pub handlers_count: u16,
    pub handlers_offset: u32,
    pub literals_count: u16,
    pub literals_offset: u32,
    pub literals_data_count: u32,
    pub literals_data_offset: u32,

    pub property_name_ids: Vec<i16>,
    pub global_name_ids: Vec<i16>,
    pub handlers: Vec<Handler>,
    pub literals: Vec<Literal>,

    /// Resolved once the owning context binds itself.
    pub property_names: Vec<String>,
    pub global_names: Vec<String>,
    /// Key of the owning script context.
    pub context: Option<ChunkKey>,
    /// Key of the cast member this script belongs to, when linked.
    pub member: Option<ChunkKey>,
}

impl ScriptChunk {
    pub fn read(cur: &mut BinaryReader<'_>, version: u16, capital_x: bool) -> Result<Self> {
        cur.seek(8);
        // Scripts are big endian regardless of the file byte order.
        cur.endianness = Endianness::Big;

        let mut script = Self::default();
        script.total_length = cur.read_u32()?;
        script.total_length2 = cur.read_u32()?;
        script.header_length = cur.read_u16()?;
        script.script_number = cur.read_u16()?;
        cur.seek(38);
        script.script_behavior = cur.read_u32()?;
        cur.seek(50);
        script.handler_vectors_count = cur.read_u16()?;
        script.handler_vectors_offset = cur.read_u32()?;
        script.handler_vectors_size = cur.read_u32()?;
        script.properties_count = cur.read_u16()?;
        script.properties_offset = cur.read_u32()?;
        script.globals_count = cur.read_u16()?;
        script.globals_offset = cur.read_u32()?;
        script.handlers_count = cur.read_u16()?;
        script.handlers_offset = cur.read_u32()?;
        script.literals_count = cur.read_u16()?;
        script.literals_offset = cur.read_u32()?;
        script.literals_data_count = cur.read_u32()?;
        script.literals_data_offset = cur.read_u32()?;

        script.property_name_ids =
            read_varnames_table(cur, script.properties_count, script.properties_offset)?;
        script.global_name_ids =
            read_varnames_table(cur, script.globals_count, script.globals_offset)?;

        cur.seek(script.handlers_offset as usize);
        script.handlers = Vec::with_capacity(script.handlers_count as usize);
        for _ in 0..script.handlers_count {
            script.handlers.push(Handler::read_record(cur, capital_x)?);
        }
        for handler in &mut script.handlers {
            handler.read_data(cur)?;
        }

        cur.seek(script.literals_offset as usize);
        script.literals = Vec::with_capacity(script.literals_count as usize);
        for _ in 0..script.literals_count {
            script.literals.push(Literal::read_record(cur, version)?);
        }
        for literal in &mut script.literals {
            literal.read_data(cur, script.literals_data_offset)?;
        }

        Ok(script)
    }

    /// Bind the owning context: record its key and resolve every name-id
    /// table (the script's own and each handler's) through `names`.
    pub fn set_context(&mut self, context: ChunkKey, names: &ScriptNamesChunk) {
        self.context = Some(context);
        self.property_names = self
            .property_name_ids
            .iter()
            .map(|&id| names.get_name(id as i32))
            .collect();
        self.global_names = self
            .global_name_ids
            .iter()
            .map(|&id| names.get_name(id as i32))
            .collect();
        for handler in &mut self.handlers {
            handler.read_names(names);
        }
    }

    /// Run the translation pass over every handler.
    pub fn translate(&mut self, translator: &dyn Translator) {
        for handler in &mut self.handlers {
            handler.ast = Some(translator.translate(handler));
        }
    }

    /// `property a, b` and `global x, y` lines; empty when the script
    /// declares neither.
    pub fn var_declarations(&self) -> String {
        let mut res = String::new();
        if !self.property_names.is_empty() {
            res.push_str("property ");
            res.push_str(&self.property_names.join(", "));
            res.push_str(LINE_ENDING);
        }
        if !self.global_names.is_empty() {
            res.push_str("global ");
            res.push_str(&self.global_names.join(", "));
            res.push_str(LINE_ENDING);
        }
        res
    }

    /// Translated source text; `None` until a translation pass has given
    /// every handler an AST.
    pub fn script_text(&self, dot_syntax: bool) -> Option<String> {
        let mut res = self.var_declarations();
        for handler in &self.handlers {
            let ast = handler.ast.as_ref()?;
            if !res.is_empty() {
                res.push_str(LINE_ENDING);
            }
            res.push_str(&ast.render(dot_syntax));
        }
        Some(res)
    }

    /// Disassembly of every handler, prefixed by the declarations.
    pub fn bytecode_text(&self) -> String {
        let mut res = self.var_declarations();
        for handler in &self.handlers {
            if !res.is_empty() {
                res.push_str(LINE_ENDING);
            }
            res.push_str(&handler.bytecode_text());
        }
        res
    }

    pub fn to_json(&self) -> Value {
        json!({
            "totalLength": self.total_length,
            "totalLength2": self.total_length2,
            "headerLength": self.header_length,
            "scriptNumber": self.script_number,
            "scriptBehavior": self.script_behavior,
            "handlerVectorsCount": self.handler_vectors_count,
            "handlerVectorsOffset": self.handler_vectors_offset,
            "handlerVectorsSize": self.handler_vectors_size,
            "propertiesCount": self.properties_count,
            "propertiesOffset": self.properties_offset,
            "globalsCount": self.globals_count,
            "globalsOffset": self.globals_offset,
            "handlersCount": self.handlers_count,
            "handlersOffset": self.handlers_offset,
            "literalsCount": self.literals_count,
            "literalsOffset": self.literals_offset,
            "literalsDataCount": self.literals_data_count,
            "literalsDataOffset": self.literals_data_offset,
            "propertyNameIDs": self.property_name_ids,
            "globalNameIDs": self.global_name_ids,
            "handlers": self.handlers.iter().map(Handler::to_json).collect::<Vec<_>>(),
            "literals": self.literals.iter().map(Literal::to_json).collect::<Vec<_>>(),
        })
    }
}
