//! Handler records inside a script chunk.
//!
//! Handlers are read in two passes: the fixed-size records come first, then
//! each handler's data (bytecode, name-id tables, line table) is pulled in
//! from the offsets the records carry. The two passes exist because the
//! data offsets are only meaningful once every record is known.

use serde_json::{json, Value};
use veles_common::BinaryReader;

use crate::lingo::{AstNode, Bytecode, LINE_ENDING};
use crate::names::ScriptNamesChunk;
use crate::Result;

/// A named bytecode-defined function.
#[derive(Debug, Default)]
pub struct Handler {
    pub name_id: i16,
    pub vector_pos: u16,
    pub compiled_len: u32,
    pub compiled_offset: u32,
    pub argument_count: u16,
    pub argument_offset: u32,
    pub locals_count: u16,
    pub locals_offset: u32,
    pub globals_count: u16,
    pub globals_offset: u32,
    pub unknown1: u32,
    pub unknown2: u16,
    pub line_count: u16,
    pub line_offset: u32,
    /// Only present under the capital-X context layout.
    pub stack_height: u32,

    pub bytecode: Vec<Bytecode>,
    pub argument_name_ids: Vec<i16>,
    pub local_name_ids: Vec<i16>,
    pub global_name_ids: Vec<i16>,
    /// Per-line table, kept opaque.
    pub line_table: Vec<u8>,

    pub name: String,
    pub argument_names: Vec<String>,
    pub local_names: Vec<String>,
    pub global_names: Vec<String>,

    /// Filled by an installed translator; `None` until then.
    pub ast: Option<Box<dyn AstNode>>,
}

impl Handler {
    /// First pass: the fixed record.
    pub fn read_record(cur: &mut BinaryReader<'_>, capital_x: bool) -> Result<Self> {
        let mut handler = Self {
            name_id: cur.read_i16()?,
            vector_pos: cur.read_u16()?,
            compiled_len: cur.read_u32()?,
            compiled_offset: cur.read_u32()?,
            argument_count: cur.read_u16()?,
            argument_offset: cur.read_u32()?,
            locals_count: cur.read_u16()?,
            locals_offset: cur.read_u32()?,
            globals_count: cur.read_u16()?,
            globals_offset: cur.read_u32()?,
            unknown1: cur.read_u32()?,
            unknown2: cur.read_u16()?,
            line_count: cur.read_u16()?,
            line_offset: cur.read_u32()?,
            ..Default::default()
        };
        if capital_x {
            handler.stack_height = cur.read_u32()?;
        }
        Ok(handler)
    }

    /// Second pass: bytecode, name-id tables, and the line table.
    pub fn read_data(&mut self, cur: &mut BinaryReader<'_>) -> Result<()> {
        cur.seek(self.compiled_offset as usize);
        let base = cur.position();
        let end = base + self.compiled_len as usize;
        self.bytecode = Vec::new();
        while cur.position() < end {
            self.bytecode.push(Bytecode::read(cur, base)?);
        }

        self.argument_name_ids =
            read_varnames_table(cur, self.argument_count, self.argument_offset)?;
        self.local_name_ids = read_varnames_table(cur, self.locals_count, self.locals_offset)?;
        self.global_name_ids = read_varnames_table(cur, self.globals_count, self.globals_offset)?;

        cur.seek(self.line_offset as usize);
        self.line_table = cur.copy_bytes(self.line_count as usize)?;
        Ok(())
    }

    /// Resolve the handler name and the three name-id tables.
    pub fn read_names(&mut self, names: &ScriptNamesChunk) {
        self.name = names.get_name(self.name_id as i32);
        self.argument_names = self
            .argument_name_ids
            .iter()
            .map(|&id| names.get_name(id as i32))
            .collect();
        self.local_names = self
            .local_name_ids
            .iter()
            .map(|&id| names.get_name(id as i32))
            .collect();
        self.global_names = self
            .global_name_ids
            .iter()
            .map(|&id| names.get_name(id as i32))
            .collect();
    }

    /// Disassembly: `on <name> <args>`, one line per instruction, `end`.
    pub fn bytecode_text(&self) -> String {
        let mut res = format!("on {}", self.name);
        if !self.argument_names.is_empty() {
            res.push(' ');
            res.push_str(&self.argument_names.join(", "));
        }
        res.push_str(LINE_ENDING);
        for bytecode in &self.bytecode {
            res.push_str(&format!("  {:3}: {}", bytecode.pos, bytecode.text()));
            res.push_str(LINE_ENDING);
        }
        res.push_str("end");
        res
    }

    pub fn to_json(&self) -> Value {
        json!({
            "nameID": self.name_id,
            "vectorPos": self.vector_pos,
            "compiledLen": self.compiled_len,
            "compiledOffset": self.compiled_offset,
            "argumentCount": self.argument_count,
            "argumentOffset": self.argument_offset,
            "localsCount": self.locals_count,
            "localsOffset": self.locals_offset,
            "globalsCount": self.globals_count,
            "globalsOffset": self.globals_offset,
            "unknown1": self.unknown1,
            "unknown2": self.unknown2,
            "lineCount": self.line_count,
            "lineOffset": self.line_offset,
            "stackHeight": self.stack_height,
        })
    }
}

/// Read `count` i16 name ids from `offset`.
pub(crate) fn read_varnames_table(
    cur: &mut BinaryReader<'_>,
    count: u16,
    offset: u32,
) -> Result<Vec<i16>> {
    cur.seek(offset as usize);
    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        ids.push(cur.read_i16()?);
    }
    Ok(ids)
}
