//! Literal records inside a script chunk.

use serde_json::{json, Value};
use veles_common::BinaryReader;

use crate::Result;

/// Known literal type codes.
pub const LITERAL_STRING: u32 = 1;
pub const LITERAL_INT: u32 = 4;
pub const LITERAL_FLOAT: u32 = 9;

/// A decoded literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Int(i32),
    Float(f64),
    /// A type code this decoder has no value representation for.
    Null,
}

/// One literal: a type code, a record-local offset into the literal data
/// region, and the decoded value.
#[derive(Debug, Clone)]
pub struct Literal {
    pub literal_type: u32,
    pub offset: u32,
    pub value: LiteralValue,
}

impl Literal {
    /// First pass: the record. The type field widened from u16 to u32 in
    /// the 500 layout.
    pub fn read_record(cur: &mut BinaryReader<'_>, version: u16) -> Result<Self> {
        let literal_type = if version >= 500 {
            cur.read_u32()?
        } else {
            cur.read_u16()? as u32
        };
        let offset = cur.read_u32()?;
        Ok(Self {
            literal_type,
            offset,
            value: LiteralValue::Null,
        })
    }

    /// Second pass: the value. Ints live in the record's offset field;
    /// strings and floats are length-prefixed blobs in the data region.
    pub fn read_data(&mut self, cur: &mut BinaryReader<'_>, data_offset: u32) -> Result<()> {
        if self.literal_type == LITERAL_INT {
            self.value = LiteralValue::Int(self.offset as i32);
            return Ok(());
        }

        cur.seek((data_offset + self.offset) as usize);
        let length = cur.read_u32()?;
        self.value = match self.literal_type {
            LITERAL_STRING => {
                // Trailing NUL is not part of the value.
                let length = length.saturating_sub(1) as usize;
                LiteralValue::String(cur.read_string(length)?)
            }
            LITERAL_FLOAT => {
                let float = if length == 8 {
                    cur.read_f64()?
                } else if length == 10 {
                    cur.read_apple_float80()?
                } else {
                    0.0
                };
                LiteralValue::Float(float)
            }
            _ => LiteralValue::Null,
        };
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let value = match &self.value {
            LiteralValue::String(s) => json!(s),
            LiteralValue::Int(i) => json!(i),
            LiteralValue::Float(f) => json!(f),
            LiteralValue::Null => Value::Null,
        };
        json!({
            "type": self.literal_type,
            "offset": self.offset,
            "value": value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veles_common::{BinaryWriter, Endianness};

    #[test]
    fn test_record_width_branches_on_version() {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u16(LITERAL_STRING as u16);
        w.write_u32(0);
        let bytes = w.into_bytes();
        let lit =
            Literal::read_record(&mut BinaryReader::new(&bytes, Endianness::Big), 404).unwrap();
        assert_eq!(lit.literal_type, LITERAL_STRING);

        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u32(LITERAL_FLOAT);
        w.write_u32(12);
        let bytes = w.into_bytes();
        let lit =
            Literal::read_record(&mut BinaryReader::new(&bytes, Endianness::Big), 500).unwrap();
        assert_eq!(lit.literal_type, LITERAL_FLOAT);
        assert_eq!(lit.offset, 12);
    }

    #[test]
    fn test_int_value_comes_from_offset_field() {
        let mut lit = Literal {
            literal_type: LITERAL_INT,
            offset: 0xFFFF_FFFE, // -2
            value: LiteralValue::Null,
        };
        let mut cur = BinaryReader::new(&[], Endianness::Big);
        lit.read_data(&mut cur, 0).unwrap();
        assert_eq!(lit.value, LiteralValue::Int(-2));
    }

    #[test]
    fn test_string_value_drops_trailing_nul() {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u32(6);
        w.write_bytes(b"hello\0");
        let bytes = w.into_bytes();

        let mut lit = Literal {
            literal_type: LITERAL_STRING,
            offset: 0,
            value: LiteralValue::Null,
        };
        lit.read_data(&mut BinaryReader::new(&bytes, Endianness::Big), 0)
            .unwrap();
        assert_eq!(lit.value, LiteralValue::String("hello".into()));
    }

    #[test]
    fn test_float_lengths() {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u32(8);
        w.write_bytes(&1.5f64.to_be_bytes());
        // a 10-byte 1.0 at offset 12
        w.write_u32(10);
        w.write_bytes(&[0x3F, 0xFF, 0x80, 0, 0, 0, 0, 0, 0, 0]);
        let bytes = w.into_bytes();

        let mut lit = Literal {
            literal_type: LITERAL_FLOAT,
            offset: 0,
            value: LiteralValue::Null,
        };
        lit.read_data(&mut BinaryReader::new(&bytes, Endianness::Big), 0)
            .unwrap();
        assert_eq!(lit.value, LiteralValue::Float(1.5));

        let mut lit = Literal {
            literal_type: LITERAL_FLOAT,
            offset: 12,
            value: LiteralValue::Null,
        };
        lit.read_data(&mut BinaryReader::new(&bytes, Endianness::Big), 0)
            .unwrap();
        assert_eq!(lit.value, LiteralValue::Float(1.0));
    }
}
