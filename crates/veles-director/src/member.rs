//! Cast member chunks (`CASt`) and their info records (list-shaped).

use serde_json::{json, Value};
use veles_common::{BinaryReader, BinaryWriter, Endianness};

use crate::chunk::ScriptRef;
use crate::list::{ListBody, ListChunk};
use crate::Result;

/// Closed enumeration of member payload categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberType {
    Null = 0,
    Bitmap = 1,
    FilmLoop = 2,
    Text = 3,
    Palette = 4,
    Picture = 5,
    Sound = 6,
    Button = 7,
    Shape = 8,
    Movie = 9,
    DigitalVideo = 10,
    Script = 11,
    RichText = 12,
}

impl Default for MemberType {
    fn default() -> Self {
        MemberType::Null
    }
}

impl MemberType {
    /// Categorize a raw type code; unlisted codes map to `Null`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => MemberType::Bitmap,
            2 => MemberType::FilmLoop,
            3 => MemberType::Text,
            4 => MemberType::Palette,
            5 => MemberType::Picture,
            6 => MemberType::Sound,
            7 => MemberType::Button,
            8 => MemberType::Shape,
            9 => MemberType::Movie,
            10 => MemberType::DigitalVideo,
            11 => MemberType::Script,
            12 => MemberType::RichText,
            _ => MemberType::Null,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MemberType::Null => "null",
            MemberType::Bitmap => "bitmap",
            MemberType::FilmLoop => "filmLoop",
            MemberType::Text => "text",
            MemberType::Palette => "palette",
            MemberType::Picture => "picture",
            MemberType::Sound => "sound",
            MemberType::Button => "button",
            MemberType::Shape => "shape",
            MemberType::Movie => "movie",
            MemberType::DigitalVideo => "digitalVideo",
            MemberType::Script => "script",
            MemberType::RichText => "richText",
        }
    }
}

/// Role of a script member within the movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    Score = 1,
    Movie = 3,
    Parent = 7,
}

impl ScriptType {
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(ScriptType::Score),
            3 => Some(ScriptType::Movie),
            7 => Some(ScriptType::Parent),
            _ => None,
        }
    }
}

/// Typed payload of a script member.
#[derive(Debug, Clone, Default)]
pub struct ScriptMember {
    pub script_type_raw: u16,
}

impl ScriptMember {
    pub fn script_type(&self) -> Option<ScriptType> {
        ScriptType::from_raw(self.script_type_raw)
    }
}

/// Untyped payload: the raw specific-data bytes, re-emitted verbatim.
#[derive(Debug, Clone)]
pub struct GenericMember {
    pub member_type: MemberType,
    pub data: Vec<u8>,
}

/// Decoded view of a member's specific data. Only scripts get a typed
/// decoder; everything else passes through.
#[derive(Debug, Clone)]
pub enum MemberKind {
    Script(ScriptMember),
    Generic(GenericMember),
}

impl MemberKind {
    fn read(member_type: MemberType, data: &[u8], endianness: Endianness) -> Result<Self> {
        match member_type {
            MemberType::Script => {
                let mut cur = BinaryReader::new(data, endianness);
                Ok(MemberKind::Script(ScriptMember {
                    script_type_raw: cur.read_u16()?,
                }))
            }
            _ => Ok(MemberKind::Generic(GenericMember {
                member_type,
                data: data.to_vec(),
            })),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            MemberKind::Script(script) => json!({
                "scriptType": script.script_type_raw,
            }),
            MemberKind::Generic(generic) => json!({
                "dataLen": generic.data.len(),
            }),
        }
    }
}

impl Default for MemberKind {
    fn default() -> Self {
        MemberKind::Generic(GenericMember {
            member_type: MemberType::Null,
            data: Vec::new(),
        })
    }
}

/// The `CASt` chunk: one cast member.
///
/// The layout branched at version 500. The newer form leads with a 32-bit
/// type code and both lengths; the older form packs the type byte (and an
/// optional flags byte) into the front of the specific data.
#[derive(Debug, Default)]
pub struct CastMemberChunk {
    pub type_raw: u32,
    pub member_type: MemberType,
    pub info_len: u32,
    pub specific_data_len: u32,
    pub has_flags1: bool,
    pub flags1: u8,
    /// Absent when the member carries no info record (`info_len == 0`).
    pub info: Option<CastInfoChunk>,
    pub specific_data: Vec<u8>,
    pub kind: MemberKind,
    /// Logical member id, assigned during cast population.
    pub id: i32,
    /// The member's script, when cast population linked one.
    pub script: Option<ScriptRef>,
}

impl CastMemberChunk {
    pub fn read(cur: &mut BinaryReader<'_>, version: u16) -> Result<Self> {
        cur.endianness = Endianness::Big;
        let mut member = Self::default();

        if version >= 500 {
            member.type_raw = cur.read_u32()?;
            member.info_len = cur.read_u32()?;
            member.specific_data_len = cur.read_u32()?;

            member.info = Self::read_info(cur, member.info_len)?;
            member.has_flags1 = false;
            member.specific_data = cur.copy_bytes(member.specific_data_len as usize)?;
        } else {
            member.specific_data_len = cur.read_u16()? as u32;
            member.info_len = cur.read_u32()?;

            // The type byte (and flags, if any) lead the specific data.
            let mut left = member.specific_data_len;
            member.type_raw = cur.read_u8()? as u32;
            left = left
                .checked_sub(1)
                .ok_or(veles_common::Error::UnexpectedEof {
                    needed: 1,
                    available: 0,
                })?;
            if left > 0 {
                member.has_flags1 = true;
                member.flags1 = cur.read_u8()?;
                left -= 1;
            }
            member.specific_data = cur.copy_bytes(left as usize)?;
            member.info = Self::read_info(cur, member.info_len)?;
        }

        member.member_type = MemberType::from_raw(member.type_raw);
        member.kind = MemberKind::read(member.member_type, &member.specific_data, cur.endianness)?;
        Ok(member)
    }

    fn read_info(cur: &mut BinaryReader<'_>, info_len: u32) -> Result<Option<CastInfoChunk>> {
        if info_len == 0 {
            return Ok(None);
        }
        let bytes = cur.read_bytes(info_len as usize)?;
        let mut info_cur = BinaryReader::new(bytes, cur.endianness);
        Ok(Some(CastInfoChunk::read(&mut info_cur)?))
    }

    /// Script id from the info record; zero when there is no info.
    pub fn script_id(&self) -> u32 {
        self.info.as_ref().map_or(0, |info| info.script_id)
    }

    /// Recompute the stored lengths and return the serialized size.
    pub fn size(&mut self, version: u16) -> usize {
        self.info_len = self.info.as_mut().map_or(0, |info| info.size() as u32);
        self.specific_data_len = self.specific_data.len() as u32;
        if version >= 500 {
            12 + self.info_len as usize + self.specific_data_len as usize
        } else {
            // The stripped type and flags bytes count toward the length.
            self.specific_data_len += 1;
            if self.has_flags1 {
                self.specific_data_len += 1;
            }
            2 + 4 + self.specific_data_len as usize + self.info_len as usize
        }
    }

    /// Serialize, mirroring the read order of the selected layout.
    pub fn write(&mut self, w: &mut BinaryWriter, version: u16) {
        w.endianness = Endianness::Big;
        self.size(version);

        if version >= 500 {
            w.write_u32(self.type_raw);
            w.write_u32(self.info_len);
            w.write_u32(self.specific_data_len);
            if let Some(info) = &mut self.info {
                info.write(w);
            }
            w.write_bytes(&self.specific_data);
        } else {
            w.write_u16(self.specific_data_len as u16);
            w.write_u32(self.info_len);
            w.write_u8(self.type_raw as u8);
            if self.has_flags1 {
                w.write_u8(self.flags1);
            }
            w.write_bytes(&self.specific_data);
            if let Some(info) = &mut self.info {
                info.write(w);
            }
        }
    }

    pub fn to_json(&self) -> Value {
        let mut j = json!({
            "type": self.type_raw,
            "infoLen": self.info_len,
        });
        if self.has_flags1 {
            j["flags1"] = json!(self.flags1);
        }
        j["specificDataLen"] = json!(self.specific_data_len);
        j["info"] = self.info.as_ref().map_or(Value::Null, CastInfoChunk::to_json);
        j["member"] = self.kind.to_json();
        j
    }
}

/// The member info record: a list chunk whose first two items are the
/// script source text and the member name. Items 2..21 have tentative
/// meanings (comment, timestamps, GUIDs, image compression) and are passed
/// through untouched.
#[derive(Debug, Clone, Default)]
pub struct CastInfoChunk {
    pub list: ListBody,
    pub unk1: u32,
    pub unk2: u32,
    pub flags: u32,
    pub script_id: u32,
    pub script_src_text: String,
    pub name: String,
}

impl ListChunk for CastInfoChunk {
    fn body(&self) -> &ListBody {
        &self.list
    }

    fn body_mut(&mut self) -> &mut ListBody {
        &mut self.list
    }

    fn read_header(&mut self, cur: &mut BinaryReader<'_>) -> Result<()> {
        self.list.data_offset = cur.read_u32()?;
        self.unk1 = cur.read_u32()?;
        self.unk2 = cur.read_u32()?;
        self.flags = cur.read_u32()?;
        self.script_id = cur.read_u32()?;
        Ok(())
    }

    fn header_size(&self) -> usize {
        20
    }

    fn write_header(&self, w: &mut BinaryWriter) {
        w.write_u32(self.header_size() as u32);
        w.write_u32(self.unk1);
        w.write_u32(self.unk2);
        w.write_u32(self.flags);
        w.write_u32(self.script_id);
    }

    fn item_size(&self, index: u16) -> usize {
        match index {
            0 => self.script_src_text.chars().count(),
            1 => {
                let len = self.name.chars().count();
                if len > 0 {
                    1 + len
                } else {
                    0
                }
            }
            _ => self.list.items.get(index as usize).map_or(0, Vec::len),
        }
    }

    fn write_item(&self, w: &mut BinaryWriter, index: u16) {
        match index {
            0 => w.write_string(&self.script_src_text),
            1 => {
                if !self.name.is_empty() {
                    w.write_pascal_string(&self.name);
                }
            }
            _ => {
                if let Some(item) = self.list.items.get(index as usize) {
                    w.write_bytes(item);
                }
            }
        }
    }
}

impl CastInfoChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        let mut info = Self::default();
        info.read_list(cur)?;
        info.script_src_text = info.list.string(0);
        info.name = info.list.pascal_string(1)?;
        Ok(info)
    }

    pub fn size(&mut self) -> usize {
        self.list_size()
    }

    pub fn write(&mut self, w: &mut BinaryWriter) {
        self.write_list(w);
    }

    pub fn to_json(&self) -> Value {
        json!({
            "dataOffset": self.list.data_offset,
            "unk1": self.unk1,
            "unk2": self.unk2,
            "flags": self.flags,
            "scriptId": self.script_id,
            "scriptSrcText": self.script_src_text,
            "name": self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_500_member_roundtrip() {
        // specific_data_len = 3 (type + flags + one byte), info_len = 0
        let bytes = [
            0x00, 0x03, // specific_data_len
            0x00, 0x00, 0x00, 0x00, // info_len
            0x01, // type
            0x02, // flags1
            0xAA, // specific data
        ];
        let mut member =
            CastMemberChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big), 404).unwrap();
        assert_eq!(member.member_type, MemberType::Bitmap);
        assert!(member.has_flags1);
        assert_eq!(member.flags1, 0x02);
        assert_eq!(member.specific_data, vec![0xAA]);
        assert!(member.info.is_none());

        let mut w = BinaryWriter::new(Endianness::Big);
        member.write(&mut w, 404);
        assert_eq!(w.into_bytes(), bytes);
    }

    #[test]
    fn test_pre_500_member_without_flags() {
        // A script member with no specific data fails the typed decode.
        let bytes = [
            0x00, 0x01, // specific_data_len: just the type byte
            0x00, 0x00, 0x00, 0x00, // info_len
            0x0B, // type = script
        ];
        assert!(
            CastMemberChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big), 404).is_err()
        );

        let bytes = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x06, // type = sound, no flags
        ];
        let member =
            CastMemberChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big), 404).unwrap();
        assert!(!member.has_flags1);
        assert_eq!(member.member_type, MemberType::Sound);
        assert!(member.specific_data.is_empty());
    }

    #[test]
    fn test_post_500_member_roundtrip_with_info() {
        let mut info = CastInfoChunk {
            script_id: 3,
            script_src_text: "on foo\rend".into(),
            name: "foo".into(),
            ..Default::default()
        };
        info.list.offset_table = vec![0, 0];
        info.list.items = vec![Vec::new(), Vec::new()];

        let mut member = CastMemberChunk {
            type_raw: 11,
            member_type: MemberType::Script,
            info: Some(info),
            specific_data: vec![0x00, 0x01],
            kind: MemberKind::Script(ScriptMember { script_type_raw: 1 }),
            ..Default::default()
        };

        let mut w = BinaryWriter::new(Endianness::Big);
        member.write(&mut w, 500);
        let bytes = w.into_bytes();

        let back =
            CastMemberChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big), 500).unwrap();
        assert_eq!(back.member_type, MemberType::Script);
        assert_eq!(back.script_id(), 3);
        let info = back.info.as_ref().unwrap();
        assert_eq!(info.script_src_text, "on foo\rend");
        assert_eq!(info.name, "foo");
        assert_eq!(back.specific_data, vec![0x00, 0x01]);
        match &back.kind {
            MemberKind::Script(script) => {
                assert_eq!(script.script_type(), Some(ScriptType::Score))
            }
            other => panic!("expected script payload, got {:?}", other),
        }
    }

    #[test]
    fn test_info_name_emptied_writes_zero_length_item() {
        let mut info = CastInfoChunk {
            name: String::new(),
            script_src_text: "x".into(),
            ..Default::default()
        };
        info.list.offset_table = vec![0, 0];
        info.list.items = vec![Vec::new(), Vec::new()];

        assert_eq!(info.item_size(0), 1);
        assert_eq!(info.item_size(1), 0);

        let mut w = BinaryWriter::new(Endianness::Big);
        info.write(&mut w);
        let bytes = w.into_bytes();
        let back = CastInfoChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big)).unwrap();
        assert_eq!(back.name, "");
        assert_eq!(back.script_src_text, "x");
    }
}
