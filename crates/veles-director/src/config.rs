//! The movie configuration chunk (`VWCF` / `DRCF`).
//!
//! A fixed 68-byte record followed by a version-dependent tail that is
//! carried verbatim. The record ends in a checksum computed by an
//! order-sensitive arithmetic recipe over the preceding fields; two of the
//! steps branch on the human product version. The stored checksum is
//! validated on read (mismatch is logged, not fatal) and regenerated on
//! write.

use serde_json::{json, Value};
use tracing::warn;
use veles_common::{BinaryReader, BinaryWriter, Endianness};

use crate::util::human_version;
use crate::Result;

/// Size of the fixed portion, up to and including the checksum.
const FIXED_LEN: usize = 68;

#[derive(Debug, Clone, Default)]
pub struct ConfigChunk {
    /*  0 */ pub len: u16,
    /*  2 */ pub file_version: u16,
    /*  4 */ pub movie_top: i16,
    /*  6 */ pub movie_left: i16,
    /*  8 */ pub movie_bottom: i16,
    /* 10 */ pub movie_right: i16,
    /* 12 */ pub min_member: u16,
    /* 14 */ pub max_member: u16,
    /* 16 */ pub field9: u8,
    /* 17 */ pub field10: u8,
    /* 18 */ pub field11: i16,
    /* 20 */ pub comment_font: i16,
    /* 22 */ pub comment_size: i16,
    /* 24 */ pub comment_style: u16,
    /* 26 */ pub stage_color: i16,
    /* 28 */ pub bit_depth: i16,
    /* 30 */ pub field17: u8,
    /* 31 */ pub field18: u8,
    /* 32 */ pub field19: i32,
    /* 36 */ pub director_version: i16,
    /* 38 */ pub field21: i16,
    /* 40 */ pub field22: i32,
    /* 44 */ pub field23: i32,
    /* 48 */ pub field24: i32,
    /* 52 */ pub field25: u8,
    /* 53 */ pub field26: u8,
    /* 54 */ pub frame_rate: i16,
    /* 56 */ pub platform: i16,
    /* 58 */ pub protection: i16,
    /* 60 */ pub field29: i32,
    /* 64 */ pub checksum: u32,
    /* 68 */ pub remnants: Vec<u8>,
}

impl ConfigChunk {
    pub fn read(cur: &mut BinaryReader<'_>) -> Result<Self> {
        cur.endianness = Endianness::Big;

        let mut config = Self {
            len: cur.read_u16()?,
            file_version: cur.read_u16()?,
            movie_top: cur.read_i16()?,
            movie_left: cur.read_i16()?,
            movie_bottom: cur.read_i16()?,
            movie_right: cur.read_i16()?,
            min_member: cur.read_u16()?,
            max_member: cur.read_u16()?,
            field9: cur.read_u8()?,
            field10: cur.read_u8()?,
            field11: cur.read_i16()?,
            comment_font: cur.read_i16()?,
            comment_size: cur.read_i16()?,
            comment_style: cur.read_u16()?,
            stage_color: cur.read_i16()?,
            bit_depth: cur.read_i16()?,
            field17: cur.read_u8()?,
            field18: cur.read_u8()?,
            field19: cur.read_i32()?,
            director_version: cur.read_i16()?,
            field21: cur.read_i16()?,
            field22: cur.read_i32()?,
            field23: cur.read_i32()?,
            field24: cur.read_i32()?,
            field25: cur.read_u8()?,
            field26: cur.read_u8()?,
            frame_rate: cur.read_i16()?,
            platform: cur.read_i16()?,
            protection: cur.read_i16()?,
            field29: cur.read_i32()?,
            checksum: cur.read_u32()?,
            remnants: Vec::new(),
        };

        let tail = (config.len as usize).checked_sub(cur.position()).ok_or(
            veles_common::Error::UnexpectedEof {
                needed: FIXED_LEN,
                available: config.len as usize,
            },
        )?;
        config.remnants = cur.copy_bytes(tail)?;

        let computed = config.compute_checksum();
        if config.checksum != computed {
            warn!(
                stored = config.checksum,
                computed, "config checksums don't match"
            );
        }

        Ok(config)
    }

    pub fn size(&self) -> usize {
        self.len as usize
    }

    /// Serialize; the checksum field is regenerated first.
    pub fn write(&mut self, w: &mut BinaryWriter) {
        w.endianness = Endianness::Big;

        self.checksum = self.compute_checksum();

        w.write_u16(self.len);
        w.write_u16(self.file_version);
        w.write_i16(self.movie_top);
        w.write_i16(self.movie_left);
        w.write_i16(self.movie_bottom);
        w.write_i16(self.movie_right);
        w.write_u16(self.min_member);
        w.write_u16(self.max_member);
        w.write_u8(self.field9);
        w.write_u8(self.field10);
        w.write_i16(self.field11);
        w.write_i16(self.comment_font);
        w.write_i16(self.comment_size);
        w.write_u16(self.comment_style);
        w.write_i16(self.stage_color);
        w.write_i16(self.bit_depth);
        w.write_u8(self.field17);
        w.write_u8(self.field18);
        w.write_i32(self.field19);
        w.write_i16(self.director_version);
        w.write_i16(self.field21);
        w.write_i32(self.field22);
        w.write_i32(self.field23);
        w.write_i32(self.field24);
        w.write_u8(self.field25);
        w.write_u8(self.field26);
        w.write_i16(self.frame_rate);
        w.write_i16(self.platform);
        w.write_i16(self.protection);
        w.write_i32(self.field29);
        w.write_u32(self.checksum);
        w.write_bytes(&self.remnants);
    }

    /// The order-sensitive checksum over the fixed fields.
    ///
    /// The accumulator is a 32-bit signed value with two's-complement
    /// wrap-around; division is signed with truncation toward zero. The
    /// `comment_style` and `stage_color` steps branch on the human product
    /// version derived from `director_version`.
    pub fn compute_checksum(&self) -> u32 {
        let ver = human_version(self.director_version);

        let mut check: i32 = (self.len as i32).wrapping_add(1);
        check = check.wrapping_mul(self.file_version as i32 + 2);
        check = check.wrapping_div(self.movie_top as i32 + 3);
        check = check.wrapping_mul(self.movie_left as i32 + 4);
        check = check.wrapping_div(self.movie_bottom as i32 + 5);
        check = check.wrapping_mul(self.movie_right as i32 + 6);
        check = check.wrapping_sub(self.min_member as i32 + 7);
        check = check.wrapping_mul(self.max_member as i32 + 8);
        check = check.wrapping_sub(self.field9 as i32 + 9);
        check = check.wrapping_sub(self.field10 as i32 + 10);
        check = check.wrapping_add(self.field11 as i32 + 11);
        check = check.wrapping_mul(self.comment_font as i32 + 12);
        check = check.wrapping_add(self.comment_size as i32 + 13);
        let style = if ver < 800 {
            (self.comment_style >> 8) as i32 & 0xFF
        } else {
            self.comment_style as i32
        };
        check = check.wrapping_mul(style + 14);
        let color = if ver < 700 {
            self.stage_color as i32
        } else {
            self.stage_color as i32 & 0xFF
        };
        check = check.wrapping_add(color + 15);
        check = check.wrapping_add(self.bit_depth as i32 + 16);
        check = check.wrapping_add(self.field17 as i32 + 17);
        check = check.wrapping_mul(self.field18 as i32 + 18);
        check = check.wrapping_add(self.field19.wrapping_add(19));
        check = check.wrapping_mul(self.director_version as i32 + 20);
        check = check.wrapping_add(self.field21 as i32 + 21);
        check = check.wrapping_add(self.field22.wrapping_add(22));
        check = check.wrapping_add(self.field23.wrapping_add(23));
        check = check.wrapping_add(self.field24.wrapping_add(24));
        check = check.wrapping_mul(self.field25 as i32 + 25);
        check = check.wrapping_add(self.frame_rate as i32 + 26);
        check = check.wrapping_mul(self.platform as i32 + 27);
        check = check.wrapping_mul((self.protection as i32).wrapping_mul(0xE06).wrapping_add(0xFF45_0000u32 as i32));
        check ^= u32::from_be_bytes(*b"ralf") as i32;
        check as u32
    }

    pub fn to_json(&self) -> Value {
        json!({
            "len": self.len,
            "fileVersion": self.file_version,
            "movieTop": self.movie_top,
            "movieLeft": self.movie_left,
            "movieBottom": self.movie_bottom,
            "movieRight": self.movie_right,
            "minMember": self.min_member,
            "maxMember": self.max_member,
            "field9": self.field9,
            "field10": self.field10,
            "field11": self.field11,
            "commentFont": self.comment_font,
            "commentSize": self.comment_size,
            "commentStyle": self.comment_style,
            "stageColor": self.stage_color,
            "bitDepth": self.bit_depth,
            "field17": self.field17,
            "field18": self.field18,
            "field19": self.field19,
            "directorVersion": self.director_version,
            "field21": self.field21,
            "field22": self.field22,
            "field23": self.field23,
            "field24": self.field24,
            "field25": self.field25,
            "field26": self.field26,
            "frameRate": self.frame_rate,
            "platform": self.platform,
            "protection": self.protection,
            "field29": self.field29,
            "checksum": self.checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(director_version: i16) -> ConfigChunk {
        ConfigChunk {
            len: 72,
            file_version: 1024,
            movie_top: 1,
            movie_left: 1,
            movie_bottom: 1,
            movie_right: 1,
            min_member: 1,
            max_member: 1,
            comment_style: 0x0100,
            stage_color: 0xFF,
            director_version,
            frame_rate: 15,
            platform: 1,
            remnants: vec![0xDE, 0xAD, 0xBE, 0xEF],
            ..Default::default()
        }
    }

    #[test]
    fn test_checksum_is_deterministic() {
        let config = sample_config(1224);
        assert_eq!(config.compute_checksum(), config.compute_checksum());
    }

    #[test]
    fn test_comment_style_branch() {
        // comment_style = 0x0100: the v<800 branch sees 1, v>=800 sees 256.
        assert_ne!(
            sample_config(1224).compute_checksum(),
            sample_config(1410).compute_checksum()
        );
    }

    #[test]
    fn test_stage_color_branch() {
        // A color bit above 0xFF only reaches the accumulator for v < 700.
        let mut low = sample_config(1218);
        low.stage_color = 0x1FF;
        let mut low_masked = sample_config(1218);
        low_masked.stage_color = 0xFF;
        assert_ne!(low.compute_checksum(), low_masked.compute_checksum());

        let mut high = sample_config(1224);
        high.stage_color = 0x1FF;
        let mut high_masked = sample_config(1224);
        high_masked.stage_color = 0xFF;
        assert_eq!(high.compute_checksum(), high_masked.compute_checksum());
    }

    #[test]
    fn test_write_regenerates_checksum() {
        let mut config = sample_config(1224);
        config.checksum = 0;
        let mut w = BinaryWriter::new(Endianness::Big);
        config.write(&mut w);
        let bytes = w.into_bytes();

        // checksum lives at offset 64
        let stored = u32::from_be_bytes([bytes[64], bytes[65], bytes[66], bytes[67]]);
        assert_eq!(stored, config.compute_checksum());
    }

    #[test]
    fn test_byte_exact_roundtrip() {
        let mut config = sample_config(1224);
        let mut w = BinaryWriter::new(Endianness::Big);
        config.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), config.size());

        let mut back =
            ConfigChunk::read(&mut BinaryReader::new(&bytes, Endianness::Big)).unwrap();
        assert_eq!(back.remnants, config.remnants);

        let mut w2 = BinaryWriter::new(Endianness::Big);
        back.write(&mut w2);
        assert_eq!(w2.into_bytes(), bytes);
    }
}
