//! Four-character codes identifying chunk types.

use std::fmt;

use crate::Endianness;

/// A four-character code, stored as the big-endian interpretation of its
/// four ASCII bytes (`"RIFX"` is `0x52494658`).
///
/// In a little-endian container the four bytes appear reversed on disk;
/// [`FourCC::from_bytes`] and [`FourCC::to_bytes`] take the byte order of
/// the enclosing file so the logical value is the same either way.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub u32);

impl FourCC {
    /// Build a code from a literal tag, e.g. `FourCC::new(b"CASt")`.
    pub const fn new(tag: &[u8; 4]) -> Self {
        FourCC(u32::from_be_bytes(*tag))
    }

    /// Decode four bytes read from a file with the given byte order.
    pub fn from_bytes(bytes: [u8; 4], endianness: Endianness) -> Self {
        match endianness {
            Endianness::Big => FourCC(u32::from_be_bytes(bytes)),
            Endianness::Little => FourCC(u32::from_le_bytes(bytes)),
        }
    }

    /// Encode the code for a file with the given byte order.
    pub fn to_bytes(self, endianness: Endianness) -> [u8; 4] {
        match endianness {
            Endianness::Big => self.0.to_be_bytes(),
            Endianness::Little => self.0.to_le_bytes(),
        }
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.to_be_bytes() {
            if (0x20..0x7f).contains(&b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_both_orders() {
        let cc = FourCC::new(b"RIFX");
        assert_eq!(cc.0, 0x5249_4658);
        assert_eq!(FourCC::from_bytes(cc.to_bytes(Endianness::Big), Endianness::Big), cc);
        assert_eq!(
            FourCC::from_bytes(cc.to_bytes(Endianness::Little), Endianness::Little),
            cc
        );
        assert_eq!(cc.to_bytes(Endianness::Little), *b"XFIR");
    }

    #[test]
    fn test_display() {
        assert_eq!(FourCC::new(b"CAS*").to_string(), "CAS*");
        assert_eq!(FourCC(0x0001_4141).to_string(), "\\x00\\x01AA");
    }
}
