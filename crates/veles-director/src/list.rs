//! List-chunk substrate.
//!
//! Several chunk types share one on-disk shape: a chunk-specific header
//! whose first field locates an offset table, then the table itself, then a
//! run of concatenated item payloads. [`ListBody`] holds the shared state;
//! the [`ListChunk`] trait supplies the read/write cycle, with the
//! chunk-specific header and any typed items expressed as overrides.
//!
//! Items are retained as opaque byte buffers and re-decoded lazily through
//! sub-cursors that replay the byte order active when the list was read.

use veles_common::{BinaryReader, BinaryWriter, Endianness};

use crate::{Error, Result};

/// Shared state of a list-shaped chunk.
#[derive(Debug, Clone)]
pub struct ListBody {
    /// Offset of the offset table, measured from the chunk start.
    pub data_offset: u32,
    /// Byte offset of each item, measured from the start of the items region.
    pub offset_table: Vec<u32>,
    /// Total length of the items region.
    pub items_len: u32,
    /// Byte order active when the items were read; replayed by accessors.
    pub item_endianness: Endianness,
    /// Raw item payloads.
    pub items: Vec<Vec<u8>>,
}

impl Default for ListBody {
    fn default() -> Self {
        Self {
            data_offset: 0,
            offset_table: Vec::new(),
            items_len: 0,
            item_endianness: Endianness::Big,
            items: Vec::new(),
        }
    }
}

impl ListBody {
    /// Number of items in the list.
    pub fn item_count(&self) -> u16 {
        self.offset_table.len() as u16
    }

    /// Read the `u16` table length and the offsets from `data_offset`.
    pub fn read_offset_table(&mut self, cur: &mut BinaryReader<'_>) -> Result<()> {
        cur.seek(self.data_offset as usize);
        let len = cur.read_u16()?;
        self.offset_table = Vec::with_capacity(len as usize);
        for _ in 0..len {
            self.offset_table.push(cur.read_u32()?);
        }
        Ok(())
    }

    /// Read `items_len` and slice out each item per the offset table.
    ///
    /// Item `i` spans `offset_table[i]..offset_table[i + 1]` (the final item
    /// ends at `items_len`). Offsets that decrease or overrun the items
    /// region are rejected.
    pub fn read_items(&mut self, cur: &mut BinaryReader<'_>) -> Result<()> {
        self.items_len = cur.read_u32()?;
        self.item_endianness = cur.endianness;
        let list_offset = cur.position();

        let n = self.offset_table.len();
        self.items = Vec::with_capacity(n);
        for i in 0..n {
            let offset = self.offset_table[i];
            let next = if i + 1 == n {
                self.items_len
            } else {
                self.offset_table[i + 1]
            };
            if next < offset || next > self.items_len {
                return Err(Error::OffsetTableViolation {
                    index: i,
                    offset: next,
                    items_len: self.items_len,
                });
            }
            cur.seek(list_offset + offset as usize);
            self.items.push(cur.copy_bytes((next - offset) as usize)?);
        }
        Ok(())
    }

    /// Sub-cursor over item `index`, or `None` past the end of the list.
    pub fn reader(&self, index: u16) -> Option<BinaryReader<'_>> {
        self.items
            .get(index as usize)
            .map(|item| BinaryReader::new(item, self.item_endianness))
    }

    /// All bytes of item `index`; empty past the end of the list.
    pub fn bytes(&self, index: u16) -> &[u8] {
        self.items.get(index as usize).map_or(&[], Vec::as_slice)
    }

    /// Item `index` as a raw string (every byte, no prefix or terminator).
    pub fn string(&self, index: u16) -> String {
        self.bytes(index).iter().map(|&b| b as char).collect()
    }

    /// Item `index` as a pascal string; empty items and indices past the end
    /// of the list both decode to the empty string.
    pub fn pascal_string(&self, index: u16) -> Result<String> {
        let Some(mut cur) = self.reader(index) else {
            return Ok(String::new());
        };
        if cur.is_empty() {
            return Ok(String::new());
        }
        Ok(cur.read_pascal_string()?)
    }

    /// Item `index` as a `u16`; zero past the end of the list.
    pub fn u16(&self, index: u16) -> Result<u16> {
        let Some(item) = self.items.get(index as usize) else {
            return Ok(0);
        };
        if item.len() < 2 {
            return Err(Error::ShortItem {
                index,
                len: item.len(),
                needed: 2,
            });
        }
        Ok(BinaryReader::new(item, self.item_endianness).read_u16()?)
    }

    /// Item `index` as a `u32`; zero past the end of the list.
    pub fn u32(&self, index: u16) -> Result<u32> {
        let Some(item) = self.items.get(index as usize) else {
            return Ok(0);
        };
        if item.len() < 4 {
            return Err(Error::ShortItem {
                index,
                len: item.len(),
                needed: 4,
            });
        }
        Ok(BinaryReader::new(item, self.item_endianness).read_u32()?)
    }
}

/// The shared read/write cycle of list-shaped chunks.
///
/// Implementors provide the body and the chunk-specific header; chunks with
/// typed items additionally override [`ListChunk::item_size`] and
/// [`ListChunk::write_item`] so edited values re-serialize instead of the
/// cached bytes.
pub trait ListChunk {
    fn body(&self) -> &ListBody;
    fn body_mut(&mut self) -> &mut ListBody;

    /// Parse the chunk-specific header. Must populate `data_offset`; the
    /// cursor is left just past the header.
    fn read_header(&mut self, cur: &mut BinaryReader<'_>) -> Result<()>;

    /// On-disk size of the header.
    fn header_size(&self) -> usize {
        4
    }

    /// Serialize the header. The default writes `header_size` as the
    /// `data_offset` field, which is all a headerless list carries.
    fn write_header(&self, w: &mut BinaryWriter) {
        w.write_u32(self.header_size() as u32);
    }

    /// On-disk size of item `index` when re-serialized.
    fn item_size(&self, index: u16) -> usize {
        self.body().items.get(index as usize).map_or(0, Vec::len)
    }

    /// Serialize item `index`. The default re-emits the cached bytes.
    fn write_item(&self, w: &mut BinaryWriter, index: u16) {
        if let Some(item) = self.body().items.get(index as usize) {
            w.write_bytes(item);
        }
    }

    /// Header, then offset table, then items.
    fn read_list(&mut self, cur: &mut BinaryReader<'_>) -> Result<()> {
        self.read_header(cur)?;
        self.body_mut().read_offset_table(cur)?;
        self.body_mut().read_items(cur)
    }

    /// Recompute the offset table and `items_len` from current item sizes,
    /// so items may be edited before a write.
    fn update_offsets(&mut self) {
        let n = self.body().offset_table.len();
        let sizes: Vec<u32> = (0..n).map(|i| self.item_size(i as u16) as u32).collect();
        let body = self.body_mut();
        let mut offset = 0u32;
        for (i, size) in sizes.iter().enumerate() {
            body.offset_table[i] = offset;
            offset += size;
        }
        body.items_len = offset;
    }

    /// Total serialized size.
    fn list_size(&mut self) -> usize {
        self.update_offsets();
        let n = self.body().offset_table.len();
        self.header_size() + 2 + 4 * n + 4 + self.body().items_len as usize
    }

    /// Serialize: header, table length, offsets, `items_len`, items.
    fn write_list(&mut self, w: &mut BinaryWriter) {
        self.update_offsets();
        self.write_header(w);
        let n = self.body().item_count();
        w.write_u16(n);
        for i in 0..n as usize {
            w.write_u32(self.body().offset_table[i]);
        }
        w.write_u32(self.body().items_len);
        for i in 0..n {
            self.write_item(w, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A list with no extra header fields, as the substrate sees it.
    #[derive(Default)]
    struct PlainList {
        body: ListBody,
    }

    impl ListChunk for PlainList {
        fn body(&self) -> &ListBody {
            &self.body
        }

        fn body_mut(&mut self) -> &mut ListBody {
            &mut self.body
        }

        fn read_header(&mut self, cur: &mut BinaryReader<'_>) -> Result<()> {
            self.body.data_offset = cur.read_u32()?;
            Ok(())
        }
    }

    fn read_plain(bytes: &[u8]) -> Result<PlainList> {
        let mut list = PlainList::default();
        let mut cur = BinaryReader::new(bytes, Endianness::Big);
        list.read_list(&mut cur)?;
        Ok(list)
    }

    #[test]
    fn test_empty_list_roundtrip() {
        // data_offset = 4, no offsets, no items.
        let bytes = [0, 0, 0, 4, 0, 0, 0, 0, 0, 0];
        let mut list = read_plain(&bytes).unwrap();
        assert_eq!(list.body.item_count(), 0);

        let mut w = BinaryWriter::new(Endianness::Big);
        list.write_list(&mut w);
        assert_eq!(w.into_bytes(), bytes);
    }

    #[test]
    fn test_single_pascal_item_roundtrip() {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u32(4); // data_offset
        w.write_u16(1);
        w.write_u32(0);
        w.write_u32(3); // items_len
        w.write_bytes(&[0x02, b'H', b'i']);
        let bytes = w.into_bytes();

        let mut list = read_plain(&bytes).unwrap();
        assert_eq!(list.body.pascal_string(0).unwrap(), "Hi");

        let mut w = BinaryWriter::new(Endianness::Big);
        list.write_list(&mut w);
        assert_eq!(w.into_bytes(), bytes);
    }

    #[test]
    fn test_accessors_past_end_yield_zero_values() {
        let bytes = [0, 0, 0, 4, 0, 0, 0, 0, 0, 0];
        let list = read_plain(&bytes).unwrap();
        assert_eq!(list.body.u16(0).unwrap(), 0);
        assert_eq!(list.body.u32(0).unwrap(), 0);
        assert_eq!(list.body.string(0), "");
        assert_eq!(list.body.pascal_string(0).unwrap(), "");
    }

    #[test]
    fn test_short_item_rejected() {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u32(4);
        w.write_u16(1);
        w.write_u32(0);
        w.write_u32(1);
        w.write_u8(0xAA);
        let list = read_plain(&w.into_bytes()).unwrap();

        assert!(matches!(
            list.body.u16(0),
            Err(Error::ShortItem { needed: 2, .. })
        ));
    }

    #[test]
    fn test_decreasing_offsets_rejected() {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u32(4);
        w.write_u16(2);
        w.write_u32(4);
        w.write_u32(0); // decreases
        w.write_u32(8);
        w.write_bytes(&[0; 8]);

        match read_plain(&w.into_bytes()) {
            Err(Error::OffsetTableViolation { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected OffsetTableViolation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_offset_past_items_len_rejected() {
        let mut w = BinaryWriter::new(Endianness::Big);
        w.write_u32(4);
        w.write_u16(1);
        w.write_u32(9); // past items_len
        w.write_u32(2);
        w.write_bytes(&[0; 2]);

        assert!(matches!(
            read_plain(&w.into_bytes()),
            Err(Error::OffsetTableViolation { .. })
        ));
    }

    #[test]
    fn test_item_endianness_replayed() {
        let mut w = BinaryWriter::new(Endianness::Little);
        w.write_u32(4);
        w.write_u16(1);
        w.write_u32(0);
        w.write_u32(2);
        w.write_u16(0x0102);
        let bytes = w.into_bytes();

        let mut list = PlainList::default();
        let mut cur = BinaryReader::new(&bytes, Endianness::Little);
        list.read_list(&mut cur).unwrap();
        assert_eq!(list.body.u16(0).unwrap(), 0x0102);
    }
}
