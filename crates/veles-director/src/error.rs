//! Error types for movie decoding.

use thiserror::Error;
use veles_common::FourCC;

/// Errors that can occur while decoding or re-encoding a movie.
#[derive(Debug, Error)]
pub enum Error {
    /// Cursor-level error (short reads and the like).
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with a recognized container signature.
    #[error("not a movie container: bad signature")]
    InvalidMagic,

    /// The container codec is not one this crate decodes.
    #[error("unsupported codec {0}")]
    UnsupportedCodec(FourCC),

    /// A `(fourcc, section id)` pair required by the load is absent.
    #[error("no {fourcc} chunk at section {section_id}")]
    UnresolvedReference { fourcc: FourCC, section_id: i32 },

    /// A chunk faulted itself in while already being materialized.
    #[error("cyclic reference while materializing {fourcc} at section {section_id}")]
    CyclicReference { fourcc: FourCC, section_id: i32 },

    /// A memory-map section carries a fourcc the decoder has no type for.
    #[error("no decoder for {fourcc} chunks (section {section_id})")]
    UnknownChunkType { fourcc: FourCC, section_id: i32 },

    /// A memory-map entry disagrees with the chunk header it points at.
    #[error("memory map entry for {fourcc} at section {section_id} does not match the chunk header")]
    MapMismatch { fourcc: FourCC, section_id: i32 },

    /// A list chunk's offset table is not non-decreasing or runs past the
    /// items region.
    #[error("offset table entry {index} ({offset}) violates items region of {items_len} bytes")]
    OffsetTableViolation {
        index: usize,
        offset: u32,
        items_len: u32,
    },

    /// A typed accessor was applied to a list item shorter than the type.
    #[error("list item {index} is {len} bytes, too short for a {needed}-byte value")]
    ShortItem {
        index: u16,
        len: usize,
        needed: usize,
    },
}

/// Result type for movie decoding operations.
pub type Result<T> = std::result::Result<T, Error>;
