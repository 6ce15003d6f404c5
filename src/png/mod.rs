#![forbid(unsafe_code)]

//! PNG container parsing.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! A PNG data stream is an 8 byte signature followed by "chunks". Each chunk
//! is a 4 byte big-endian length, a 4 byte type, the data, and a 4 byte CRC of
//! the type and data. There's four "critical" chunk types:
//! * **Header** (`IHDR`) - dimensions, pixel format, and interlacing. It must
//!   be the very first chunk.
//! * **Palette** (`PLTE`) - the `RGB8` entries that indexed color refers to.
//! * **Image Data** (`IDAT`) - one or more chunks that together form a single
//!   Zlib data stream of filtered scanlines.
//! * **End** (`IEND`) - the last chunk, lets you know you had the full PNG and
//!   your data wasn't truncated accidentally.
//!
//! Between those there are "ancillary" chunks. The decoder uses transparency
//! (`tRNS`) and significant bits (`sBIT`), and skips the rest.
//!
//! The types here work on PNG data that is already in memory and never panic
//! on bad input. The decoder itself pulls chunks from a reader, see
//! [`Image::decode`](crate::Image::decode).

mod crc32;
pub use crc32::*;

mod raw_chunk;
pub use raw_chunk::*;

mod ihdr;
pub use ihdr::*;

mod plte;
pub use plte::*;

mod trns;
pub use trns::*;

mod sbit;
pub use sbit::*;

mod unfilter;
pub use unfilter::*;

/// The first eight bytes of a PNG datastream should match these bytes.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the PNG's initial 8 bytes are correct.
///
/// * If this is the case, the rest of the bytes are very likely PNG data.
/// * If this is *not* the case, the rest of the bytes are very likely *not* PNG
///   data.
///
/// Nothing past the first 8 bytes is looked at.
#[inline]
#[must_use]
pub const fn is_png(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}

/// Gets the [`Header`] out of in-memory PNG bytes.
///
/// This is the first `IHDR` chunk that parses, wherever it is.
#[inline]
pub fn png_get_header(bytes: &[u8]) -> Option<Header> {
  chunks_of_type(bytes, ChunkType::IHDR).find_map(|data| Header::try_from(data).ok())
}

/// Gets the palette out of in-memory PNG bytes.
#[inline]
pub fn png_get_palette(bytes: &[u8]) -> Option<PLTE<'_>> {
  chunks_of_type(bytes, ChunkType::PLTE).find_map(|data| PLTE::try_from(data).ok())
}

/// Gets an iterator over all the `IDAT` slices in the PNG bytes.
#[inline]
pub fn png_get_idat(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
  chunks_of_type(bytes, ChunkType::IDAT)
}

#[inline]
fn chunks_of_type(bytes: &[u8], chunk_type: ChunkType) -> impl Iterator<Item = &[u8]> {
  RawChunkIter::new(bytes).filter(move |c| c.chunk_type == chunk_type).map(|c| c.data)
}
