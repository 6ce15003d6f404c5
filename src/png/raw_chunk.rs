use core::fmt::{Debug, Write};

use super::crc32::Crc32;

/// The four type bytes of a chunk.
///
/// Bit 5 of each byte is a property flag (lowercase letter means "set"). The
/// only one that a decoder has to care about is the first: critical chunks
/// (uppercase first letter) can't be skipped if they aren't understood.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style, missing_docs)]
impl ChunkType {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const sBIT: Self = Self(*b"sBIT");

  /// If the chunk is needed to display the image correctly.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0b0010_0000) == 0
  }

  /// The type bytes as text, or `"????"` if they aren't UTF-8.
  #[inline]
  #[must_use]
  pub fn as_str(&self) -> &str {
    core::str::from_utf8(&self.0).unwrap_or("????")
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char(self.0[0] as char)?;
    f.write_char(self.0[1] as char)?;
    f.write_char(self.0[2] as char)?;
    f.write_char(self.0[3] as char)?;
    Ok(())
  }
}

/// An unparsed chunk from a PNG.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawChunk<'b> {
  /// Chunk type
  pub chunk_type: ChunkType,
  /// Chunk data, not including the length, type, or CRC.
  pub data: &'b [u8],
  /// The CRC that the data stream claims this chunk has.
  pub declared_crc: u32,
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("chunk_type", &self.chunk_type)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}
impl RawChunk<'_> {
  /// Computes the CRC of the type and data bytes.
  #[inline]
  #[must_use]
  pub fn compute_crc(&self) -> u32 {
    chunk_crc(self.chunk_type, self.data)
  }

  /// If the computed CRC matches the declared one.
  #[inline]
  #[must_use]
  pub fn crc_is_correct(&self) -> bool {
    self.compute_crc() == self.declared_crc
  }
}

/// Computes the CRC of a chunk from its parts.
#[inline]
#[must_use]
pub fn chunk_crc(chunk_type: ChunkType, data: &[u8]) -> u32 {
  let mut crc = Crc32::new();
  crc.update(&chunk_type.0);
  crc.update(data);
  crc.finish()
}

/// An iterator that produces successive raw chunks from PNG bytes.
///
/// This works with the full PNG in memory. It doesn't check the signature or
/// any CRC values, and stops at the first chunk that's cut off by the end of
/// the data. Any input at all is fine, it will never panic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RawChunkIter<'b>(&'b [u8]);
impl<'b> RawChunkIter<'b> {
  /// Pass the full PNG bytes, it will remove the PNG signature automatically.
  #[inline]
  pub const fn new(bytes: &'b [u8]) -> Self {
    match bytes {
      [_, _, _, _, _, _, _, _, rest @ ..] => Self(rest),
      _ => Self(&[]),
    }
  }
}
impl<'b> Iterator for RawChunkIter<'b> {
  type Item = RawChunk<'b>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let (len_bytes, rest) = match self.0 {
      [a, b, c, d, rest @ ..] => ([*a, *b, *c, *d], rest),
      _ => {
        self.0 = &[];
        return None;
      }
    };
    let chunk_len = u32::from_be_bytes(len_bytes) as usize;
    let (chunk_type, rest) = match rest {
      [a, b, c, d, rest @ ..] => (ChunkType([*a, *b, *c, *d]), rest),
      _ => {
        self.0 = &[];
        return None;
      }
    };
    if rest.len() < chunk_len {
      self.0 = &[];
      return None;
    }
    let (data, rest) = rest.split_at(chunk_len);
    let (declared_crc, rest) = match rest {
      [a, b, c, d, rest @ ..] => (u32::from_be_bytes([*a, *b, *c, *d]), rest),
      _ => {
        self.0 = &[];
        return None;
      }
    };
    self.0 = rest;
    Some(RawChunk { chunk_type, data, declared_crc })
  }
}

#[cfg(feature = "alloc")]
#[test]
fn test_raw_chunk_iter_stops_on_short_data() {
  let mut png = super::PNG_SIGNATURE.to_vec();
  png.extend_from_slice(&[0, 0, 0, 0]);
  png.extend_from_slice(b"IEND");
  png.extend_from_slice(&0xAE42_6082_u32.to_be_bytes());
  let chunks: alloc::vec::Vec<_> = RawChunkIter::new(&png).collect();
  assert_eq!(chunks.len(), 1);
  assert_eq!(chunks[0].chunk_type, ChunkType::IEND);
  assert!(chunks[0].crc_is_correct());
  assert!(chunks[0].chunk_type.is_critical());
  // cut off in the middle of the CRC
  assert_eq!(RawChunkIter::new(&png[..png.len() - 1]).count(), 0);
  assert_eq!(RawChunkIter::new(&[]).count(), 0);
}
