use core::fmt;

use crate::pixel::{BitDepth, ColorType};

/// An error from the `pngpixels` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
  /// The first 8 bytes of the data aren't the PNG signature.
  NotAPng,

  /// The decoder found a problem it can't recover from.
  Decode(DecodeError),

  /// The byte source ran out before the `IEND` chunk was reached.
  TruncatedInput,

  /// Reading the byte source failed for a reason other than running out.
  #[cfg(feature = "std")]
  Io(std::io::ErrorKind),

  /// The unpacker has no rule for this pairing of color type and depth.
  UnsupportedFormat {
    #[allow(missing_docs)]
    color_type: ColorType,
    #[allow(missing_docs)]
    bit_depth: BitDepth,
  },

  /// A pixel or row position outside of the image was requested.
  IndexOutOfRange {
    #[allow(missing_docs)]
    x: u32,
    #[allow(missing_docs)]
    y: u32,
  },

  /// A scanline had fewer bytes than its width requires.
  TruncatedRow {
    /// bytes required for the full width
    needed: usize,
    /// bytes actually given
    got: usize,
  },
}
impl From<DecodeError> for ImageError {
  #[inline]
  fn from(e: DecodeError) -> Self {
    Self::Decode(e)
  }
}
#[cfg(feature = "std")]
impl From<std::io::Error> for ImageError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    match e.kind() {
      std::io::ErrorKind::UnexpectedEof => Self::TruncatedInput,
      kind => Self::Io(kind),
    }
  }
}
impl fmt::Display for ImageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotAPng => f.write_str("not a png: bad signature"),
      Self::Decode(e) => write!(f, "png decode failed: {e}"),
      Self::TruncatedInput => f.write_str("png data ended early"),
      #[cfg(feature = "std")]
      Self::Io(kind) => write!(f, "reading png data failed: {kind}"),
      Self::UnsupportedFormat { color_type, bit_depth } => {
        write!(f, "can't unpack {color_type} pixels at bit depth {bit_depth}")
      }
      Self::IndexOutOfRange { x, y } => write!(f, "position ({x}, {y}) is outside the image"),
      Self::TruncatedRow { needed, got } => {
        write!(f, "scanline needs {needed} bytes but only has {got}")
      }
    }
  }
}
#[cfg(feature = "std")]
impl std::error::Error for ImageError {}

/// The fatal problems that the decode engine can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
  /// The first chunk wasn't an `IHDR`.
  FirstChunkNotIHDR,

  /// The `IHDR` had the wrong length or an illegal field value.
  IllegalHeader,

  /// The declared width and/or height of this image is 0.
  WidthOrHeightZero,

  /// The image is larger than the configured limits.
  DimensionsTooLarge,

  /// Adam7 interlaced images aren't supported.
  Interlaced,

  /// A chunk declared a length above `2^31 - 1`.
  ChunkTooLong,

  /// A critical chunk failed its CRC check.
  CriticalChunkCrc([u8; 4]),

  /// A critical chunk type that the decoder doesn't know.
  UnknownCriticalChunk([u8; 4]),

  /// A palette image with no `PLTE`, or a `PLTE` with a bad length.
  BadPalette,

  /// No `IDAT` chunks before `IEND`.
  NoImageData,

  /// The Zlib stream of the image data couldn't be inflated.
  Inflate,

  /// The Zlib stream ended before all scanlines were filled.
  NotEnoughImageData,

  /// A scanline started with a filter type other than 0 through 4.
  IllegalFilterType(u8),

  /// The buffer for the image data couldn't be allocated.
  AllocationFailed,

  /// A checked math operation failed.
  CheckedMath,
}
impl fmt::Display for DecodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fn ty(t: &[u8; 4]) -> &str {
      core::str::from_utf8(t).unwrap_or("????")
    }
    match self {
      Self::FirstChunkNotIHDR => f.write_str("first chunk is not IHDR"),
      Self::IllegalHeader => f.write_str("illegal IHDR"),
      Self::WidthOrHeightZero => f.write_str("width or height is zero"),
      Self::DimensionsTooLarge => f.write_str("image dimensions exceed the limits"),
      Self::Interlaced => f.write_str("interlaced images are not supported"),
      Self::ChunkTooLong => f.write_str("chunk length exceeds 2^31 - 1"),
      Self::CriticalChunkCrc(t) => write!(f, "CRC mismatch in critical chunk {}", ty(t)),
      Self::UnknownCriticalChunk(t) => write!(f, "unknown critical chunk {}", ty(t)),
      Self::BadPalette => f.write_str("missing or malformed PLTE"),
      Self::NoImageData => f.write_str("no IDAT chunks"),
      Self::Inflate => f.write_str("corrupt zlib stream"),
      Self::NotEnoughImageData => f.write_str("not enough image data"),
      Self::IllegalFilterType(t) => write!(f, "illegal filter type {t}"),
      Self::AllocationFailed => f.write_str("couldn't allocate the image buffer"),
      Self::CheckedMath => f.write_str("size computation overflowed"),
    }
  }
}
#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}
