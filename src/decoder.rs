//! Decoder configuration.

use alloc::vec::Vec;
use std::io::{Read, Seek, SeekFrom};

use crate::{
  error::ImageError,
  png::is_png,
  transform::Transforms,
  warning::{warning_sink, WarningSink},
};

/// Settings for one decode.
///
/// ```
/// # use pngpixels::*;
/// let opts = DecodeOptions { transforms: Transforms::EXPAND, ..Default::default() };
/// assert!(opts.verify_crc);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
  /// Transforms applied to every row.
  pub transforms: Transforms,

  /// Where warnings go. `None` uses the process-wide default sink (see
  /// [`set_warning_sink`](crate::set_warning_sink)).
  pub warning_sink: Option<WarningSink>,

  /// Images wider than this fail with
  /// [`DecodeError::DimensionsTooLarge`](crate::DecodeError::DimensionsTooLarge).
  pub max_width: u32,

  /// Images taller than this fail with
  /// [`DecodeError::DimensionsTooLarge`](crate::DecodeError::DimensionsTooLarge).
  pub max_height: u32,

  /// Check chunk CRCs and the Zlib checksum.
  ///
  /// With this off, corrupted data goes unnoticed until it breaks the
  /// structure of the stream.
  pub verify_crc: bool,
}
impl DecodeOptions {
  /// The default limit for both width and height.
  pub const DEFAULT_MAX_DIMENSION: u32 = 1 << 14;

  /// The sink this decode will send warnings to.
  #[inline]
  #[must_use]
  pub fn sink(&self) -> WarningSink {
    self.warning_sink.unwrap_or_else(warning_sink)
  }
}
impl Default for DecodeOptions {
  #[inline]
  fn default() -> Self {
    Self {
      transforms: Transforms::IDENTITY,
      warning_sink: None,
      max_width: Self::DEFAULT_MAX_DIMENSION,
      max_height: Self::DEFAULT_MAX_DIMENSION,
      verify_crc: true,
    }
  }
}
impl From<Transforms> for DecodeOptions {
  #[inline]
  fn from(transforms: Transforms) -> Self {
    Self { transforms, ..Self::default() }
  }
}

/// Checks if a stream starts with the PNG signature.
///
/// Up to 8 bytes are read, then the stream is put back where it was. Streams
/// shorter than 8 bytes aren't PNG.
///
/// ## Failure
/// * Any error from reading or seeking. The position is restored even when
///   the read fails (unless the seek fails too).
pub fn is_png_stream<R: Read + Seek>(reader: &mut R) -> Result<bool, ImageError> {
  let start = reader.stream_position()?;
  let mut signature = Vec::with_capacity(8);
  let read = reader.by_ref().take(8).read_to_end(&mut signature);
  reader.seek(SeekFrom::Start(start))?;
  read?;
  Ok(is_png(&signature))
}
