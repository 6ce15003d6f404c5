use crate::{
  error::DecodeError,
  pixel::{bits_per_pixel, bytes_per_row, BitDepth, ColorType},
};

/// Image Header
///
/// These are the values exactly as the file declares them. When the decoder
/// applies transforms the stored rows can end up in a different format, see
/// [`RowFormat`](crate::RowFormat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: BitDepth,
  /// pixel color type
  pub color_type: ColorType,
  /// if the image data is stored interlaced.
  pub is_interlaced: bool,
}
impl Header {
  /// Bits per pixel of the stored data.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    bits_per_pixel(self.bit_depth, self.color_type)
  }

  /// Bytes per scanline, not counting the filter byte.
  #[inline]
  #[must_use]
  pub const fn bytes_per_scanline(&self) -> usize {
    bytes_per_row(self.width, self.bit_depth, self.color_type)
  }

  /// How many bytes the unfilter step works on at a time.
  ///
  /// That's bytes per pixel, but never less than 1.
  #[inline]
  #[must_use]
  pub const fn filter_chunk_size(&self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// Gets the buffer size required to perform Zlib decompression.
  ///
  /// Each line is a filter byte plus the scanline.
  #[inline]
  pub fn zlib_decompression_requirement(&self) -> Result<usize, DecodeError> {
    self
      .bytes_per_scanline()
      .checked_add(1)
      .and_then(|line| line.checked_mul(self.height as usize))
      .ok_or(DecodeError::CheckedMath)
  }
}
impl TryFrom<&[u8]> for Header {
  type Error = DecodeError;
  fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
    match value {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        let width = u32::from_be_bytes([*w0, *w1, *w2, *w3]);
        let height = u32::from_be_bytes([*h0, *h1, *h2, *h3]);
        if width == 0 || height == 0 {
          return Err(DecodeError::WidthOrHeightZero);
        }
        let color_type =
          ColorType::try_from(*color_type).map_err(|_| DecodeError::IllegalHeader)?;
        let bit_depth = BitDepth::try_from(*bit_depth).map_err(|_| DecodeError::IllegalHeader)?;
        if !bit_depth.is_valid_for(color_type) {
          return Err(DecodeError::IllegalHeader);
        }
        if *compression_method != 0 || *filter_method != 0 {
          return Err(DecodeError::IllegalHeader);
        }
        let is_interlaced = match interlace_method {
          0 => false,
          1 => true,
          _ => return Err(DecodeError::IllegalHeader),
        };
        Ok(Self { width, height, bit_depth, color_type, is_interlaced })
      }
      _ => Err(DecodeError::IllegalHeader),
    }
  }
}
