#![forbid(unsafe_code)]

//! The decoded image type.

use alloc::{boxed::Box, vec::Vec};
use core::{
  fmt,
  iter::FusedIterator,
  sync::atomic::{AtomicUsize, Ordering},
};
use std::sync::OnceLock;

#[cfg(feature = "miniz_oxide")]
use std::io::Read;

#[cfg(feature = "miniz_oxide")]
use alloc::format;

#[cfg(feature = "miniz_oxide")]
use crate::{decoder::DecodeOptions, engine};
use crate::{
  error::{DecodeError, ImageError},
  pixel::{BitDepth, ColorType, Pixel},
  png::Header,
  unpack::{unpack_row_with, RowFormat},
  warning::DecodeId,
};

/// A decoded image.
///
/// The whole PNG is decoded when the image is made, leaving one stored row of
/// bytes per scanline. Those rows are only unpacked into [`Pixel`] values
/// when they're first accessed, and then the pixels are kept for as long as
/// the image lives.
///
/// The image is `Send + Sync`. If two threads access a row for the first time
/// together then both might unpack it, but only one result is kept and the
/// results are the same anyway.
pub struct Image {
  id: DecodeId,
  header: Header,
  row_format: RowFormat,
  palette: Vec<[u8; 3]>,
  rows: Vec<Box<[u8]>>,
  cache: Vec<OnceLock<Box<[Pixel]>>>,
  unpack_calls: AtomicUsize,
}
impl fmt::Debug for Image {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Image")
      .field("id", &self.id)
      .field("header", &self.header)
      .field("row_format", &self.row_format)
      .field("palette_len", &self.palette.len())
      .field("cached_rows", &self.cache.iter().filter(|c| c.get().is_some()).count())
      .finish()
  }
}

impl Image {
  fn from_parts(
    id: DecodeId, header: Header, row_format: RowFormat, palette: Vec<[u8; 3]>,
    rows: Vec<Box<[u8]>>,
  ) -> Self {
    let cache = rows.iter().map(|_| OnceLock::new()).collect();
    Self { id, header, row_format, palette, rows, cache, unpack_calls: AtomicUsize::new(0) }
  }

  /// Makes an image from scanlines that are already decompressed and
  /// unfiltered (no filter bytes).
  ///
  /// Rows longer than the width needs are cut down to size.
  ///
  /// ## Failure
  /// * [`DecodeError::WidthOrHeightZero`] for an empty image.
  /// * [`ImageError::UnsupportedFormat`] if the format can't be unpacked.
  /// * [`DecodeError::NotEnoughImageData`] if there aren't `height` rows.
  /// * [`ImageError::TruncatedRow`] if any row is too short.
  pub fn from_scanlines<I, B>(
    width: u32, height: u32, row_format: RowFormat, scanlines: I,
  ) -> Result<Self, ImageError>
  where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
  {
    if width == 0 || height == 0 {
      return Err(DecodeError::WidthOrHeightZero.into());
    }
    // a zero width row checks the format without needing any bytes.
    unpack_row_with(&[], 0, &row_format)?;
    let needed = row_format.bytes_per_row(width);
    let mut rows = Vec::with_capacity(height as usize);
    for line in scanlines.into_iter().take(height as usize) {
      let line = line.as_ref();
      if line.len() < needed {
        return Err(ImageError::TruncatedRow { needed, got: line.len() });
      }
      rows.push(Box::from(&line[..needed]));
    }
    if rows.len() != height as usize {
      return Err(DecodeError::NotEnoughImageData.into());
    }
    let header = Header {
      width,
      height,
      bit_depth: row_format.bit_depth,
      color_type: row_format.color_type,
      is_interlaced: false,
    };
    Ok(Self::from_parts(DecodeId::next(), header, row_format, Vec::new(), rows))
  }

  /// Decodes a PNG from the reader with the default options.
  ///
  /// ```no_run
  /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
  /// let file = std::fs::File::open("picture.png")?;
  /// let image = pngpixels::Image::decode(std::io::BufReader::new(file))?;
  /// let top_left = image.pixel_at(0, 0)?;
  /// # Ok(())
  /// # }
  /// ```
  #[cfg(feature = "miniz_oxide")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
  #[inline]
  pub fn decode<R: Read>(reader: R) -> Result<Self, ImageError> {
    Self::decode_with(reader, DecodeOptions::default())
  }

  /// Decodes a PNG from the reader.
  ///
  /// The reader is read up to the end of the `IEND` chunk and no further. The
  /// signature is the first thing read, so a non-PNG source fails with
  /// [`ImageError::NotAPng`] after only 8 bytes.
  ///
  /// ## Failure
  /// * [`ImageError::NotAPng`]
  /// * [`ImageError::TruncatedInput`] if the reader runs out before `IEND`.
  /// * [`ImageError::Io`] for other read errors.
  /// * [`ImageError::Decode`] for anything wrong with the PNG data.
  #[cfg(feature = "miniz_oxide")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
  pub fn decode_with<R: Read>(reader: R, options: DecodeOptions) -> Result<Self, ImageError> {
    let d = engine::decode(reader, &options)?;
    Ok(Self::from_parts(d.id, d.header, d.row_format, d.palette, d.rows))
  }

  /// Decodes PNG bytes that are already in memory, with the default options.
  #[cfg(feature = "miniz_oxide")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
  #[inline]
  pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
    Self::from_png_bytes_with(bytes, DecodeOptions::default())
  }

  /// Decodes PNG bytes that are already in memory.
  ///
  /// Bytes after the `IEND` chunk cause a warning.
  #[cfg(feature = "miniz_oxide")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
  pub fn from_png_bytes_with(bytes: &[u8], options: DecodeOptions) -> Result<Self, ImageError> {
    let mut rest = bytes;
    let d = engine::decode(&mut rest, &options)?;
    if !rest.is_empty() {
      (d.sink)(&format!("{} bytes after IEND were not read", rest.len()), d.id);
    }
    Ok(Self::from_parts(d.id, d.header, d.row_format, d.palette, d.rows))
  }

  /// Width in pixels.
  #[inline]
  #[must_use]
  pub fn width(&self) -> u32 {
    self.header.width
  }

  /// Height in pixels.
  #[inline]
  #[must_use]
  pub fn height(&self) -> u32 {
    self.header.height
  }

  /// Bit depth of the stored rows.
  ///
  /// This is after any transforms, see [`header`](Self::header) for the
  /// depth the PNG declared.
  #[inline]
  #[must_use]
  pub fn bit_depth(&self) -> BitDepth {
    self.row_format.bit_depth
  }

  /// Color type of the stored rows.
  ///
  /// This is after any transforms, see [`header`](Self::header) for the
  /// color type the PNG declared.
  #[inline]
  #[must_use]
  pub fn color_type(&self) -> ColorType {
    self.row_format.color_type
  }

  /// Bits per pixel of the stored rows.
  #[inline]
  #[must_use]
  pub fn bits_per_pixel(&self) -> usize {
    crate::pixel::bits_per_pixel(self.bit_depth(), self.color_type())
  }

  /// Bytes in each stored row.
  #[inline]
  #[must_use]
  pub fn bytes_per_row(&self) -> usize {
    self.row_format.bytes_per_row(self.width())
  }

  /// The header values as the PNG declared them.
  #[inline]
  #[must_use]
  pub fn header(&self) -> &Header {
    &self.header
  }

  /// How the stored rows are laid out.
  #[inline]
  #[must_use]
  pub fn row_format(&self) -> &RowFormat {
    &self.row_format
  }

  /// The `PLTE` entries, if the PNG had any.
  #[inline]
  #[must_use]
  pub fn palette(&self) -> Option<&[[u8; 3]]> {
    if self.palette.is_empty() {
      None
    } else {
      Some(&self.palette)
    }
  }

  /// The id that this image's decode warnings were tagged with.
  #[inline]
  #[must_use]
  pub fn decode_id(&self) -> DecodeId {
    self.id
  }

  /// The stored bytes of row `y`, exactly [`bytes_per_row`](Self::bytes_per_row)
  /// long.
  #[inline]
  pub fn raw_row(&self, y: u32) -> Result<&[u8], ImageError> {
    self.rows.get(y as usize).map(|r| &r[..]).ok_or(ImageError::IndexOutOfRange { x: 0, y })
  }

  /// If row `y` has been unpacked already.
  #[inline]
  #[must_use]
  pub fn is_row_cached(&self, y: u32) -> bool {
    self.cache.get(y as usize).map_or(false, |c| c.get().is_some())
  }

  /// How many times a row has actually been unpacked.
  #[doc(hidden)]
  #[inline]
  #[must_use]
  pub fn unpack_count(&self) -> usize {
    self.unpack_calls.load(Ordering::Relaxed)
  }

  /// The pixels of row `y`, unpacking it if this is the first access.
  ///
  /// ## Failure
  /// * [`ImageError::IndexOutOfRange`] if `y` is not less than the height.
  pub fn row_at(&self, y: u32) -> Result<&[Pixel], ImageError> {
    let oob = ImageError::IndexOutOfRange { x: 0, y };
    let slot = self.cache.get(y as usize).ok_or(oob)?;
    if let Some(row) = slot.get() {
      return Ok(&row[..]);
    }
    let raw = self.rows.get(y as usize).ok_or(oob)?;
    // an error returns before touching the slot, so it stays empty.
    let row = unpack_row_with(raw, self.width(), &self.row_format)?;
    self.unpack_calls.fetch_add(1, Ordering::Relaxed);
    Ok(&slot.get_or_init(|| row.into_boxed_slice())[..])
  }

  /// The pixel at `(x, y)`.
  ///
  /// ## Failure
  /// * [`ImageError::IndexOutOfRange`] if `x` or `y` is outside the image.
  #[inline]
  pub fn pixel_at(&self, x: u32, y: u32) -> Result<Pixel, ImageError> {
    if x >= self.width() || y >= self.height() {
      return Err(ImageError::IndexOutOfRange { x, y });
    }
    self.row_at(y)?.get(x as usize).copied().ok_or(ImageError::IndexOutOfRange { x, y })
  }

  /// Iterates over all the rows, top to bottom.
  #[inline]
  #[must_use]
  pub fn rows(&self) -> Rows<'_> {
    Rows { image: self, next: 0 }
  }
}

/// Iterator over the rows of an [`Image`], see [`Image::rows`].
///
/// It only goes forward. Call [`Image::rows`] again to start over, a
/// half-used iterator can't be copied:
///
/// ```compile_fail
/// # use pngpixels::{BitDepth, ColorType, Image, RowFormat};
/// fn copy<T: Clone>(_: T) {}
/// let format = RowFormat::new(BitDepth::Eight, ColorType::Gray);
/// let image = Image::from_scanlines(1, 2, format, [[0_u8], [1]]).unwrap();
/// let mut rows = image.rows();
/// rows.next();
/// copy(rows);
/// ```
#[derive(Debug)]
pub struct Rows<'i> {
  image: &'i Image,
  next: u32,
}
impl<'i> Iterator for Rows<'i> {
  type Item = Result<&'i [Pixel], ImageError>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    if self.next >= self.image.height() {
      return None;
    }
    let y = self.next;
    self.next += 1;
    Some(self.image.row_at(y))
  }
  #[inline]
  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = self.image.height().saturating_sub(self.next) as usize;
    (left, Some(left))
  }
}
impl ExactSizeIterator for Rows<'_> {}
impl FusedIterator for Rows<'_> {}
