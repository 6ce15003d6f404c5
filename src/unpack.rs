#![forbid(unsafe_code)]

//! Turns scanline bytes into [`Pixel`] values.
//!
//! A scanline here is a row *after* decompression and unfiltering, with the
//! filter byte already gone. The samples are read left to right:
//! * Depths 1, 2, and 4 pack several samples per byte, high bits first (unless
//!   the row format says they were packed low bits first).
//! * Depth 8 is one byte per sample.
//! * Depth 16 is two bytes per sample, big-endian (unless the row format says
//!   little-endian).
//!
//! Each sample is divided by the largest value its significant bits can hold,
//! which puts every channel of the output into `0.0 ..= 1.0`.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::{
  error::ImageError,
  pixel::{bytes_per_row, BitDepth, ColorType, Pixel},
};

/// Describes how the samples of a scanline are stored.
///
/// Plain PNG scanlines are described by [`RowFormat::new`]. The decoder's
/// transforms can change the storage (swapping byte order, channel order, and
/// so on), and when that happens the decoder hands out a row format with the
/// matching flags set so that the unpacker still reads every channel into the
/// right place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowFormat {
  /// The channels stored per pixel.
  pub color_type: ColorType,
  /// The storage bits per sample.
  pub bit_depth: BitDepth,
  /// Significant bits of each channel, in `[r/y, g/a, b, a]` order.
  ///
  /// A sample is normalized by dividing by `2^bits - 1`. Normally this equals
  /// the bit depth, but it's smaller when samples were shifted down to their
  /// `sBIT` values, or when sub-byte samples were spread out one per byte.
  pub significant_bits: [u8; 4],
  /// Sub-byte samples are packed with the leftmost pixel in the low bits.
  pub lsb_first: bool,
  /// 16-bit samples are stored little-endian.
  pub little_endian: bool,
  /// Color samples are stored blue first.
  pub bgr: bool,
  /// The alpha sample comes before the other channels.
  pub alpha_first: bool,
}
impl RowFormat {
  /// The format of a plain PNG scanline.
  #[inline]
  #[must_use]
  pub const fn new(bit_depth: BitDepth, color_type: ColorType) -> Self {
    let b = bit_depth as u8;
    Self {
      color_type,
      bit_depth,
      significant_bits: [b; 4],
      lsb_first: false,
      little_endian: false,
      bgr: false,
      alpha_first: false,
    }
  }

  /// Bytes needed to hold `width` pixels in this format.
  #[inline]
  #[must_use]
  pub const fn bytes_per_row(&self, width: u32) -> usize {
    bytes_per_row(width, self.bit_depth, self.color_type)
  }
}

#[derive(Clone, Copy)]
enum SampleLayout {
  Packed,
  Byte,
  Word,
}

/// Picks the sample reader for a format, or rejects the format.
#[inline]
fn sample_layout(color_type: ColorType, bit_depth: BitDepth) -> Result<SampleLayout, ImageError> {
  use BitDepth::*;
  use ColorType::*;
  Ok(match (color_type, bit_depth) {
    (Gray | Palette, One | Two | Four) => SampleLayout::Packed,
    (Gray | Palette | GrayAlpha | Rgb | RgbAlpha, Eight) => SampleLayout::Byte,
    (Gray | Palette | GrayAlpha | Rgb | RgbAlpha, Sixteen) => SampleLayout::Word,
    (GrayAlpha | Rgb | RgbAlpha, One | Two | Four) => {
      return Err(ImageError::UnsupportedFormat { color_type, bit_depth })
    }
  })
}

/// Reads sample number `i` of the row.
///
/// The caller has already checked that the row is long enough.
#[inline]
fn read_sample(raw: &[u8], i: usize, layout: SampleLayout, format: &RowFormat) -> u16 {
  match layout {
    SampleLayout::Packed => {
      let depth = format.bit_depth as usize;
      let bit_pos = i * depth;
      let byte = raw[bit_pos / 8];
      let shift = if format.lsb_first { bit_pos % 8 } else { 8 - depth - (bit_pos % 8) };
      let mask = (1_u8 << depth) - 1;
      u16::from((byte >> shift) & mask)
    }
    SampleLayout::Byte => u16::from(raw[i]),
    SampleLayout::Word => {
      let pair = [raw[2 * i], raw[2 * i + 1]];
      if format.little_endian {
        u16::from_le_bytes(pair)
      } else {
        u16::from_be_bytes(pair)
      }
    }
  }
}

#[inline]
#[must_use]
fn normalize(v: u16, significant_bits: u8) -> f32 {
  let bits = u32::from(significant_bits.clamp(1, 16));
  let max = ((1_u32 << bits) - 1) as f32;
  (f32::from(v) / max).min(1.0)
}

/// Unpacks a scanline into the `out` slice, one pixel per element.
///
/// The width of the row is `out.len()`.
///
/// ## Failure
/// * [`ImageError::UnsupportedFormat`] if there's no unpacking rule for the
///   color type and bit depth of the format.
/// * [`ImageError::TruncatedRow`] if `raw` has fewer bytes than the width
///   needs. Extra trailing bytes are ignored.
pub fn unpack_row_into(
  raw: &[u8], format: &RowFormat, out: &mut [Pixel],
) -> Result<(), ImageError> {
  let layout = sample_layout(format.color_type, format.bit_depth)?;
  let width = u32::try_from(out.len()).unwrap_or(u32::MAX);
  let needed = format.bytes_per_row(width);
  if raw.len() < needed {
    return Err(ImageError::TruncatedRow { needed, got: raw.len() });
  }

  let channels = format.color_type.channel_count();
  let has_alpha = format.color_type.has_alpha();
  let [s0, s1, s2, s3] = format.significant_bits;
  for (x, p) in out.iter_mut().enumerate() {
    let base = x * channels;
    let mut stored = [0_u16; 4];
    for (c, s) in stored.iter_mut().enumerate().take(channels) {
      *s = read_sample(raw, base + c, layout, format);
    }
    // put the samples into logical order: color channels, then alpha.
    if has_alpha && format.alpha_first {
      stored[..channels].rotate_left(1);
    }
    *p = match format.color_type {
      ColorType::Gray | ColorType::Palette => Pixel::gray(normalize(stored[0], s0)),
      ColorType::GrayAlpha => {
        Pixel::gray_alpha(normalize(stored[0], s0), normalize(stored[1], s1))
      }
      ColorType::Rgb | ColorType::RgbAlpha => {
        let [mut r, g, mut b, a] = stored;
        if format.bgr {
          core::mem::swap(&mut r, &mut b);
        }
        let alpha = if has_alpha { normalize(a, s3) } else { 1.0 };
        Pixel::new(normalize(r, s0), normalize(g, s1), normalize(b, s2), alpha)
      }
    };
  }
  Ok(())
}

/// Reads every sample of the first `width` pixels, in storage order.
///
/// The values are raw, not normalized.
#[cfg(feature = "alloc")]
pub(crate) fn read_samples(
  raw: &[u8], width: u32, format: &RowFormat, out: &mut Vec<u16>,
) -> Result<(), ImageError> {
  let layout = sample_layout(format.color_type, format.bit_depth)?;
  let needed = format.bytes_per_row(width);
  if raw.len() < needed {
    return Err(ImageError::TruncatedRow { needed, got: raw.len() });
  }
  let count = (width as usize) * format.color_type.channel_count();
  out.clear();
  out.extend((0..count).map(|i| read_sample(raw, i, layout, format)));
  Ok(())
}

/// Unpacks a scanline in any [`RowFormat`] into a new vec of `width` pixels.
#[cfg(feature = "alloc")]
pub fn unpack_row_with(
  raw: &[u8], width: u32, format: &RowFormat,
) -> Result<Vec<Pixel>, ImageError> {
  // check before allocating, a bogus width shouldn't make a giant vec.
  sample_layout(format.color_type, format.bit_depth)?;
  let needed = format.bytes_per_row(width);
  if raw.len() < needed {
    return Err(ImageError::TruncatedRow { needed, got: raw.len() });
  }
  let mut out = Vec::new();
  out.resize(width as usize, Pixel::default());
  unpack_row_into(raw, format, &mut out)?;
  Ok(out)
}

/// Unpacks a plain PNG scanline into a new vec of `width` pixels.
///
/// Palette images are unpacked as if they were grayscale: each index becomes
/// a gray level, the palette itself is not consulted. Decode with
/// [`Transforms::EXPAND`](crate::Transforms::EXPAND) to get the real palette
/// colors.
#[cfg(feature = "alloc")]
#[inline]
pub fn unpack_row(
  raw: &[u8], width: u32, bit_depth: BitDepth, color_type: ColorType,
) -> Result<Vec<Pixel>, ImageError> {
  unpack_row_with(raw, width, &RowFormat::new(bit_depth, color_type))
}
