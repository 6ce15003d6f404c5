//! Transforms that the decoder can apply to each scanline.
//!
//! Transforms come in two kinds:
//! * **Value** transforms change what the samples mean: [`EXPAND`],
//!   [`STRIP_16`], [`STRIP_ALPHA`], [`INVERT_MONO`], [`SHIFT`], and
//!   [`INVERT_ALPHA`]. Their effect is visible in the unpacked pixels.
//! * **Layout** transforms only change how the samples are stored: [`PACKING`],
//!   [`PACKSWAP`], [`BGR`], [`SWAP_ALPHA`], and [`SWAP_ENDIAN`]. The decoder
//!   records them in the image's [`RowFormat`] and the unpacker reads through
//!   them, so they change the raw row bytes but not the pixels.
//!
//! [`EXPAND`]: Transforms::EXPAND
//! [`STRIP_16`]: Transforms::STRIP_16
//! [`STRIP_ALPHA`]: Transforms::STRIP_ALPHA
//! [`INVERT_MONO`]: Transforms::INVERT_MONO
//! [`SHIFT`]: Transforms::SHIFT
//! [`INVERT_ALPHA`]: Transforms::INVERT_ALPHA
//! [`PACKING`]: Transforms::PACKING
//! [`PACKSWAP`]: Transforms::PACKSWAP
//! [`BGR`]: Transforms::BGR
//! [`SWAP_ALPHA`]: Transforms::SWAP_ALPHA
//! [`SWAP_ENDIAN`]: Transforms::SWAP_ENDIAN

use core::ops::{BitAnd, BitOr, BitOrAssign};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

#[cfg(feature = "alloc")]
use bitfrob::u8_replicate_bits;

#[cfg(feature = "alloc")]
use crate::{
  error::ImageError,
  pixel::{BitDepth, ColorType},
  unpack::{read_samples, RowFormat},
};

/// A set of decode transforms.
///
/// The bit values are the same as libpng's `PNG_TRANSFORM_*` values, so a
/// mask from code that talks to libpng can be passed through with
/// [`from_bits_truncate`](Self::from_bits_truncate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Transforms(u32);
impl Transforms {
  /// No transforms, rows are stored exactly as the PNG has them.
  pub const IDENTITY: Self = Self(0x0000);
  /// 16-bit samples become 8-bit by keeping the high byte.
  pub const STRIP_16: Self = Self(0x0001);
  /// The alpha channel is removed.
  pub const STRIP_ALPHA: Self = Self(0x0002);
  /// Samples less than 8 bits are stored one per byte, without scaling.
  pub const PACKING: Self = Self(0x0004);
  /// Samples less than 8 bits are packed with the leftmost in the low bits.
  pub const PACKSWAP: Self = Self(0x0008);
  /// Palette images become RGB (RGBA with a `tRNS` chunk), gray images less
  /// than 8 bits become 8-bit, and a `tRNS` key color becomes an alpha
  /// channel.
  pub const EXPAND: Self = Self(0x0010);
  /// Gray samples are inverted so that 0 is white.
  pub const INVERT_MONO: Self = Self(0x0020);
  /// Samples are shifted down to their `sBIT` significant bits.
  pub const SHIFT: Self = Self(0x0040);
  /// RGB is stored as BGR.
  pub const BGR: Self = Self(0x0080);
  /// Alpha is stored before the color channels.
  pub const SWAP_ALPHA: Self = Self(0x0100);
  /// 16-bit samples are stored little-endian.
  pub const SWAP_ENDIAN: Self = Self(0x0200);
  /// Alpha is inverted so that 0 is opaque.
  pub const INVERT_ALPHA: Self = Self(0x0400);
  /// Filler bytes are stripped. Decoded rows never have filler, so this has
  /// no effect, but it's accepted.
  pub const STRIP_FILLER: Self = Self(0x0800);

  const ALL: u32 = 0x0FFF;

  /// The raw bits.
  #[inline]
  #[must_use]
  pub const fn bits(self) -> u32 {
    self.0
  }

  /// Makes a set from raw bits, dropping any unknown bits.
  #[inline]
  #[must_use]
  pub const fn from_bits_truncate(bits: u32) -> Self {
    Self(bits & Self::ALL)
  }

  /// If every transform in `other` is also in `self`.
  #[inline]
  #[must_use]
  pub const fn contains(self, other: Self) -> bool {
    (self.0 & other.0) == other.0
  }

  /// If no transform at all is requested.
  #[inline]
  #[must_use]
  pub const fn is_identity(self) -> bool {
    self.0 == 0
  }
}
impl BitOr for Transforms {
  type Output = Self;
  #[inline]
  fn bitor(self, rhs: Self) -> Self::Output {
    Self(self.0 | rhs.0)
  }
}
impl BitOrAssign for Transforms {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    self.0 |= rhs.0;
  }
}
impl BitAnd for Transforms {
  type Output = Self;
  #[inline]
  fn bitand(self, rhs: Self) -> Self::Output {
    Self(self.0 & rhs.0)
  }
}

/// Working state while a row moves through the transforms.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy)]
struct RowState {
  color_type: ColorType,
  depth: u8,
  /// normalization bits per logical channel
  norm_bits: [u8; 4],
  /// `sBIT` values per logical channel, if known
  sbit: Option<[u8; 4]>,
}
#[cfg(feature = "alloc")]
impl RowState {
  #[inline]
  fn channels(&self) -> usize {
    self.color_type.channel_count()
  }
  #[inline]
  fn depth_max(&self) -> u16 {
    match self.depth {
      16 => u16::MAX,
      d => (1_u16 << d) - 1,
    }
  }
}

/// The ancillary data that transforms can need.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TransformInputs<'a> {
  pub palette: Option<&'a [[u8; 3]]>,
  pub palette_alphas: Option<&'a [u8]>,
  pub trns_key: Option<([u16; 3], usize)>,
  pub sbit: Option<[u8; 4]>,
}

/// Applies a fixed set of transforms to rows of one format.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone)]
pub(crate) struct RowTransformer<'a> {
  transforms: Transforms,
  source: RowFormat,
  inputs: TransformInputs<'a>,
  output: RowFormat,
}
#[cfg(feature = "alloc")]
impl<'a> RowTransformer<'a> {
  pub fn new(transforms: Transforms, source: RowFormat, inputs: TransformInputs<'a>) -> Self {
    let mut out = Self { transforms, source, inputs, output: source };
    let mut samples = Vec::new();
    let mut bytes = Vec::new();
    // a zero width row goes through every step and comes out with the format.
    if let Ok((format, _)) = out.transform_row(&[], 0, &mut samples, &mut bytes) {
      out.output = format;
    }
    out
  }

  /// The format that transformed rows have.
  #[inline]
  pub fn output_format(&self) -> RowFormat {
    self.output
  }

  /// Transforms one row, writing the new bytes to `out`.
  ///
  /// Gives the output format and how many palette indexes were past the end
  /// of the palette (those pixels become opaque black).
  pub fn transform_row(
    &self, raw: &[u8], width: u32, samples: &mut Vec<u16>, out: &mut Vec<u8>,
  ) -> Result<(RowFormat, usize), ImageError> {
    let t = self.transforms;
    read_samples(raw, width, &self.source, samples)?;
    let d = self.source.bit_depth as u8;
    let mut st = RowState {
      color_type: self.source.color_type,
      depth: d,
      norm_bits: [d; 4],
      sbit: self.inputs.sbit,
    };
    let mut bad_indexes = 0;

    if t.contains(Transforms::EXPAND) {
      if st.color_type == ColorType::Palette {
        let palette = self.inputs.palette.unwrap_or(&[]);
        let alphas = self.inputs.palette_alphas;
        let per_pixel = if alphas.is_some() { 4 } else { 3 };
        let mut expanded = Vec::with_capacity(samples.len() * per_pixel);
        for i in samples.iter().map(|&i| usize::from(i)) {
          let [r, g, b] = match palette.get(i) {
            Some(entry) => *entry,
            None => {
              bad_indexes += 1;
              [0, 0, 0]
            }
          };
          expanded.extend([r, g, b].map(u16::from));
          if let Some(alphas) = alphas {
            expanded.push(u16::from(alphas.get(i).copied().unwrap_or(u8::MAX)));
          }
        }
        *samples = expanded;
        st.color_type = if alphas.is_some() { ColorType::RgbAlpha } else { ColorType::Rgb };
        st.depth = 8;
        st.norm_bits = [8; 4];
        st.sbit = None;
      } else {
        if let Some((key, key_len)) = self.inputs.trns_key {
          if key_len == st.channels() && !st.color_type.has_alpha() {
            let max = st.depth_max();
            let n = st.channels();
            let mut keyed = Vec::with_capacity(samples.len() / n * (n + 1));
            for px in samples.chunks_exact(n) {
              keyed.extend_from_slice(px);
              keyed.push(if px == &key[..n] { 0 } else { max });
            }
            *samples = keyed;
            st.color_type = st.color_type.with_alpha();
            st.norm_bits[n] = st.depth;
            if let Some(sbit) = st.sbit.as_mut() {
              sbit[n] = st.depth;
            }
          }
        }
        if st.depth < 8 {
          let bits = u32::from(st.depth);
          samples.iter_mut().for_each(|v| *v = u16::from(u8_replicate_bits(bits, *v as u8)));
          st.depth = 8;
          st.norm_bits = [8; 4];
        }
      }
    }

    if t.contains(Transforms::STRIP_16) && st.depth == 16 {
      samples.iter_mut().for_each(|v| *v >>= 8);
      st.depth = 8;
      st.norm_bits = [8; 4];
      if let Some(sbit) = st.sbit.as_mut() {
        sbit.iter_mut().for_each(|b| *b = (*b).min(8));
      }
    }

    if t.contains(Transforms::STRIP_ALPHA) && st.color_type.has_alpha() {
      let n = st.channels();
      let mut i = 0;
      samples.retain(|_| {
        i += 1;
        i % n != 0
      });
      st.color_type = st.color_type.without_alpha();
    }

    if t.contains(Transforms::INVERT_MONO)
      && matches!(st.color_type, ColorType::Gray | ColorType::GrayAlpha)
    {
      let max = st.depth_max();
      samples.iter_mut().step_by(st.channels()).for_each(|v| *v = max - *v);
    }

    if t.contains(Transforms::SHIFT) && st.color_type != ColorType::Palette {
      if let Some(sbit) = st.sbit {
        let n = st.channels();
        for px in samples.chunks_exact_mut(n) {
          for (v, b) in px.iter_mut().zip(sbit.iter()) {
            *v >>= st.depth.saturating_sub(*b);
          }
        }
        st.norm_bits[..n].copy_from_slice(&sbit[..n]);
      }
    }

    if t.contains(Transforms::INVERT_ALPHA) && st.color_type.has_alpha() {
      let n = st.channels();
      let bits = u32::from(st.norm_bits[n - 1]);
      let max = ((1_u32 << bits) - 1) as u16;
      samples.iter_mut().skip(n - 1).step_by(n).for_each(|a| *a = max.saturating_sub(*a));
    }

    // layout
    let sub_byte = st.depth < 8;
    let packed_wide = t.contains(Transforms::PACKING) && sub_byte;
    let storage_depth = if packed_wide { 8 } else { st.depth };
    let bit_depth = BitDepth::try_from(storage_depth).unwrap_or(BitDepth::Eight);
    let format = RowFormat {
      color_type: st.color_type,
      bit_depth,
      significant_bits: st.norm_bits,
      lsb_first: t.contains(Transforms::PACKSWAP) && sub_byte && !packed_wide,
      little_endian: t.contains(Transforms::SWAP_ENDIAN) && storage_depth == 16,
      bgr: t.contains(Transforms::BGR)
        && matches!(st.color_type, ColorType::Rgb | ColorType::RgbAlpha),
      alpha_first: t.contains(Transforms::SWAP_ALPHA) && st.color_type.has_alpha(),
    };
    let n = st.channels();
    if format.bgr || format.alpha_first {
      for px in samples.chunks_exact_mut(n) {
        if format.bgr {
          px.swap(0, 2);
        }
        if format.alpha_first {
          px.rotate_right(1);
        }
      }
    }
    write_samples(samples, &format, width, out);
    Ok((format, bad_indexes))
  }
}

/// Stores samples into bytes according to the format.
#[cfg(feature = "alloc")]
fn write_samples(samples: &[u16], format: &RowFormat, width: u32, out: &mut Vec<u8>) {
  out.clear();
  out.resize(format.bytes_per_row(width), 0);
  match format.bit_depth {
    BitDepth::Sixteen => {
      for (dst, v) in out.chunks_exact_mut(2).zip(samples.iter()) {
        let bytes = if format.little_endian { v.to_le_bytes() } else { v.to_be_bytes() };
        dst.copy_from_slice(&bytes);
      }
    }
    BitDepth::Eight => {
      out.iter_mut().zip(samples.iter()).for_each(|(dst, v)| *dst = *v as u8);
    }
    sub_byte => {
      let depth = sub_byte as usize;
      let mask = (1_u16 << depth) - 1;
      for (i, v) in samples.iter().enumerate() {
        let bit_pos = i * depth;
        let shift = if format.lsb_first { bit_pos % 8 } else { 8 - depth - (bit_pos % 8) };
        out[bit_pos / 8] |= ((*v & mask) as u8) << shift;
      }
    }
  }
}
