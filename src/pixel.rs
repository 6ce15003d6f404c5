#![forbid(unsafe_code)]

//! Pixel, color type, and bit depth types.
//!
//! Every PNG pixel format is a pairing of two factors:
//! * **Color Type:** which channels are stored. PNG encodes this as a small
//!   bitmask in the header: bit 0 means "indexes into a palette", bit 1 means
//!   "has color" (RGB instead of gray), and bit 2 means "has alpha".
//! * **Bit Depth:** how many bits each stored sample uses. Depths below 8
//!   pack more than one pixel into each byte, with the high bits being the
//!   leftmost pixel.
//!
//! Not every pairing is legal, see [`BitDepth::is_valid_for`].
//!
//! Decoded pixels are always [`Pixel`] values, four `f32` channels that have
//! been normalized into `0.0 ..= 1.0` by dividing each sample by the maximum
//! value of its bit depth.

use bytemuck::{Pod, Zeroable};

/// A pixel with normalized `f32` channels.
///
/// All channels are in the range `0.0 ..= 1.0`. Formats without alpha decode
/// with `a` set to `1.0` (fully opaque).
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Pixel {
  pub r: f32,
  pub g: f32,
  pub b: f32,
  pub a: f32,
}
impl Pixel {
  /// Opaque black.
  pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
  /// Opaque white.
  pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

  /// Makes a pixel from the four channel values.
  #[inline]
  #[must_use]
  pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
    Self { r, g, b, a }
  }

  /// Makes an opaque gray pixel.
  #[inline]
  #[must_use]
  pub const fn gray(y: f32) -> Self {
    Self::new(y, y, y, 1.0)
  }

  /// Makes a gray pixel with alpha.
  #[inline]
  #[must_use]
  pub const fn gray_alpha(y: f32, a: f32) -> Self {
    Self::new(y, y, y, a)
  }

  /// Makes an opaque RGB pixel.
  #[inline]
  #[must_use]
  pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
    Self::new(r, g, b, 1.0)
  }

  /// The channels as an array in `[r, g, b, a]` order.
  #[inline]
  #[must_use]
  pub const fn to_array(self) -> [f32; 4] {
    [self.r, self.g, self.b, self.a]
  }
}

/// Views a row of pixels as its flat `f32` channel data, four per pixel.
#[inline]
#[must_use]
pub fn pixels_as_f32(pixels: &[Pixel]) -> &[f32] {
  bytemuck::cast_slice(pixels)
}

impl From<[f32; 4]> for Pixel {
  #[inline]
  fn from([r, g, b, a]: [f32; 4]) -> Self {
    Self { r, g, b, a }
  }
}
impl From<Pixel> for [f32; 4] {
  #[inline]
  fn from(p: Pixel) -> Self {
    p.to_array()
  }
}

/// The ways that PNG can lay out the channels of a pixel.
///
/// The discriminant of each variant is the byte that the PNG header uses for
/// it, which is a combination of the `HAS_*` flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ColorType {
  /// Greyscale
  Gray = 0,
  /// Red, Green, Blue
  Rgb = 2,
  /// Index into a palette.
  ///
  /// The palette holds RGB8 entries, and there may be a transparency chunk
  /// with alpha values for some of the entries.
  Palette = 3,
  /// Greyscale + Alpha
  GrayAlpha = 4,
  /// Red, Green, Blue, Alpha
  RgbAlpha = 6,
}
impl ColorType {
  /// Flag bit: samples are palette indexes.
  pub const HAS_PALETTE: u8 = 1;
  /// Flag bit: pixels have red, green, and blue instead of gray.
  pub const HAS_COLOR: u8 = 2;
  /// Flag bit: pixels have an alpha channel.
  pub const HAS_ALPHA: u8 = 4;

  /// The flag bits of this color type.
  #[inline]
  #[must_use]
  pub const fn mask(self) -> u8 {
    self as u8
  }

  /// If the samples are palette indexes.
  #[inline]
  #[must_use]
  pub const fn has_palette(self) -> bool {
    (self.mask() & Self::HAS_PALETTE) != 0
  }

  /// If the pixels are in color (this includes palette images).
  #[inline]
  #[must_use]
  pub const fn has_color(self) -> bool {
    (self.mask() & Self::HAS_COLOR) != 0
  }

  /// If the pixels carry an alpha channel.
  #[inline]
  #[must_use]
  pub const fn has_alpha(self) -> bool {
    (self.mask() & Self::HAS_ALPHA) != 0
  }

  /// The number of channels stored per pixel.
  ///
  /// A palette index is a single channel even though it stands for a color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    let m = self.mask();
    if (m & Self::HAS_PALETTE) != 0 {
      1
    } else {
      let base = if (m & Self::HAS_COLOR) != 0 { 3 } else { 1 };
      base + ((m & Self::HAS_ALPHA) != 0) as usize
    }
  }

  /// This color type with an alpha channel added.
  ///
  /// Palette images don't gain an alpha channel this way, they're returned
  /// unchanged.
  #[inline]
  #[must_use]
  pub const fn with_alpha(self) -> Self {
    match self {
      Self::Gray | Self::GrayAlpha => Self::GrayAlpha,
      Self::Rgb | Self::RgbAlpha => Self::RgbAlpha,
      Self::Palette => Self::Palette,
    }
  }

  /// This color type with the alpha channel removed.
  #[inline]
  #[must_use]
  pub const fn without_alpha(self) -> Self {
    match self {
      Self::Gray | Self::GrayAlpha => Self::Gray,
      Self::Rgb | Self::RgbAlpha => Self::Rgb,
      Self::Palette => Self::Palette,
    }
  }
}
impl TryFrom<u8> for ColorType {
  type Error = ();
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => ColorType::Gray,
      2 => ColorType::Rgb,
      3 => ColorType::Palette,
      4 => ColorType::GrayAlpha,
      6 => ColorType::RgbAlpha,
      _ => return Err(()),
    })
  }
}
impl core::fmt::Display for ColorType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_str(match self {
      Self::Gray => "gray",
      Self::Rgb => "rgb",
      Self::Palette => "palette",
      Self::GrayAlpha => "gray+alpha",
      Self::RgbAlpha => "rgb+alpha",
    })
  }
}

/// Bits per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum BitDepth {
  One = 1,
  Two = 2,
  Four = 4,
  Eight = 8,
  Sixteen = 16,
}
impl BitDepth {
  /// The number of bits.
  #[inline]
  #[must_use]
  pub const fn bits(self) -> u32 {
    self as u32
  }

  /// The largest sample value at this depth.
  #[inline]
  #[must_use]
  pub const fn max_value(self) -> u16 {
    match self {
      Self::Sixteen => u16::MAX,
      other => (1_u16 << other.bits()) - 1,
    }
  }

  /// If more than one sample fits within each byte.
  #[inline]
  #[must_use]
  pub const fn is_sub_byte(self) -> bool {
    (self as u8) < 8
  }

  /// Checks the pairing against the table of allowed PNG formats.
  ///
  /// * Gray allows any depth.
  /// * Palette allows 1, 2, 4, and 8.
  /// * Everything else allows only 8 and 16.
  #[inline]
  #[must_use]
  pub const fn is_valid_for(self, color_type: ColorType) -> bool {
    match color_type {
      ColorType::Gray => true,
      ColorType::Palette => !matches!(self, Self::Sixteen),
      ColorType::Rgb | ColorType::GrayAlpha | ColorType::RgbAlpha => {
        matches!(self, Self::Eight | Self::Sixteen)
      }
    }
  }
}
impl TryFrom<u8> for BitDepth {
  type Error = ();
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      1 => Self::One,
      2 => Self::Two,
      4 => Self::Four,
      8 => Self::Eight,
      16 => Self::Sixteen,
      _ => return Err(()),
    })
  }
}
impl core::fmt::Display for BitDepth {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    core::fmt::Display::fmt(&self.bits(), f)
  }
}

/// Bits per pixel for the given format.
#[inline]
#[must_use]
pub const fn bits_per_pixel(bit_depth: BitDepth, color_type: ColorType) -> usize {
  (bit_depth.bits() as usize) * color_type.channel_count()
}

/// Bytes per scanline for the given width and format, rounding up partial
/// bytes.
#[inline]
#[must_use]
pub const fn bytes_per_row(width: u32, bit_depth: BitDepth, color_type: ColorType) -> usize {
  let bits_per_line = bits_per_pixel(bit_depth, color_type).saturating_mul(width as usize);
  (bits_per_line / 8) + (bits_per_line % 8 != 0) as usize
}
