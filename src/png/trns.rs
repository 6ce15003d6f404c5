use core::fmt::Debug;

use crate::pixel::ColorType;

/// Transparency data
///
/// What the data means depends on the color type of the image:
/// * Gray: one big-endian `u16` gray level that is fully transparent.
/// * RGB: three big-endian `u16` values, the color that is fully transparent.
/// * Palette: one alpha byte per palette entry. There can be fewer alpha
///   entries than palette entries, missing entries are fully opaque.
/// * Types that already have alpha can't have a transparency chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(nonstandard_style)]
pub struct tRNS<'b>(&'b [u8]);
impl<'b> From<&'b [u8]> for tRNS<'b> {
  #[inline]
  fn from(data: &'b [u8]) -> Self {
    Self(data)
  }
}
impl Debug for tRNS<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_tuple("tRNS").field(&&self.0[..self.0.len().min(12)]).field(&self.0.len()).finish()
  }
}
impl<'b> tRNS<'b> {
  /// Gets the grayscale value that is transparent.
  ///
  /// Fails when the chunk has the wrong length for grayscale.
  #[inline]
  pub const fn try_to_grayscale(&self) -> Option<u16> {
    match self.0 {
      [y0, y1] => Some(u16::from_be_bytes([*y0, *y1])),
      _ => None,
    }
  }
  /// Gets the RGB value that is transparent.
  ///
  /// Fails when the chunk has the wrong length for rgb.
  #[inline]
  pub const fn try_to_rgb(&self) -> Option<[u16; 3]> {
    match self.0 {
      [r0, r1, g0, g1, b0, b1] => Some([
        u16::from_be_bytes([*r0, *r1]),
        u16::from_be_bytes([*g0, *g1]),
        u16::from_be_bytes([*b0, *b1]),
      ]),
      _ => None,
    }
  }
  /// Gets the alpha values for each palette index.
  #[inline]
  pub const fn to_alphas(&self) -> &'b [u8] {
    self.0
  }

  /// The transparent key as a list of samples for gray or RGB images.
  ///
  /// Gives `None` for other color types, or if the length is wrong.
  #[inline]
  pub fn key_for(&self, color_type: ColorType) -> Option<([u16; 3], usize)> {
    match color_type {
      ColorType::Gray => self.try_to_grayscale().map(|y| ([y, 0, 0], 1)),
      ColorType::Rgb => self.try_to_rgb().map(|rgb| (rgb, 3)),
      _ => None,
    }
  }
}

#[test]
fn test_trns_keys() {
  let t = tRNS::from(&[0x01, 0x02][..]);
  assert_eq!(t.try_to_grayscale(), Some(0x0102));
  assert_eq!(t.key_for(ColorType::Gray), Some(([0x0102, 0, 0], 1)));
  assert_eq!(t.key_for(ColorType::Rgb), None);
  let t = tRNS::from(&[0, 1, 0, 2, 0, 3][..]);
  assert_eq!(t.key_for(ColorType::Rgb), Some(([1, 2, 3], 3)));
  assert_eq!(t.to_alphas().len(), 6);
}
