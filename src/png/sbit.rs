use crate::pixel::{BitDepth, ColorType};

/// Significant bits
///
/// One byte per channel giving the number of bits of each channel that carried
/// meaning in the original data. The channels are, by color type:
/// * gray: gray
/// * RGB and palette: red, green, blue
/// * gray + alpha: gray, alpha
/// * RGBA: red, green, blue, alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(nonstandard_style)]
pub struct sBIT<'b>(&'b [u8]);
impl<'b> From<&'b [u8]> for sBIT<'b> {
  #[inline]
  fn from(data: &'b [u8]) -> Self {
    Self(data)
  }
}
impl sBIT<'_> {
  /// Chunk data.
  #[inline]
  #[must_use]
  pub const fn data(&self) -> &[u8] {
    self.0
  }

  /// Gets the bits for each channel of a non-palette image.
  ///
  /// Fails if the length doesn't match the color type or any value is 0 or
  /// more than the bit depth.
  pub fn channel_bits(&self, color_type: ColorType, bit_depth: BitDepth) -> Option<[u8; 4]> {
    if color_type == ColorType::Palette || self.0.len() != color_type.channel_count() {
      return None;
    }
    let mut out = [bit_depth as u8; 4];
    for (o, b) in out.iter_mut().zip(self.0.iter().copied()) {
      if b == 0 || b > bit_depth as u8 {
        return None;
      }
      *o = b;
    }
    Some(out)
  }
}

#[test]
fn test_sbit_channel_bits() {
  let s = sBIT::from(&[5, 6, 5][..]);
  assert_eq!(s.channel_bits(ColorType::Rgb, BitDepth::Eight), Some([5, 6, 5, 8]));
  assert_eq!(s.channel_bits(ColorType::RgbAlpha, BitDepth::Eight), None);
  assert_eq!(s.channel_bits(ColorType::Palette, BitDepth::Eight), None);
  let s = sBIT::from(&[9][..]);
  assert_eq!(s.channel_bits(ColorType::Gray, BitDepth::Eight), None);
}
