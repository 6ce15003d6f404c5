use core::fmt::Debug;

/// Palette data
///
/// Palette entries are always RGB8.
///
/// If you want to have a paletted image with transparency then the transparency
/// info goes in a separate transparency chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PLTE<'b>(&'b [[u8; 3]]);
impl<'b> TryFrom<&'b [u8]> for PLTE<'b> {
  type Error = ();
  /// Fails if the data isn't 1 to 256 entries of 3 bytes each.
  #[inline]
  fn try_from(data: &'b [u8]) -> Result<Self, Self::Error> {
    let entries: &[[u8; 3]] = bytemuck::try_cast_slice(data).map_err(|_| ())?;
    if entries.is_empty() || entries.len() > 256 {
      return Err(());
    }
    Ok(Self(entries))
  }
}
impl Debug for PLTE<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    // currently prints no more than 4 palette entries
    f.debug_tuple("PLTE").field(&&self.0[..self.0.len().min(4)]).field(&self.0.len()).finish()
  }
}
impl<'b> PLTE<'b> {
  /// Gets the entries as a slice.
  #[inline]
  #[must_use]
  pub fn entries(&self) -> &'b [[u8; 3]] {
    self.0
  }
}

#[test]
fn test_plte_lengths() {
  let plte = PLTE::try_from(&[1_u8, 2, 3, 4, 5, 6][..]).unwrap();
  assert_eq!(plte.entries(), &[[1, 2, 3], [4, 5, 6]]);
  assert!(PLTE::try_from(&[1_u8, 2, 3, 4][..]).is_err());
  assert!(PLTE::try_from(&[0_u8; 0][..]).is_err());
  assert!(PLTE::try_from(&[0_u8; 3 * 257][..]).is_err());
}
