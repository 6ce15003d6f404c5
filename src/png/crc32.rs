//! The CRC-32 used by PNG chunks (ISO 3309, the same one as zlib).

const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Byte-at-a-time lookup table, built at compile time.
static TABLE: [u32; 256] = {
  let mut table = [0_u32; 256];
  let mut i = 0;
  while i < 256 {
    let mut c = i as u32;
    let mut bit = 0;
    while bit < 8 {
      c = if (c & 1) != 0 { POLYNOMIAL ^ (c >> 1) } else { c >> 1 };
      bit += 1;
    }
    table[i] = c;
    i += 1;
  }
  table
};

/// A running CRC that can be fed bytes in pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32(u32);
impl Crc32 {
  /// A CRC that hasn't seen any bytes yet.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(u32::MAX)
  }

  /// Feeds more bytes in.
  #[inline]
  pub fn update(&mut self, bytes: &[u8]) {
    self.0 = bytes.iter().fold(self.0, |crc, &b| TABLE[usize::from(crc as u8 ^ b)] ^ (crc >> 8));
  }

  /// The CRC of every byte fed in so far.
  #[inline]
  #[must_use]
  pub const fn finish(self) -> u32 {
    !self.0
  }
}
impl Default for Crc32 {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

#[test]
fn test_crc32_known_values() {
  let crc_of = |parts: &[&[u8]]| {
    let mut crc = Crc32::new();
    parts.iter().for_each(|p| crc.update(p));
    crc.finish()
  };
  // the IEND chunk always has this CRC.
  assert_eq!(crc_of(&[&b"IEND"[..]]), 0xAE42_6082);
  assert_eq!(crc_of(&[&b"123456789"[..]]), 0xCBF4_3926);
  assert_eq!(crc_of(&[&b"1234"[..], &b""[..], &b"56789"[..]]), 0xCBF4_3926);
  assert_eq!(crc_of(&[]), 0);
}
