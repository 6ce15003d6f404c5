use crate::error::DecodeError;

#[inline]
#[must_use]
const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // The order of these tests is fixed by the PNG standard, don't reorder them.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Reverses one filtered line in place.
///
/// `prev` is the already unfiltered previous line, or `None` on the first
/// line, which makes the "previous line" an implied line of zeros.
fn unfilter_line(
  filter: u8, pixels: &mut [u8], prev: Option<&[u8]>, filter_chunk_size: usize,
) -> Result<(), DecodeError> {
  let mut p_it = pixels.chunks_exact_mut(filter_chunk_size);
  match (filter, prev) {
    (0, _) | (2, None) => {
      // None, or Up against a line of zeros
    }
    (1, _) => {
      // Sub
      let mut a_pixel: &[u8] = match p_it.next() {
        Some(first) => first,
        None => return Ok(()),
      };
      for pixel in p_it {
        a_pixel.iter().copied().zip(pixel.iter_mut()).for_each(|(a, p)| *p = p.wrapping_add(a));
        a_pixel = pixel;
      }
    }
    (2, Some(prev)) => {
      // Up
      for (pixel, b_pixel) in p_it.zip(prev.chunks_exact(filter_chunk_size)) {
        b_pixel.iter().copied().zip(pixel.iter_mut()).for_each(|(b, p)| *p = p.wrapping_add(b));
      }
    }
    (3, None) => {
      // Average, the `b` is always 0 so we elide it from the computation
      let mut a_pixel: &[u8] = match p_it.next() {
        Some(first) => first,
        None => return Ok(()),
      };
      for pixel in p_it {
        a_pixel.iter().copied().zip(pixel.iter_mut()).for_each(|(a, p)| *p = p.wrapping_add(a / 2));
        a_pixel = pixel;
      }
    }
    (3, Some(prev)) => {
      // Average
      let mut pb_it = p_it.zip(prev.chunks_exact(filter_chunk_size));
      let mut a_pixel: &[u8] = match pb_it.next() {
        Some((pixel, b_pixel)) => {
          pixel
            .iter_mut()
            .zip(b_pixel.iter().copied())
            .for_each(|(p, b)| *p = p.wrapping_add(b / 2));
          pixel
        }
        None => return Ok(()),
      };
      for (pixel, b_pixel) in pb_it {
        a_pixel.iter().copied().zip(b_pixel.iter().copied()).zip(pixel.iter_mut()).for_each(
          |((a, b), p)| {
            *p = p.wrapping_add(((a as u32 + b as u32) / 2) as u8);
          },
        );
        a_pixel = pixel;
      }
    }
    (4, None) => {
      // Paeth, with `b` and `c` both always 0 it's the same as Sub
      let mut a_pixel: &[u8] = match p_it.next() {
        Some(first) => first,
        None => return Ok(()),
      };
      for pixel in p_it {
        a_pixel
          .iter()
          .copied()
          .zip(pixel.iter_mut())
          .for_each(|(a, p)| *p = p.wrapping_add(paeth_predict(a, 0, 0)));
        a_pixel = pixel;
      }
    }
    (4, Some(prev)) => {
      // Paeth
      let mut pb_it = p_it.zip(prev.chunks_exact(filter_chunk_size));
      let (mut a_pixel, mut c_pixel): (&[u8], &[u8]) = match pb_it.next() {
        Some((pixel, b_pixel)) => {
          pixel.iter_mut().zip(b_pixel.iter().copied()).for_each(|(p, b)| {
            *p = p.wrapping_add(paeth_predict(0, b, 0));
          });
          (&*pixel, b_pixel)
        }
        None => return Ok(()),
      };
      for (pixel, b_pixel) in pb_it {
        a_pixel
          .iter()
          .copied()
          .zip(b_pixel.iter().copied())
          .zip(c_pixel.iter().copied())
          .zip(pixel.iter_mut())
          .for_each(|(((a, b), c), p)| {
            *p = p.wrapping_add(paeth_predict(a, b, c));
          });
        a_pixel = pixel;
        c_pixel = b_pixel;
      }
    }
    (other, _) => return Err(DecodeError::IllegalFilterType(other)),
  }
  Ok(())
}

/// Unfilters decompressed image data in place.
///
/// The data is `height` lines of `1 + bytes_per_scanline` bytes each, where
/// the first byte of each line says which filter was used. Filtering works per
/// byte of a pixel when pixels are more than 1 byte each, and per byte when
/// pixels are 1 byte or less, so `filter_chunk_size` is bytes per pixel
/// rounded up to 1.
///
/// After unfiltering each filter byte is reset to 0 ("no filter"), so calling
/// this a second time on the same buffer doesn't alter it any further.
///
/// ## Failure
/// * [`DecodeError::NotEnoughImageData`] if the buffer is too small for the
///   lines.
/// * [`DecodeError::IllegalFilterType`] for a filter byte above 4. Lines
///   before the bad one will already have been unfiltered.
pub fn unfilter_lines(
  decompressed: &mut [u8], bytes_per_scanline: usize, height: u32, filter_chunk_size: usize,
) -> Result<(), DecodeError> {
  let bytes_per_filterline = bytes_per_scanline.checked_add(1).ok_or(DecodeError::CheckedMath)?;
  let bytes_used =
    bytes_per_filterline.checked_mul(height as usize).ok_or(DecodeError::CheckedMath)?;
  if decompressed.len() < bytes_used || filter_chunk_size == 0 {
    return Err(DecodeError::NotEnoughImageData);
  }
  let mut b_pixels: Option<&[u8]> = None;
  for line in decompressed[..bytes_used].chunks_exact_mut(bytes_per_filterline) {
    let (f, pixels) = line.split_at_mut(1);
    unfilter_line(f[0], pixels, b_pixels, filter_chunk_size)?;
    f[0] = 0;
    b_pixels = Some(&*pixels);
  }
  Ok(())
}
