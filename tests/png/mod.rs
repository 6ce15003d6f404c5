use std::{
  io::{Cursor, ErrorKind, Read},
  sync::{Mutex, PoisonError},
};

use pngpixels::{
  png::{chunk_crc, ChunkType, RawChunkIter, PNG_SIGNATURE},
  set_warning_sink, BitDepth, ColorType, DecodeError, DecodeId, DecodeOptions, Image, ImageError,
  Pixel, Transforms,
};
use walkdir::WalkDir;

static WARNINGS: Mutex<Vec<(DecodeId, String)>> = Mutex::new(Vec::new());

fn capture(message: &str, id: DecodeId) {
  WARNINGS.lock().unwrap_or_else(PoisonError::into_inner).push((id, message.to_string()));
}

fn warnings_for(id: DecodeId) -> Vec<String> {
  let all = WARNINGS.lock().unwrap_or_else(PoisonError::into_inner);
  all.iter().filter(|(i, _)| *i == id).map(|(_, m)| m.clone()).collect()
}

fn capturing(transforms: Transforms) -> DecodeOptions {
  DecodeOptions { transforms, warning_sink: Some(capture), ..Default::default() }
}

fn put_chunk(out: &mut Vec<u8>, ty: &[u8; 4], data: &[u8]) {
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(ty);
  out.extend_from_slice(data);
  out.extend_from_slice(&chunk_crc(ChunkType(*ty), data).to_be_bytes());
}

fn ihdr(width: u32, height: u32, depth: u8, color: u8) -> [u8; 13] {
  let mut out = [0; 13];
  out[0..4].copy_from_slice(&width.to_be_bytes());
  out[4..8].copy_from_slice(&height.to_be_bytes());
  out[8] = depth;
  out[9] = color;
  out
}

/// Signature, `IHDR`, the extra chunks, one `IDAT` of the filtered lines, and
/// `IEND`.
fn build_png(header: [u8; 13], extra: &[(&[u8; 4], &[u8])], filtered: &[u8]) -> Vec<u8> {
  let mut out = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut out, b"IHDR", &header);
  for (ty, data) in extra {
    put_chunk(&mut out, ty, data);
  }
  put_chunk(&mut out, b"IDAT", &miniz_oxide::deflate::compress_to_vec_zlib(filtered, 6));
  put_chunk(&mut out, b"IEND", &[]);
  out
}

/// Each line gets a "None" filter byte.
fn unfiltered(lines: &[&[u8]]) -> Vec<u8> {
  lines.iter().flat_map(|l| core::iter::once(0).chain(l.iter().copied())).collect()
}

fn rgb8_2x1() -> Vec<u8> {
  build_png(ihdr(2, 1, 8, 2), &[], &unfiltered(&[&[255, 0, 0, 0, 255, 0]]))
}

fn palette2_3x1(extra_trns: bool) -> Vec<u8> {
  let plte: &[u8] = &[255, 0, 0, 0, 255, 0, 0, 0, 255];
  let trns: &[u8] = &[0];
  let lines = unfiltered(&[&[0b00_01_10_00]]);
  if extra_trns {
    build_png(ihdr(3, 1, 2, 3), &[(b"PLTE", plte), (b"tRNS", trns)], &lines)
  } else {
    build_png(ihdr(3, 1, 2, 3), &[(b"PLTE", plte)], &lines)
  }
}

fn assert_close(actual: Pixel, expected: Pixel) {
  let close = actual.to_array().iter().zip(expected.to_array()).all(|(a, e)| (a - e).abs() < 1e-6);
  assert!(close, "{actual:?} != {expected:?}");
}

struct CountingReader<R> {
  inner: R,
  count: usize,
}
impl<R: Read> Read for CountingReader<R> {
  fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
    let n = self.inner.read(buf)?;
    self.count += n;
    Ok(n)
  }
}

/// Gives the inner bytes, then fails with `kind` instead of ending.
struct FailingReader<'b> {
  inner: &'b [u8],
  kind: ErrorKind,
}
impl Read for FailingReader<'_> {
  fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
    if self.inner.is_empty() {
      return Err(self.kind.into());
    }
    self.inner.read(buf)
  }
}

#[test]
fn test_RawChunkIter_no_panics() {
  // iter ALL files in the test folder, even non-png files shouldn't panic it.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    println!("{}", entry.path().display());
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    for _ in RawChunkIter::new(&v) {
      //
    }
    let _ = Image::from_png_bytes_with(&v, capturing(Transforms::EXPAND));
  }
  // even totally random data should never panic the iterator!
  for _ in 0..10 {
    let v = super::rand_bytes(1024);
    for _ in RawChunkIter::new(&v) {
      //
    }
  }
}

#[test]
fn test_random_image_data_never_panics() {
  for _ in 0..20 {
    let mut png = Vec::from(PNG_SIGNATURE);
    put_chunk(&mut png, b"IHDR", &ihdr(7, 5, 8, 6));
    put_chunk(&mut png, b"IDAT", &super::rand_bytes(256));
    put_chunk(&mut png, b"IEND", &[]);
    let _ = Image::from_png_bytes_with(&png, capturing(Transforms::IDENTITY));

    // valid zlib of random scanlines, most of the filter bytes are illegal.
    let filtered = super::rand_bytes(5 * (1 + 7 * 4));
    let png = build_png(ihdr(7, 5, 8, 6), &[], &filtered);
    if let Ok(image) = Image::from_png_bytes_with(&png, capturing(Transforms::IDENTITY)) {
      for row in image.rows() {
        assert_eq!(row.unwrap().len(), 7);
      }
    }
  }
}

#[test]
fn test_rgb8_pixels() {
  let image = Image::from_png_bytes(&rgb8_2x1()).unwrap();
  assert_eq!(image.width(), 2);
  assert_eq!(image.height(), 1);
  assert_eq!(image.color_type(), ColorType::Rgb);
  assert_eq!(image.bit_depth(), BitDepth::Eight);
  assert_eq!(image.bytes_per_row(), 6);
  assert_eq!(image.pixel_at(0, 0), Ok(Pixel::new(1.0, 0.0, 0.0, 1.0)));
  assert_eq!(image.pixel_at(1, 0), Ok(Pixel::new(0.0, 1.0, 0.0, 1.0)));
  assert_eq!(image.pixel_at(2, 0), Err(ImageError::IndexOutOfRange { x: 2, y: 0 }));
  assert_eq!(image.pixel_at(0, 1), Err(ImageError::IndexOutOfRange { x: 0, y: 1 }));
  assert_eq!(image.unpack_count(), 1);
}

#[test]
fn test_not_a_png_reads_only_the_signature() {
  let mut reader = CountingReader { inner: &[0_u8; 64][..], count: 0 };
  assert_eq!(Image::decode(&mut reader).unwrap_err(), ImageError::NotAPng);
  assert_eq!(reader.count, 8);

  // too short to even hold a signature
  assert_eq!(Image::from_png_bytes(&PNG_SIGNATURE[..5]).unwrap_err(), ImageError::NotAPng);
}

#[test]
fn test_decode_stops_after_iend() {
  let png = rgb8_2x1();
  let mut data = png.clone();
  data.extend_from_slice(b"more stuff");
  let mut cursor = Cursor::new(data);
  Image::decode(&mut cursor).unwrap();
  assert_eq!(cursor.position(), png.len() as u64);

  let image = Image::from_png_bytes_with(&cursor.into_inner(), capturing(Transforms::IDENTITY))
    .unwrap();
  let warnings = warnings_for(image.decode_id());
  assert!(warnings.iter().any(|w| w.contains("10 bytes after IEND")), "{warnings:?}");
}

#[test]
fn test_truncated_input() {
  let png = rgb8_2x1();
  // IEND is the last 12 bytes.
  for cut in [png.len() - 12, png.len() - 1, 20] {
    assert_eq!(Image::from_png_bytes(&png[..cut]).unwrap_err(), ImageError::TruncatedInput);
  }
}

#[test]
fn test_chunk_order_errors() {
  let mut png = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut png, b"tEXt", b"a\0b");
  put_chunk(&mut png, b"IHDR", &ihdr(1, 1, 8, 0));
  assert_eq!(
    Image::from_png_bytes(&png).unwrap_err(),
    ImageError::Decode(DecodeError::FirstChunkNotIHDR)
  );

  let mut png = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut png, b"IHDR", &ihdr(1, 1, 8, 0));
  put_chunk(&mut png, b"IEND", &[]);
  assert_eq!(
    Image::from_png_bytes(&png).unwrap_err(),
    ImageError::Decode(DecodeError::NoImageData)
  );

  let mut png = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut png, b"IHDR", &ihdr(1, 1, 8, 0));
  png.extend_from_slice(&0x8000_0000_u32.to_be_bytes());
  png.extend_from_slice(b"IDAT");
  assert_eq!(
    Image::from_png_bytes(&png).unwrap_err(),
    ImageError::Decode(DecodeError::ChunkTooLong)
  );
}

#[test]
fn test_bad_headers() {
  let lines = unfiltered(&[&[0]]);
  let mut interlaced = ihdr(1, 1, 8, 0);
  interlaced[12] = 1;
  assert_eq!(
    Image::from_png_bytes(&build_png(interlaced, &[], &lines)).unwrap_err(),
    ImageError::Decode(DecodeError::Interlaced)
  );
  assert_eq!(
    Image::from_png_bytes(&build_png(ihdr(1, 1, 4, 2), &[], &lines)).unwrap_err(),
    ImageError::Decode(DecodeError::IllegalHeader)
  );
  assert_eq!(
    Image::from_png_bytes(&build_png(ihdr(0, 1, 8, 0), &[], &lines)).unwrap_err(),
    ImageError::Decode(DecodeError::WidthOrHeightZero)
  );
  let opts = DecodeOptions { max_width: 4, ..Default::default() };
  assert_eq!(
    Image::from_png_bytes_with(&build_png(ihdr(5, 1, 8, 0), &[], &lines), opts).unwrap_err(),
    ImageError::Decode(DecodeError::DimensionsTooLarge)
  );
}

#[test]
fn test_crc_checks() {
  let mut png = rgb8_2x1();
  // last byte of the IHDR CRC
  png[8 + 8 + 13 + 3] ^= 0xFF;
  assert_eq!(
    Image::from_png_bytes(&png).unwrap_err(),
    ImageError::Decode(DecodeError::CriticalChunkCrc(*b"IHDR"))
  );
  let opts = DecodeOptions { verify_crc: false, ..Default::default() };
  assert!(Image::from_png_bytes_with(&png, opts).is_ok());

  // a bad ancillary chunk is only a warning
  let mut png = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut png, b"IHDR", &ihdr(1, 1, 8, 0));
  png.extend_from_slice(&[0, 0, 0, 1]);
  png.extend_from_slice(b"tEXt");
  png.extend_from_slice(&[b'x', 0, 0, 0, 0]);
  put_chunk(&mut png, b"IDAT", &miniz_oxide::deflate::compress_to_vec_zlib(&[0, 77], 6));
  put_chunk(&mut png, b"IEND", &[]);
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::IDENTITY)).unwrap();
  assert_close(image.pixel_at(0, 0).unwrap(), Pixel::gray(77.0 / 255.0));
  let warnings = warnings_for(image.decode_id());
  assert!(warnings.iter().any(|w| w.contains("CRC mismatch in tEXt")), "{warnings:?}");
}

#[test]
fn test_unknown_chunks() {
  let lines = unfiltered(&[&[0]]);
  let png = build_png(ihdr(1, 1, 8, 0), &[(b"ABCD", &b"??"[..])], &lines);
  assert_eq!(
    Image::from_png_bytes(&png).unwrap_err(),
    ImageError::Decode(DecodeError::UnknownCriticalChunk(*b"ABCD"))
  );
  let extra = [(b"abCD", &b"??"[..]), (b"gAMA", &[0, 0, 0xB1, 0x8F][..])];
  let png = build_png(ihdr(1, 1, 8, 0), &extra, &lines);
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::IDENTITY)).unwrap();
  assert!(warnings_for(image.decode_id()).is_empty());
}

#[test]
fn test_image_data_problems() {
  // 2x2 gray8 needs 6 bytes of scanlines
  let short = build_png(ihdr(2, 2, 8, 0), &[], &[0, 1, 2]);
  assert_eq!(
    Image::from_png_bytes(&short).unwrap_err(),
    ImageError::Decode(DecodeError::NotEnoughImageData)
  );

  let bad_filter = build_png(ihdr(2, 2, 8, 0), &[], &[0, 1, 2, 9, 3, 4]);
  assert_eq!(
    Image::from_png_bytes(&bad_filter).unwrap_err(),
    ImageError::Decode(DecodeError::IllegalFilterType(9))
  );

  let long = build_png(ihdr(2, 2, 8, 0), &[], &[0, 1, 2, 0, 3, 4, 0, 5, 6]);
  let image = Image::from_png_bytes_with(&long, capturing(Transforms::IDENTITY)).unwrap();
  assert_eq!(image.raw_row(1).unwrap(), &[3, 4]);
  let warnings = warnings_for(image.decode_id());
  assert!(warnings.iter().any(|w| w.contains("extra compressed data")), "{warnings:?}");

  let mut not_zlib = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut not_zlib, b"IHDR", &ihdr(2, 2, 8, 0));
  put_chunk(&mut not_zlib, b"IDAT", &[0xFF, 0xFF, 0xFF, 0xFF]);
  put_chunk(&mut not_zlib, b"IEND", &[]);
  assert!(matches!(Image::from_png_bytes(&not_zlib), Err(ImageError::Decode(_))));
}

#[test]
fn test_huge_header_with_tiny_data_fails_fast() {
  // 16384x16384 RGBA8 would need a full gigabyte of scanlines.
  let png = build_png(ihdr(16384, 16384, 8, 6), &[], &[0; 10]);
  assert!(png.len() < 100);
  for _ in 0..50 {
    assert_eq!(
      Image::from_png_bytes(&png).unwrap_err(),
      ImageError::Decode(DecodeError::NotEnoughImageData)
    );
  }

  let too_wide = build_png(ihdr(16385, 1, 8, 0), &[], &[0; 10]);
  assert_eq!(
    Image::from_png_bytes(&too_wide).unwrap_err(),
    ImageError::Decode(DecodeError::DimensionsTooLarge)
  );
  let too_tall = build_png(ihdr(1, 16385, 8, 0), &[], &[0; 10]);
  assert_eq!(
    Image::from_png_bytes(&too_tall).unwrap_err(),
    ImageError::Decode(DecodeError::DimensionsTooLarge)
  );
}

#[test]
fn test_image_data_across_many_idat_chunks() {
  // 64 rows of gray8, more than the first inflate buffer holds, split into 7
  // byte IDAT pieces.
  let lines: Vec<Vec<u8>> = (0..64_u8).map(|y| vec![y; 1000]).collect();
  let line_refs: Vec<&[u8]> = lines.iter().map(Vec::as_slice).collect();
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&unfiltered(&line_refs), 6);
  let mut png = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut png, b"IHDR", &ihdr(1000, 64, 8, 0));
  for piece in zlib.chunks(7) {
    put_chunk(&mut png, b"IDAT", piece);
  }
  put_chunk(&mut png, b"IEND", &[]);
  let image = Image::from_png_bytes(&png).unwrap();
  for y in 0..64 {
    assert_eq!(image.raw_row(y).unwrap(), &lines[y as usize][..]);
  }

  // the same stream missing its last pieces
  let mut cut = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut cut, b"IHDR", &ihdr(1000, 64, 8, 0));
  for piece in zlib.chunks(7).take(zlib.len() / 7 / 2) {
    put_chunk(&mut cut, b"IDAT", piece);
  }
  put_chunk(&mut cut, b"IEND", &[]);
  assert_eq!(
    Image::from_png_bytes(&cut).unwrap_err(),
    ImageError::Decode(DecodeError::NotEnoughImageData)
  );
}

#[test]
fn test_read_errors_keep_their_kind() {
  let png = rgb8_2x1();
  for cut in [0, 8, 20, png.len() - 12] {
    let reader = FailingReader { inner: &png[..cut], kind: ErrorKind::PermissionDenied };
    assert_eq!(Image::decode(reader).unwrap_err(), ImageError::Io(ErrorKind::PermissionDenied));
  }
  let reader = FailingReader { inner: &png[..20], kind: ErrorKind::UnexpectedEof };
  assert_eq!(Image::decode(reader).unwrap_err(), ImageError::TruncatedInput);
}

#[test]
fn test_malformed_ancillary_chunks_warn() {
  let extra = [
    (b"IHDR", &ihdr(9, 9, 8, 0)[..]),
    (b"tRNS", &[0, 0][..]),
    (b"sBIT", &[9, 9, 9][..]),
  ];
  let png = build_png(ihdr(1, 1, 8, 2), &extra, &unfiltered(&[&[10, 20, 30]]));
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::EXPAND | Transforms::SHIFT))
    .unwrap();
  assert_eq!(image.width(), 1);
  assert_eq!(image.color_type(), ColorType::Rgb);
  assert_eq!(image.raw_row(0).unwrap(), &[10, 20, 30]);
  assert_eq!(
    warnings_for(image.decode_id()),
    [
      "extra IHDR chunk ignored",
      "tRNS chunk not usable with a rgb image, ignored",
      "malformed sBIT chunk ignored",
    ]
  );

  // alpha images never take a tRNS
  let png = build_png(ihdr(1, 1, 8, 4), &[(b"tRNS", &[0, 0][..])], &unfiltered(&[&[1, 2]]));
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::EXPAND)).unwrap();
  let warnings = warnings_for(image.decode_id());
  assert!(warnings.iter().any(|w| w.starts_with("tRNS chunk not usable")), "{warnings:?}");
}

#[test]
fn test_duplicate_palette_chunks_warn() {
  let plte: &[u8] = &[255, 0, 0, 0, 255, 0, 0, 0, 255];
  let extra = [
    (b"PLTE", plte),
    (b"PLTE", &[1, 1, 1][..]),
    (b"tRNS", &[0, 0, 0, 0][..]),
    (b"tRNS", &[255][..]),
  ];
  let png = build_png(ihdr(3, 1, 2, 3), &extra, &unfiltered(&[&[0b00_01_10_00]]));
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::EXPAND)).unwrap();
  assert_eq!(image.palette().map(|p| p.len()), Some(3));
  assert_eq!(image.color_type(), ColorType::RgbAlpha);
  let row = image.row_at(0).unwrap();
  assert_eq!(
    row,
    &[
      Pixel::new(1.0, 0.0, 0.0, 0.0),
      Pixel::new(0.0, 1.0, 0.0, 0.0),
      Pixel::new(0.0, 0.0, 1.0, 0.0),
    ]
  );
  let warnings = warnings_for(image.decode_id());
  assert!(warnings.contains(&"extra PLTE chunk ignored".to_string()), "{warnings:?}");
  assert!(warnings.contains(&"extra tRNS chunk ignored".to_string()), "{warnings:?}");
  assert!(
    warnings.iter().any(|w| w.starts_with("tRNS chunk has more entries than the palette")),
    "{warnings:?}"
  );
}

#[test]
fn test_misplaced_palettes_warn() {
  let lines = unfiltered(&[&[7]]);
  let png = build_png(ihdr(1, 1, 8, 0), &[(b"PLTE", &[1, 2, 3][..])], &lines);
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::IDENTITY)).unwrap();
  assert!(image.palette().is_none());
  assert_eq!(warnings_for(image.decode_id()), ["PLTE chunk in a grayscale image ignored"]);

  // a suggested palette after the image data is still kept
  let mut png = Vec::from(PNG_SIGNATURE);
  put_chunk(&mut png, b"IHDR", &ihdr(1, 1, 8, 2));
  let idat = miniz_oxide::deflate::compress_to_vec_zlib(&unfiltered(&[&[1, 2, 3]]), 6);
  put_chunk(&mut png, b"IDAT", &idat);
  put_chunk(&mut png, b"PLTE", &[4, 5, 6]);
  put_chunk(&mut png, b"IEND", &[]);
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::IDENTITY)).unwrap();
  assert_eq!(image.palette(), Some(&[[4, 5, 6]][..]));
  assert_eq!(image.raw_row(0).unwrap(), &[1, 2, 3]);
  assert_eq!(warnings_for(image.decode_id()), ["PLTE chunk after the image data"]);
}

#[test]
fn test_all_filter_types() {
  let filtered = [
    1, 10, 5, // Sub
    2, 1, 1, // Up
    4, 0, 0, // Paeth
    3, 2, 2, // Average
  ];
  let image = Image::from_png_bytes(&build_png(ihdr(2, 4, 8, 0), &[], &filtered)).unwrap();
  let rows: Vec<&[u8]> = (0..4).map(|y| image.raw_row(y).unwrap()).collect();
  assert_eq!(rows, [&[10, 15][..], &[11, 16], &[11, 16], &[7, 13]]);
}

#[test]
fn test_palette_without_expand_is_gray() {
  let image = Image::from_png_bytes_with(&palette2_3x1(false), capturing(Transforms::IDENTITY))
    .unwrap();
  assert_eq!(image.color_type(), ColorType::Palette);
  assert_eq!(image.palette().map(|p| p.len()), Some(3));
  let row = image.row_at(0).unwrap();
  assert_eq!(row, &[Pixel::gray(0.0), Pixel::gray(1.0 / 3.0), Pixel::gray(2.0 / 3.0)]);
  let warnings = warnings_for(image.decode_id());
  assert!(warnings.iter().any(|w| w.contains("gray")), "{warnings:?}");
}

#[test]
fn test_palette_expand() {
  let image = Image::from_png_bytes_with(&palette2_3x1(false), capturing(Transforms::EXPAND))
    .unwrap();
  assert_eq!(image.color_type(), ColorType::Rgb);
  assert_eq!(image.bit_depth(), BitDepth::Eight);
  assert_eq!(image.header().color_type, ColorType::Palette);
  assert_eq!(image.header().bit_depth, BitDepth::Two);
  let row = image.row_at(0).unwrap();
  assert_eq!(
    row,
    &[Pixel::rgb(1.0, 0.0, 0.0), Pixel::rgb(0.0, 1.0, 0.0), Pixel::rgb(0.0, 0.0, 1.0)]
  );
  assert!(warnings_for(image.decode_id()).is_empty());

  let image = Image::from_png_bytes_with(&palette2_3x1(true), capturing(Transforms::EXPAND))
    .unwrap();
  assert_eq!(image.color_type(), ColorType::RgbAlpha);
  let row = image.row_at(0).unwrap();
  assert_eq!(
    row,
    &[Pixel::new(1.0, 0.0, 0.0, 0.0), Pixel::rgb(0.0, 1.0, 0.0), Pixel::rgb(0.0, 0.0, 1.0)]
  );
}

#[test]
fn test_palette_problems() {
  let lines = unfiltered(&[&[0b11_000000]]);
  let missing = build_png(ihdr(1, 1, 2, 3), &[], &lines);
  assert_eq!(
    Image::from_png_bytes(&missing).unwrap_err(),
    ImageError::Decode(DecodeError::BadPalette)
  );

  let malformed = build_png(ihdr(1, 1, 2, 3), &[(b"PLTE", &[1, 2][..])], &lines);
  assert_eq!(
    Image::from_png_bytes(&malformed).unwrap_err(),
    ImageError::Decode(DecodeError::BadPalette)
  );

  // index 3 with a 1 entry palette
  let short = build_png(ihdr(1, 1, 2, 3), &[(b"PLTE", &[9, 9, 9][..])], &lines);
  let image = Image::from_png_bytes_with(&short, capturing(Transforms::EXPAND)).unwrap();
  assert_eq!(image.pixel_at(0, 0), Ok(Pixel::BLACK));
  let warnings = warnings_for(image.decode_id());
  assert!(warnings.iter().any(|w| w.contains("past the end of the palette")), "{warnings:?}");
}

#[test]
fn test_gray_transforms() {
  // 1x1 gray16
  let png = build_png(ihdr(1, 1, 16, 0), &[], &unfiltered(&[&[0x12, 0x34]]));
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::STRIP_16)).unwrap();
  assert_eq!(image.bit_depth(), BitDepth::Eight);
  assert_eq!(image.header().bit_depth, BitDepth::Sixteen);
  assert_eq!(image.raw_row(0).unwrap(), &[0x12]);
  assert_close(image.pixel_at(0, 0).unwrap(), Pixel::gray(18.0 / 255.0));

  // tRNS key color becomes alpha
  let png = build_png(ihdr(2, 1, 8, 0), &[(b"tRNS", &[0, 5][..])], &unfiltered(&[&[5, 9]]));
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::EXPAND)).unwrap();
  assert_eq!(image.color_type(), ColorType::GrayAlpha);
  assert_close(image.pixel_at(0, 0).unwrap(), Pixel::gray_alpha(5.0 / 255.0, 0.0));
  assert_close(image.pixel_at(1, 0).unwrap(), Pixel::gray(9.0 / 255.0));

  // low depth gray is scaled up to 8 bits
  let png = build_png(ihdr(4, 1, 2, 0), &[], &unfiltered(&[&[0b00_01_10_11]]));
  let image = Image::from_png_bytes_with(&png, capturing(Transforms::EXPAND)).unwrap();
  assert_eq!(image.raw_row(0).unwrap(), &[0x00, 0x55, 0xAA, 0xFF]);

  let png = build_png(ihdr(2, 1, 8, 0), &[(b"sBIT", &[4][..])], &unfiltered(&[&[0xF0, 0x30]]));
  let image =
    Image::from_png_bytes_with(&png, capturing(Transforms::SHIFT | Transforms::INVERT_MONO))
      .unwrap();
  assert_eq!(image.raw_row(0).unwrap(), &[0x0, 0xC]);
  assert_eq!(image.pixel_at(0, 0), Ok(Pixel::gray(0.0)));
  assert_eq!(image.pixel_at(1, 0), Ok(Pixel::gray(12.0 / 15.0)));
}

#[test]
fn test_layout_transforms_keep_pixels() {
  let lines = unfiltered(&[&[10, 20, 30, 40, 50, 60, 70, 80]]);
  let png = build_png(ihdr(2, 1, 8, 6), &[], &lines);
  let plain = Image::from_png_bytes(&png).unwrap();
  let t = Transforms::BGR | Transforms::SWAP_ALPHA | Transforms::STRIP_FILLER;
  let swapped = Image::from_png_bytes_with(&png, t.into()).unwrap();
  assert_eq!(swapped.raw_row(0).unwrap(), &[40, 30, 20, 10, 80, 70, 60, 50]);
  assert_eq!(swapped.row_at(0), plain.row_at(0));

  let png = build_png(ihdr(1, 1, 16, 4), &[], &unfiltered(&[&[1, 2, 3, 4]]));
  let plain = Image::from_png_bytes(&png).unwrap();
  let swapped = Image::from_png_bytes_with(&png, Transforms::SWAP_ENDIAN.into()).unwrap();
  assert_eq!(swapped.raw_row(0).unwrap(), &[2, 1, 4, 3]);
  assert_eq!(swapped.row_at(0), plain.row_at(0));

  let png = build_png(ihdr(3, 1, 1, 0), &[], &unfiltered(&[&[0b101_00000]]));
  let plain = Image::from_png_bytes(&png).unwrap();
  assert_eq!(plain.row_at(0).unwrap(), &[Pixel::WHITE, Pixel::BLACK, Pixel::WHITE]);
  for t in [Transforms::PACKING, Transforms::PACKSWAP] {
    let other = Image::from_png_bytes_with(&png, t.into()).unwrap();
    assert_eq!(other.row_at(0), plain.row_at(0));
  }
}

#[test]
fn test_invert_and_strip_alpha() {
  let png = build_png(ihdr(1, 1, 8, 4), &[], &unfiltered(&[&[51, 255]]));
  let image = Image::from_png_bytes_with(&png, Transforms::INVERT_ALPHA.into()).unwrap();
  assert_close(image.pixel_at(0, 0).unwrap(), Pixel::gray_alpha(0.2, 0.0));
  let image = Image::from_png_bytes_with(&png, Transforms::STRIP_ALPHA.into()).unwrap();
  assert_eq!(image.color_type(), ColorType::Gray);
  assert_eq!(image.bytes_per_row(), 1);
  assert_close(image.pixel_at(0, 0).unwrap(), Pixel::gray(0.2));
}

#[test]
fn test_default_warning_sink_can_be_replaced() {
  let previous = set_warning_sink(capture);
  let result = Image::from_png_bytes(&palette2_3x1(false));
  set_warning_sink(previous);
  let image = result.unwrap();
  assert!(!warnings_for(image.decode_id()).is_empty());
}

#[test]
fn test_fixtures() {
  let image = Image::from_png_bytes(&std::fs::read("tests/png/fixtures/rgb16_2x2.png").unwrap())
    .unwrap();
  assert_eq!(image.bit_depth(), BitDepth::Sixteen);
  let pixels: Vec<Pixel> = image.rows().flat_map(|r| r.unwrap().to_vec()).collect();
  let half = 32768.0 / 65535.0;
  let expected = [
    Pixel::rgb(1.0, 0.0, 0.0),
    Pixel::rgb(0.0, 1.0, 0.0),
    Pixel::rgb(0.0, 0.0, 1.0),
    Pixel::gray(half),
  ];
  assert_eq!(pixels, expected);

  let bytes = std::fs::read("tests/png/fixtures/palette4_3x2.png").unwrap();
  let image = Image::from_png_bytes_with(&bytes, capturing(Transforms::EXPAND)).unwrap();
  assert_eq!(image.color_type(), ColorType::RgbAlpha);
  let pixels: Vec<Pixel> = image.rows().flat_map(|r| r.unwrap().to_vec()).collect();
  assert_eq!(pixels.len(), 6);
  assert_eq!(pixels[0], Pixel::new(1.0, 0.0, 0.0, 0.0));
  assert_close(pixels[1], Pixel::new(0.0, 1.0, 0.0, 128.0 / 255.0));
  assert_eq!(pixels[2], Pixel::rgb(0.0, 0.0, 1.0));
  assert_eq!(&pixels[3..], &[Pixel::WHITE, Pixel::WHITE, Pixel::new(1.0, 0.0, 0.0, 0.0)]);

  let image =
    Image::from_png_bytes(&std::fs::read("tests/png/fixtures/gray_alpha8_1x3.png").unwrap())
      .unwrap();
  assert_eq!(image.pixel_at(0, 0), Ok(Pixel::gray_alpha(0.0, 1.0)));
  assert_close(image.pixel_at(0, 1).unwrap(), Pixel::gray_alpha(128.0 / 255.0, 64.0 / 255.0));
  assert_eq!(image.pixel_at(0, 2), Ok(Pixel::gray_alpha(1.0, 0.0)));
}
