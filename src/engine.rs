//! Pulls a PNG out of a reader and turns it into stored rows.
//!
//! The steps are:
//! 1. Check the signature.
//! 2. Read chunks until `IEND`, keeping the header, palette, transparency,
//!    significant bits, and image data. Other ancillary chunks are skipped.
//! 3. Inflate the image data with `miniz_oxide`.
//! 4. Unfilter the scanlines.
//! 5. Run each scanline through the requested transforms.

use alloc::{boxed::Box, format, vec::Vec};
use std::io::Read;

use log::{debug, trace};
use miniz_oxide::inflate::{
  core::{
    decompress,
    inflate_flags::{
      TINFL_FLAG_HAS_MORE_INPUT, TINFL_FLAG_IGNORE_ADLER32, TINFL_FLAG_PARSE_ZLIB_HEADER,
      TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF,
    },
    DecompressorOxide,
  },
  TINFLStatus,
};

use crate::{
  error::{DecodeError, ImageError},
  decoder::DecodeOptions,
  pixel::ColorType,
  png::{chunk_crc, is_png, sBIT, tRNS, unfilter_lines, ChunkType, Header, PLTE},
  transform::{RowTransformer, TransformInputs, Transforms},
  unpack::RowFormat,
  warning::{DecodeId, WarningSink},
};

/// Largest chunk length allowed by the format.
const MAX_CHUNK_LEN: u32 = (1 << 31) - 1;

/// The first size the inflate buffer gets, it doubles from there.
const INFLATE_START_LEN: usize = 32 * 1024;

/// Everything the decode produced.
pub(crate) struct Decoded {
  pub id: DecodeId,
  pub sink: WarningSink,
  pub header: Header,
  pub row_format: RowFormat,
  pub rows: Vec<Box<[u8]>>,
  pub palette: Vec<[u8; 3]>,
}

/// Decodes a whole PNG from the reader.
///
/// Reading stops right after the `IEND` chunk, anything past that is left in
/// the reader.
pub(crate) fn decode<R: Read>(reader: R, options: &DecodeOptions) -> Result<Decoded, ImageError> {
  Engine::new(reader, options).run()
}

/// The state of one decode.
///
/// All buffers live here and get dropped together however the decode ends.
struct Engine<'o, R> {
  reader: R,
  options: &'o DecodeOptions,
  id: DecodeId,
  sink: WarningSink,
  header: Option<Header>,
  palette: Option<Vec<[u8; 3]>>,
  trns: Option<Vec<u8>>,
  sbit: Option<Vec<u8>>,
  idat: Vec<Vec<u8>>,
}
impl<'o, R: Read> Engine<'o, R> {
  fn new(reader: R, options: &'o DecodeOptions) -> Self {
    Self {
      reader,
      options,
      id: DecodeId::next(),
      sink: options.sink(),
      header: None,
      palette: None,
      trns: None,
      sbit: None,
      idat: Vec::new(),
    }
  }

  #[inline]
  fn warn(&self, message: &str) {
    (self.sink)(message, self.id);
  }

  fn run(mut self) -> Result<Decoded, ImageError> {
    self.read_signature()?;
    let header = self.read_chunks()?;
    let mut filtered = self.inflate(&header)?;
    unfilter_lines(
      &mut filtered,
      header.bytes_per_scanline(),
      header.height,
      header.filter_chunk_size(),
    )?;
    let (row_format, rows) = self.transform_rows(&header, &filtered)?;
    Ok(Decoded {
      id: self.id,
      sink: self.sink,
      header,
      row_format,
      rows,
      palette: self.palette.take().unwrap_or_default(),
    })
  }

  /// Reads exactly 8 bytes (fewer if the reader ends first).
  fn read_signature(&mut self) -> Result<(), ImageError> {
    let mut signature = Vec::with_capacity(8);
    self.reader.by_ref().take(8).read_to_end(&mut signature)?;
    if is_png(&signature) {
      Ok(())
    } else {
      Err(ImageError::NotAPng)
    }
  }

  fn read_u32(&mut self) -> Result<u32, ImageError> {
    let mut word = [0_u8; 4];
    self.reader.read_exact(&mut word)?;
    Ok(u32::from_be_bytes(word))
  }

  /// Reads the length, type, data, and CRC of the next chunk.
  fn read_chunk(&mut self) -> Result<(ChunkType, Vec<u8>, u32), ImageError> {
    let len = self.read_u32()?;
    if len > MAX_CHUNK_LEN {
      return Err(DecodeError::ChunkTooLong.into());
    }
    let chunk_type = ChunkType(self.read_u32()?.to_be_bytes());
    let mut data = Vec::new();
    self.reader.by_ref().take(u64::from(len)).read_to_end(&mut data)?;
    if data.len() != len as usize {
      return Err(ImageError::TruncatedInput);
    }
    let declared_crc = self.read_u32()?;
    Ok((chunk_type, data, declared_crc))
  }

  /// Walks the chunks up to `IEND`, giving the header.
  fn read_chunks(&mut self) -> Result<Header, ImageError> {
    loop {
      let (chunk_type, data, declared_crc) = self.read_chunk()?;
      trace!("{}: chunk {:?}, {} bytes", self.id, chunk_type, data.len());
      if self.header.is_none() && chunk_type != ChunkType::IHDR {
        return Err(DecodeError::FirstChunkNotIHDR.into());
      }
      if self.options.verify_crc && chunk_crc(chunk_type, &data) != declared_crc {
        if chunk_type.is_critical() {
          return Err(DecodeError::CriticalChunkCrc(chunk_type.0).into());
        }
        self.warn(&format!("CRC mismatch in {} chunk, skipped it", chunk_type.as_str()));
        continue;
      }
      match chunk_type {
        ChunkType::IHDR => self.on_header(&data)?,
        ChunkType::PLTE => self.on_palette(data)?,
        ChunkType::IDAT => self.idat.push(data),
        ChunkType::IEND => break,
        ChunkType::tRNS => self.on_transparency(data),
        ChunkType::sBIT => self.on_significant_bits(data),
        other if other.is_critical() => {
          return Err(DecodeError::UnknownCriticalChunk(other.0).into());
        }
        other => trace!("{}: skipping ancillary chunk {:?}", self.id, other),
      }
    }

    let header = self.header.ok_or(DecodeError::FirstChunkNotIHDR)?;
    if self.idat.is_empty() {
      return Err(DecodeError::NoImageData.into());
    }
    if header.color_type == ColorType::Palette && self.palette.is_none() {
      return Err(DecodeError::BadPalette.into());
    }
    Ok(header)
  }

  fn on_header(&mut self, data: &[u8]) -> Result<(), ImageError> {
    if self.header.is_some() {
      self.warn("extra IHDR chunk ignored");
      return Ok(());
    }
    let header = Header::try_from(data)?;
    debug!("{}: {:?}", self.id, header);
    if header.width > self.options.max_width || header.height > self.options.max_height {
      return Err(DecodeError::DimensionsTooLarge.into());
    }
    if header.is_interlaced {
      return Err(DecodeError::Interlaced.into());
    }
    self.header = Some(header);
    Ok(())
  }

  fn on_palette(&mut self, data: Vec<u8>) -> Result<(), ImageError> {
    let color_type = self.header.map(|h| h.color_type).unwrap_or(ColorType::Gray);
    if self.palette.is_some() {
      self.warn("extra PLTE chunk ignored");
      return Ok(());
    }
    if !color_type.has_color() {
      self.warn("PLTE chunk in a grayscale image ignored");
      return Ok(());
    }
    if !self.idat.is_empty() {
      self.warn("PLTE chunk after the image data");
    }
    match PLTE::try_from(data.as_slice()) {
      Ok(plte) => {
        self.palette = Some(plte.entries().to_vec());
        Ok(())
      }
      Err(_) if color_type == ColorType::Palette => Err(DecodeError::BadPalette.into()),
      Err(_) => {
        // it's only a suggested palette for a truecolor image.
        self.warn("malformed PLTE chunk ignored");
        Ok(())
      }
    }
  }

  fn on_transparency(&mut self, data: Vec<u8>) {
    let color_type = self.header.map(|h| h.color_type).unwrap_or(ColorType::Gray);
    let ok = match color_type {
      ColorType::Palette => self.palette.is_some() && !data.is_empty(),
      ColorType::Gray | ColorType::Rgb => tRNS::from(data.as_slice()).key_for(color_type).is_some(),
      ColorType::GrayAlpha | ColorType::RgbAlpha => false,
    };
    if self.trns.is_some() {
      self.warn("extra tRNS chunk ignored");
    } else if !ok {
      self.warn(&format!("tRNS chunk not usable with a {color_type} image, ignored"));
    } else {
      self.trns = Some(data);
    }
  }

  fn on_significant_bits(&mut self, data: Vec<u8>) {
    match self.header {
      Some(h) if h.color_type == ColorType::Palette => {
        // the palette entries are always 8 bit, nothing to shift.
      }
      Some(h) if sBIT::from(data.as_slice()).channel_bits(h.color_type, h.bit_depth).is_none() => {
        self.warn("malformed sBIT chunk ignored");
      }
      _ => self.sbit = Some(data),
    }
  }

  /// Inflates all of the image data, giving the filtered scanlines.
  ///
  /// The output buffer only grows as data comes out of the stream, and never
  /// past what the header says is needed.
  fn inflate(&mut self, header: &Header) -> Result<Vec<u8>, ImageError> {
    let required = header.zlib_decompression_requirement()?;
    let mut buffer: Vec<u8> = Vec::new();
    grow_buffer(&mut buffer, required)?;
    let mut state: Box<DecompressorOxide> = Box::default();
    let mut written = 0;
    let mut finished = false;
    let idat = core::mem::take(&mut self.idat);
    let mut chunks = idat.iter().peekable();
    'chunks: while let Some(chunk) = chunks.next() {
      let mut flags = TINFL_FLAG_PARSE_ZLIB_HEADER | TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF;
      if !self.options.verify_crc {
        flags |= TINFL_FLAG_IGNORE_ADLER32;
      }
      if chunks.peek().is_some() {
        flags |= TINFL_FLAG_HAS_MORE_INPUT;
      }
      let mut input = chunk.as_slice();
      loop {
        let (status, read, wrote) = decompress(&mut *state, input, &mut buffer, written, flags);
        input = &input[read..];
        written += wrote;
        match status {
          TINFLStatus::Done => {
            finished = true;
            break 'chunks;
          }
          TINFLStatus::NeedsMoreInput => break,
          TINFLStatus::HasMoreOutput if buffer.len() < required => {
            grow_buffer(&mut buffer, required)?;
          }
          TINFLStatus::HasMoreOutput => {
            self.warn("extra compressed data after the last scanline ignored");
            finished = true;
            break 'chunks;
          }
          TINFLStatus::FailedCannotMakeProgress => {
            return Err(DecodeError::NotEnoughImageData.into());
          }
          status => {
            debug!("{}: inflate failed: {:?}", self.id, status);
            return Err(DecodeError::Inflate.into());
          }
        }
      }
    }
    if !finished || written < required {
      return Err(DecodeError::NotEnoughImageData.into());
    }
    Ok(buffer)
  }

  fn transform_rows(
    &self, header: &Header, filtered: &[u8],
  ) -> Result<(RowFormat, Vec<Box<[u8]>>), ImageError> {
    let transforms = self.options.transforms;
    let source = RowFormat::new(header.bit_depth, header.color_type);
    if header.color_type == ColorType::Palette && !transforms.contains(Transforms::EXPAND) {
      self.warn(
        "palette indexes are exposed as gray levels, use Transforms::EXPAND for the colors",
      );
    }

    let palette = self.palette.as_deref();
    let trns = self.trns.as_deref().map(tRNS::from);
    let mut palette_alphas = None;
    if let (Some(entries), Some(trns)) = (palette, trns) {
      if header.color_type == ColorType::Palette {
        let alphas = trns.to_alphas();
        if alphas.len() > entries.len() {
          self.warn("tRNS chunk has more entries than the palette, extras ignored");
        }
        palette_alphas = Some(&alphas[..alphas.len().min(entries.len())]);
      }
    }
    let inputs = TransformInputs {
      palette,
      palette_alphas,
      trns_key: trns.and_then(|t| t.key_for(header.color_type)),
      sbit: self
        .sbit
        .as_deref()
        .and_then(|s| sBIT::from(s).channel_bits(header.color_type, header.bit_depth)),
    };
    let transformer = RowTransformer::new(transforms, source, inputs);

    let bytes_per_line = header.bytes_per_scanline() + 1;
    let mut rows = Vec::with_capacity(header.height as usize);
    let mut samples = Vec::new();
    let mut out = Vec::new();
    let mut bad_indexes = 0_usize;
    for line in filtered.chunks_exact(bytes_per_line).take(header.height as usize) {
      let scanline = &line[1..];
      if transforms.is_identity() {
        rows.push(Box::from(scanline));
      } else {
        let (_, bad) = transformer.transform_row(scanline, header.width, &mut samples, &mut out)?;
        bad_indexes += bad;
        rows.push(Box::from(out.as_slice()));
      }
    }
    if bad_indexes > 0 {
      self.warn(&format!("{bad_indexes} palette indexes past the end of the palette, used black"));
    }
    Ok((transformer.output_format(), rows))
  }
}

impl<R> Drop for Engine<'_, R> {
  fn drop(&mut self) {
    trace!("{}: decode state released", self.id);
  }
}

/// Doubles the buffer, never past `limit`.
fn grow_buffer(buffer: &mut Vec<u8>, limit: usize) -> Result<(), ImageError> {
  let new_len = buffer.len().saturating_mul(2).clamp(INFLATE_START_LEN.min(limit), limit);
  buffer.try_reserve_exact(new_len - buffer.len()).map_err(|_| DecodeError::AllocationFailed)?;
  buffer.resize(new_len, 0);
  Ok(())
}
