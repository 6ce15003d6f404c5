#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! Decodes PNG data into a grid of normalized float pixels.
//!
//! * The container side (signature, chunks, inflate, unfiltering) runs all at
//!   once when an [`Image`] is made.
//! * The stored rows are only unpacked into [`Pixel`] values when they're
//!   first accessed, and the result is cached.
//!
//! ```no_run
//! # fn main() -> Result<(), pngpixels::ImageError> {
//! # let bytes: &[u8] = &[];
//! use pngpixels::{DecodeOptions, Image, Transforms};
//!
//! let opts = DecodeOptions { transforms: Transforms::EXPAND, ..Default::default() };
//! let image = Image::from_png_bytes_with(bytes, opts)?;
//! for row in image.rows() {
//!   for pixel in row? {
//!     let [r, g, b, a] = pixel.to_array();
//!   }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//! * `alloc`: the owned-output helpers of the unpacker and transforms.
//! * `std`: [`Image`], decode options, and the warning sink.
//! * `miniz_oxide`: decoding PNG data, which needs Zlib inflate.
//!
//! Without `std` the crate still has the pixel types, the in-memory chunk
//! helpers in [`png`], and [`unpack_row_into`].

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod pixel;
pub use pixel::*;

mod unpack;
pub use unpack::*;

mod transform;
pub use transform::Transforms;

pub mod png;
pub use png::is_png;

#[cfg(feature = "std")]
mod warning;
#[cfg(feature = "std")]
pub use warning::*;

#[cfg(feature = "std")]
mod decoder;
#[cfg(feature = "std")]
pub use decoder::*;

#[cfg(all(feature = "std", feature = "miniz_oxide"))]
mod engine;

#[cfg(feature = "std")]
mod image;
#[cfg(feature = "std")]
pub use image::*;
