//! Non-fatal decode warnings.
//!
//! When the decoder hits something wrong that it can work around (a bad CRC on
//! an ancillary chunk, leftover compressed data, a palette index past the end
//! of the palette, and so on) it keeps going and reports a warning through a
//! [`WarningSink`].
//!
//! Each decode uses the sink from its
//! [`DecodeOptions`](crate::DecodeOptions), or if that's `None` then the
//! process-wide default sink at the moment the decode started. The starting
//! default is [`log_warning`].

use core::{
  fmt,
  sync::atomic::{AtomicU64, Ordering},
};
use std::sync::{PoisonError, RwLock};

/// Identifies one decode, so that warnings from overlapping decodes can be
/// told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct DecodeId(u64);
impl DecodeId {
  /// A new id, never equal to any previous id from this process.
  #[inline]
  #[must_use]
  pub(crate) fn next() -> Self {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    Self(NEXT.fetch_add(1, Ordering::Relaxed))
  }

  /// The number of this id.
  #[inline]
  #[must_use]
  pub const fn get(self) -> u64 {
    self.0
  }
}
impl fmt::Display for DecodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "png#{}", self.0)
  }
}

/// Gets each warning message along with the decode that caused it.
pub type WarningSink = fn(&str, DecodeId);

/// The starting default sink, sends the warning to [`log::warn!`].
pub fn log_warning(message: &str, id: DecodeId) {
  log::warn!("{id}: {message}");
}

static DEFAULT_SINK: RwLock<WarningSink> = RwLock::new(log_warning as WarningSink);

/// Replaces the process-wide default sink, returning the old one.
///
/// Decodes already running keep the sink they started with.
pub fn set_warning_sink(sink: WarningSink) -> WarningSink {
  let mut guard = DEFAULT_SINK.write().unwrap_or_else(PoisonError::into_inner);
  core::mem::replace(&mut *guard, sink)
}

/// The current process-wide default sink.
#[must_use]
pub fn warning_sink() -> WarningSink {
  *DEFAULT_SINK.read().unwrap_or_else(PoisonError::into_inner)
}
