//! Error type for the encoder core.
//!
//! The teacher crate reports failures as a bare `Result<T, String>`
//! (`core/types.rs::FloResult`). This crate's surface is narrow enough
//! (four failure modes, all caller-visible at construction or per-block
//! time) that a closed enum is worth the extra type over a string, while
//! keeping the same no-dependency style: no `thiserror`, just a hand-written
//! `Display`/`Error` impl.

use std::fmt;

/// Failure reported by [`crate::Encoder::new`] or a per-block encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderError {
    /// `rate_hz` outside the supported `[8000, 96000]` range.
    InvalidSampleRate(u32),
    /// `n_chan` is zero.
    InvalidChannelCount(u32),
    /// `block_size` is not a power of two in `[256, 8192]`.
    InvalidBlockSize(u32),
    /// `src` did not contain `n_chan * block_size` samples.
    SourceLengthMismatch { expected: usize, actual: usize },
    /// `dst` is smaller than the bytes this block actually produced.
    DestinationTooSmall { needed: usize, provided: usize },
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EncoderError::InvalidSampleRate(hz) => write!(
                f,
                "sample rate {hz} Hz is outside the supported range [8000, 96000]"
            ),
            EncoderError::InvalidChannelCount(c) => {
                write!(f, "channel count {c} must be at least 1")
            }
            EncoderError::InvalidBlockSize(n) => write!(
                f,
                "block size {n} must be a power of two in [256, 8192]"
            ),
            EncoderError::SourceLengthMismatch { expected, actual } => write!(
                f,
                "source buffer has {actual} samples, expected {expected}"
            ),
            EncoderError::DestinationTooSmall { needed, provided } => write!(
                f,
                "destination buffer too small: need {needed} bytes, got {provided}"
            ),
        }
    }
}

impl std::error::Error for EncoderError {}

/// Convenience alias matching the teacher crate's `FloResult` naming.
pub type Result<T> = std::result::Result<T, EncoderError>;
