#![allow(clippy::needless_range_loop)]

//! Ultra-low-complexity perceptual audio codec, encoder core.
//!
//! Covers the analysis and coding pipeline only: transient-driven window
//! selection, an FFT-accelerated MDCT/MDST kernel, per-coefficient
//! psychoacoustic masking, noise-floor/HF-extension estimation,
//! quantizer-zone partitioning, CBR/VBR rate control, and a nibble-packed
//! bitstream writer. Decoding, file framing, and CLI plumbing live in
//! separate crates that link against this one.

pub mod bitstream;
pub mod encoder;
pub mod error;
pub mod fourier;
pub mod math;
pub mod noise;
pub mod psychoacoustic;
pub mod quantizer;
pub mod rate;
pub mod types;
pub mod window;

pub use encoder::Encoder;
pub use error::{EncoderError, Result};
pub use types::{EncoderFlags, RateMode, WindowControl};
