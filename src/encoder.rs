//! Encoder state orchestrator.
//!
//! Owns every buffer carried across blocks (lap samples, smoothing taps,
//! the trailing overlap length of each channel's last sub-block) plus
//! the transform scratch reused within a single block, and drives one
//! block through window
//! selection, the Fourier kernel, psychoacoustic analysis, noise
//! analysis, rate control, and bitstream serialization in order — the
//! same top-to-bottom pipeline shape as the teacher's
//! `lossy::encoder::TransformEncoder::encode_to_flo`, generalized from a
//! single fixed transform size to per-block adaptive decimation.

use crate::bitstream::{build_channel_plan, max_block_bits, max_kbps, serialize_block};
use crate::error::{EncoderError, Result};
use crate::fourier::Fourier;
use crate::math::safe_ln;
use crate::noise::NoiseAnalyzer;
use crate::psychoacoustic::analyze as analyze_psychoacoustics;
use crate::rate::{select_cbr, select_vbr};
use crate::types::{
    EncoderFlags, RateMode, SmoothingTaps, MAX_BLOCK_SIZE, MAX_SAMPLE_RATE, MIN_BLOCK_SIZE,
    MIN_SAMPLE_RATE,
};
use crate::window::select_window;

/// Per-channel state carried between blocks: the previous block's raw
/// samples, used both as the lap tail folded into each sub-block's MDCT
/// frame and as the window controller's transition-energy input, plus
/// the overlap length of the previous block's last sub-block so this
/// block's first sub-block can match it exactly (the universal "right
/// overlap of block k equals left overlap of block k+1" invariant).
struct ChannelState {
    last_block: Vec<f32>,
    taps: SmoothingTaps,
    trailing_overlap: usize,
}

/// Drives the encoder pipeline for one audio stream.
///
/// Construct once per stream with [`Encoder::new`], then call
/// [`Encoder::encode_block_cbr`] or [`Encoder::encode_block_vbr`] once per
/// block of `n_chan * block_size` channel-planar samples, in strict
/// sample order.
pub struct Encoder {
    rate_hz: u32,
    n_chan: u8,
    block_size: u32,
    flags: EncoderFlags,
    fourier: Fourier,
    channels: Vec<ChannelState>,
}

impl Encoder {
    pub fn new(rate_hz: u32, n_chan: u8, block_size: u32, flags: EncoderFlags) -> Result<Self> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate_hz) {
            return Err(EncoderError::InvalidSampleRate(rate_hz));
        }
        if n_chan == 0 {
            return Err(EncoderError::InvalidChannelCount(n_chan as u32));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) || !block_size.is_power_of_two()
        {
            return Err(EncoderError::InvalidBlockSize(block_size));
        }

        let channels = (0..n_chan)
            .map(|_| ChannelState {
                last_block: vec![0.0f32; block_size as usize],
                taps: SmoothingTaps::default(),
                trailing_overlap: block_size as usize / 2,
            })
            .collect();

        Ok(Encoder {
            rate_hz,
            n_chan,
            block_size,
            flags,
            fourier: Fourier::new(),
            channels,
        })
    }

    /// Encodes one block at a constant-bitrate target, writing the
    /// serialized block into `dst` and returning its length in bits.
    ///
    /// `src` is channel-planar: `n_chan` consecutive runs of
    /// `block_size` samples each.
    pub fn encode_block_cbr(&mut self, dst: &mut [u8], src: &[f32], kbps: f32) -> Result<usize> {
        self.encode_block(dst, src, RateMode::Cbr { kbps })
    }

    /// Encodes one block at a fixed quality target in `(0, 100]`; higher
    /// keeps more coefficients (see [`crate::rate::select_vbr`]).
    pub fn encode_block_vbr(&mut self, dst: &mut [u8], src: &[f32], quality: f32) -> Result<usize> {
        self.encode_block(dst, src, RateMode::Vbr { quality })
    }

    fn encode_block(&mut self, dst: &mut [u8], src: &[f32], mode: RateMode) -> Result<usize> {
        let n = self.block_size as usize;
        let expected = n * self.n_chan as usize;
        if src.len() != expected {
            return Err(EncoderError::SourceLengthMismatch {
                expected,
                actual: src.len(),
            });
        }

        let current: Vec<&[f32]> = (0..self.n_chan as usize)
            .map(|c| &src[c * n..(c + 1) * n])
            .collect();
        // Owned copies, not references: the sub-block loop below needs to
        // update `self.channels[ch].trailing_overlap` while still reading
        // this block's previous-tail, which a borrow into `self.channels`
        // would forbid.
        let previous: Vec<Vec<f32>> = self
            .channels
            .iter()
            .map(|c| c.last_block.clone())
            .collect();

        // Window selection uses a single shared transient detector fed
        // from all channels, but each channel's smoothing taps are
        // distinct (matching how stereo content can have correlated but
        // not identical transients). We run the detector once per
        // channel and combine by picking the most decimated result,
        // which is always safe for every channel's Fourier call since a
        // finer decimation implies a (non-strict) superset of sub-block
        // boundaries most channels can also use without re-deriving
        // per-channel overlap scales.
        let mut window = crate::types::WindowControl::steady(0);
        for (ch, state) in self.channels.iter_mut().enumerate() {
            let w = select_window(
                &[current[ch]],
                &[previous[ch].as_slice()],
                self.rate_hz,
                self.flags.window_switching,
                &mut state.taps,
            );
            if w.decimation.sub_block_count() > window.decimation.sub_block_count() {
                window = w;
            }
        }

        let sub_blocks = window.decimation.sub_blocks(n);

        let mut channel_coeffs: Vec<Vec<f32>> = Vec::with_capacity(self.n_chan as usize);
        let mut channel_mdst: Vec<Vec<f32>> = Vec::with_capacity(self.n_chan as usize);

        for ch in 0..self.n_chan as usize {
            let mut coeffs = Vec::with_capacity(n / 2);
            let mut mdst = Vec::with_capacity(n / 2);
            let mut offset = 0usize;
            // Threads the lap through sub-blocks: the first sub-block's
            // left overlap must match the previous block's trailing
            // overlap exactly, and every later sub-block's left overlap
            // comes from the sub-block immediately before it in this
            // same block, never from the stale previous-block tail.
            let mut prior_overlap = self.channels[ch].trailing_overlap;
            for (sb_idx, &sb_size) in sub_blocks.as_slice().iter().enumerate() {
                let overlap = if sb_idx == sub_blocks.transient_index {
                    (sb_size >> window.overlap_scale).max(1)
                } else {
                    sb_size / 2
                };
                let tail = if sb_idx == 0 {
                    overlap.min(prior_overlap).min(previous[ch].len())
                } else {
                    overlap.min(prior_overlap)
                };

                let mut frame = vec![0.0f32; sb_size];
                if sb_idx == 0 {
                    let prev = &previous[ch];
                    frame[..tail].copy_from_slice(&prev[prev.len() - tail..]);
                } else {
                    frame[..tail].copy_from_slice(&current[ch][offset - tail..offset]);
                }
                let take = sb_size - tail;
                frame[tail..].copy_from_slice(&current[ch][offset..offset + take]);

                // The window's transition length must match the lap
                // actually carried into `frame`, not this sub-block's own
                // nominal overlap: per spec.md §4.1, a transition between
                // differing sub-block sizes uses an overlap equal to the
                // smaller of the two adjacent overlaps, and `tail` is
                // exactly that minimum. Using the nominal `overlap` here
                // would taper genuine new samples in `[tail, overlap)` as
                // if they were part of the lapped region.
                let sub_coeffs = self.fourier.mdct(sb_size, tail, &frame);
                let sub_mdst = self.fourier.mdst(sb_size, tail, &frame);
                coeffs.extend(sub_coeffs);
                mdst.extend(sub_mdst);
                offset += sb_size;
                prior_overlap = overlap;
            }
            channel_coeffs.push(coeffs);
            channel_mdst.push(mdst);
            self.channels[ch].trailing_overlap = prior_overlap;
        }

        let rate_hz = self.rate_hz;
        let flags = self.flags;
        let max_k = max_kbps(self.block_size, self.n_chan as u32, rate_hz);
        let max_bits = max_block_bits(self.block_size, self.n_chan as u32);

        let mut plans = Vec::with_capacity(self.n_chan as usize);
        for ch in 0..self.n_chan as usize {
            let coeffs = &channel_coeffs[ch];
            let energy: Vec<f32> = coeffs.iter().map(|&c| c * c).collect();
            let log_amp: Vec<f32> = coeffs.iter().map(|&c| safe_ln(c.abs())).collect();
            let analysis =
                analyze_psychoacoustics(&energy, flags.noise_coding, flags.psychoacoustics, 0.0);

            let noise = if flags.noise_coding {
                Some(NoiseAnalyzer::new(coeffs, &channel_mdst[ch], rate_hz))
            } else {
                None
            };

            let selection = match mode {
                RateMode::Cbr { kbps } => {
                    let per_channel_bits = max_bits / self.n_chan as usize;
                    let target_bits = ((kbps / max_k.max(f32::EPSILON)) * per_channel_bits as f32)
                        .round()
                        .max(0.0) as usize;
                    select_cbr(
                        coeffs,
                        &analysis.importance,
                        &log_amp,
                        &energy,
                        target_bits.min(per_channel_bits),
                        kbps,
                        max_k,
                        noise.as_ref(),
                    )
                }
                RateMode::Vbr { quality } => {
                    select_vbr(coeffs, &analysis.importance, &log_amp, &energy, quality)
                }
            };

            let plan = build_channel_plan(&selection.coeffs, &selection.zones, noise.as_ref());
            plans.push(plan);
        }

        let (bytes, bits) = serialize_block(window, &plans);
        if dst.len() < bytes.len() {
            return Err(EncoderError::DestinationTooSmall {
                needed: bytes.len(),
                provided: dst.len(),
            });
        }
        dst[..bytes.len()].copy_from_slice(&bytes);

        for (ch, state) in self.channels.iter_mut().enumerate() {
            state.last_block.copy_from_slice(current[ch]);
        }

        Ok(bits)
    }
}
