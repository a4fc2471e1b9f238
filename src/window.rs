//! Transient analysis and window-control selection.
//!
//! Decides, once per block, how a block's samples are split into 1-4
//! sub-blocks (the decimation pattern) and how short the transient
//! sub-block's analysis window should be (the overlap scale), by
//! descending a binary tree of energy-ratio comparisons over a
//! bandpassed, smoothed, segmented view of the transition between the
//! previous and current block.

use crate::types::{DecimationPattern, SmoothingTaps, WindowControl};

const SEGMENTS: usize = 16;
const LOWPASS_DECAY: f32 = 240.0 / 256.0;
const DC_DECAY: f32 = 252.0 / 256.0;
const MIN_SUB_BLOCK: usize = 64;

#[derive(Clone, Copy, Default)]
struct SegmentStats {
    sum_weight: f64,
    sum_weighted_log: f64,
}

/// Picks a window control word for one block.
///
/// `current`/`previous` are channel-planar slices of `n` samples each
/// (previous may be all zeros for the very first block). `taps` carries
/// the low-pass/DC-removal IIR state between calls. When
/// `window_switching` is disabled the block always reports
/// [`DecimationPattern::NONE`] with a default overlap scale, and `taps`
/// is left untouched.
pub fn select_window(
    current: &[&[f32]],
    previous: &[&[f32]],
    sample_rate: u32,
    window_switching: bool,
    taps: &mut SmoothingTaps,
) -> WindowControl {
    let n = current.first().map(|c| c.len()).unwrap_or(0);
    if !window_switching || n == 0 {
        return WindowControl::steady(default_overlap_scale());
    }

    let mut energy = transition_energy(current, previous, n);
    smooth(&mut energy, taps);
    let stats = segment_stats(&energy);

    let (decisions, winning_ratio, final_sub_block) = binary_descent(&stats, n);
    let overlap_scale = resolve_overlap_scale(final_sub_block, sample_rate, winning_ratio);

    WindowControl {
        decimation: DecimationPattern::from_split_decisions(&decisions),
        overlap_scale,
    }
}

fn default_overlap_scale() -> u8 {
    0
}

/// Bandpass `H(z) = z - z^-1`, squared and summed across channels, over the
/// full `2n`-sample transition buffer: all `n` samples of `previous`
/// (the entire last block, carried for exactly this purpose) followed by
/// all `n` samples of `current`. Every sample in the `2n` span is real
/// signal data (no zero padding), so decimating by 4 yields `n/2` energy
/// samples that stay sensitive to a transient anywhere in the block,
/// including late in `current`.
fn transition_energy(current: &[&[f32]], previous: &[&[f32]], n: usize) -> Vec<f32> {
    let channels = current.len();
    let total = 2 * n;

    let mut combined = vec![vec![0.0f32; total]; channels];
    for ch in 0..channels {
        let prev = previous[ch];
        let cur = current[ch];
        debug_assert_eq!(prev.len(), n);
        debug_assert_eq!(cur.len(), n);
        combined[ch][..n].copy_from_slice(prev);
        combined[ch][n..].copy_from_slice(cur);
    }

    let out_len = n / 2;
    let mut energy = vec![0.0f32; out_len];
    for (out_i, e) in energy.iter_mut().enumerate() {
        let i = out_i * 4 + 2;
        let mut acc = 0.0f32;
        for ch in combined.iter().take(channels) {
            let d = ch[i] - ch[i - 2];
            acc += d * d;
        }
        *e = acc;
    }
    energy
}

fn smooth(energy: &mut [f32], taps: &mut SmoothingTaps) {
    for e in energy.iter_mut() {
        taps.lowpass = taps.lowpass * LOWPASS_DECAY + *e * (1.0 - LOWPASS_DECAY);
        taps.dc = taps.dc * DC_DECAY + taps.lowpass * (1.0 - DC_DECAY);
        *e = (taps.lowpass - taps.dc).max(0.0);
    }
}

fn segment_stats(energy: &[f32]) -> [SegmentStats; SEGMENTS] {
    let mut segs = [SegmentStats::default(); SEGMENTS];
    for (i, &d) in energy.iter().enumerate() {
        let seg = i % SEGMENTS;
        let w = (d as f64) * (d as f64);
        let ln_d = crate::math::safe_ln(d) as f64;
        segs[seg].sum_weight += w;
        segs[seg].sum_weighted_log += w * ln_d;
    }
    segs
}

fn weighted_mean(segs: &[SegmentStats], lo: usize, hi: usize) -> f64 {
    let mut sw = 0.0;
    let mut swl = 0.0;
    for s in &segs[lo..hi] {
        sw += s.sum_weight;
        swl += s.sum_weighted_log;
    }
    if sw > 0.0 {
        swl / sw
    } else {
        0.0
    }
}

/// Descends the LL/L/M/R quad-comparison tree, returning the split
/// decisions (false = continued into L, true = continued into M), the
/// winning log-ratio at the point the descent stopped, and the resulting
/// transient sub-block size.
fn binary_descent(segs: &[SegmentStats; SEGMENTS], n: usize) -> (Vec<bool>, f64, usize) {
    let mut decisions = Vec::new();
    let mut start = 0usize;
    let mut region_len = SEGMENTS;
    let mut sub_block_size = n;
    let mut winning_ratio = 0.0f64;

    loop {
        let group = region_len / 4;
        if group == 0 || sub_block_size / 2 < MIN_SUB_BLOCK {
            break;
        }
        let ll = weighted_mean(segs, start, start + group);
        let l = weighted_mean(segs, start + group, start + 2 * group);
        let m = weighted_mean(segs, start + 2 * group, start + 3 * group);
        let r = weighted_mean(segs, start + 3 * group, start + 4 * group);

        let diffs = [l - ll, m - l, r - m];
        let (which, &largest) = diffs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        winning_ratio = largest;

        if largest <= std::f64::consts::LN_2 || which == 2 {
            break;
        }

        let bit = which == 1;
        start = if bit { start + group } else { start };
        decisions.push(bit);
        region_len = 2 * group;
        sub_block_size /= 2;
    }

    (decisions, winning_ratio, sub_block_size)
}

fn resolve_overlap_scale(sub_block_size: usize, sample_rate: u32, winning_ratio: f64) -> u8 {
    let log2_sb = (sub_block_size.max(1) as f64).log2();
    let rate_ln = (sample_rate.max(1) as f64).ln();
    let raw = log2_sb + 4.32 - 1.44 * (rate_ln - winning_ratio);
    let mut s = raw.round().clamp(0.0, 7.0) as u8;
    while s > 0 && (sub_block_size >> s) < 16 {
        s -= 1;
    }
    s
}
