//! Quantizer-zone partitioning.
//!
//! Walks a channel's coefficients in band order, growing a zone while an
//! incrementally-updated weighted mean log-amplitude stays within a
//! rate-dependent threshold of the next band, then picks the smallest
//! power-of-two quantizer scale that keeps every coefficient in a zone
//! representable as a signed nibble.

use crate::types::{QuantizerZone, MAX_ZONES_PER_CHANNEL};

/// Zone-split threshold in Nepers: widens as the requested rate
/// approaches (or exceeds) the block's maximum achievable rate, so a
/// CBR request near the ceiling keeps finer, more numerous zones.
pub fn delta_threshold(kbps: f32, max_kbps: f32) -> f32 {
    let ratio = if max_kbps > 0.0 { kbps / max_kbps } else { 0.0 };
    4.608 * (2.0 - ratio).max(1.0)
}

/// Partitions `coeffs` (one channel's concatenated per-sub-block
/// coefficients, in band order) into at most
/// [`MAX_ZONES_PER_CHANNEL`] zones and picks each zone's quantizer
/// exponent. `log_amp`/`energy` are parallel per-coefficient arrays:
/// `ln(|coeff|)` (via [`crate::math::safe_ln`]) and `coeff^2`
/// respectively, used only to drive the split decision.
pub fn partition_and_quantize(
    coeffs: &[f32],
    log_amp: &[f32],
    energy: &[f32],
    kbps: f32,
    max_kbps: f32,
) -> Vec<QuantizerZone> {
    let n = coeffs.len();
    if n == 0 {
        return Vec::new();
    }
    let delta = delta_threshold(kbps, max_kbps) as f64;

    let mut zones = Vec::new();
    let mut zone_start = 0usize;
    let mut running_weight = energy[0] as f64;
    let mut running_weighted_log = energy[0] as f64 * log_amp[0] as f64;

    for i in 1..n {
        let mean = if running_weight > 0.0 {
            running_weighted_log / running_weight
        } else {
            log_amp[i - 1] as f64
        };
        let diff = (log_amp[i] as f64 - mean).abs();

        if diff > delta && zones.len() + 1 < MAX_ZONES_PER_CHANNEL {
            zones.push(make_zone(coeffs, zone_start, i));
            zone_start = i;
            running_weight = energy[i] as f64;
            running_weighted_log = energy[i] as f64 * log_amp[i] as f64;
        } else {
            running_weight += energy[i] as f64;
            running_weighted_log += energy[i] as f64 * log_amp[i] as f64;
        }
    }
    zones.push(make_zone(coeffs, zone_start, n));
    zones
}

fn make_zone(coeffs: &[f32], start: usize, end: usize) -> QuantizerZone {
    let max_abs = coeffs[start..end]
        .iter()
        .fold(0.0f32, |m, &c| m.max(c.abs()));

    let mut exponent = 0u8;
    while exponent < 14 {
        let scale = 2f32.powi(exponent as i32);
        if (max_abs / scale).round().abs() <= 7.0 {
            break;
        }
        exponent += 1;
    }

    // "Unused" is a post-quantization property (spec.md §4.5): a zone
    // whose every coefficient rounds to zero at the chosen exponent,
    // not merely one whose raw magnitude happens to be exactly zero. A
    // zone with e.g. max_abs in 0.1..0.49 picks exponent 0 immediately
    // but still rounds away to nothing, and must be flagged the same way.
    let scale = 2f32.powi(exponent as i32);
    let unused = (max_abs / scale).round() == 0.0;

    QuantizerZone {
        start: start as u16,
        end: end as u16,
        exponent,
        unused,
    }
}
