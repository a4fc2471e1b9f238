//! Rate control: coefficient selection against either a bit budget (CBR)
//! or a fixed quality threshold (VBR).
//!
//! Both modes decide, per channel, which coefficients survive into the
//! quantizer by comparing each coefficient's psychoacoustic importance
//! against a cutoff. CBR binary-searches the cutoff against the channel's
//! share of the block's bit budget, using [`crate::bitstream::build_channel_plan`]
//! and [`crate::bitstream::plan_bits`] as the (expensive but exact) cost
//! function, the same way the teacher's `lossy/encoder.rs` iterates its
//! quantization step size against a target bitrate. VBR skips the search
//! entirely: a fixed quality value maps directly to a cutoff.

use crate::bitstream::{build_channel_plan, plan_bits};
use crate::noise::NoiseAnalyzer;
use crate::quantizer::partition_and_quantize;
use crate::types::QuantizerZone;

const CBR_SEARCH_STEPS: u32 = 16;

/// Result of selecting coefficients for one channel: the zones the
/// quantizer picked, and the coefficient array with below-cutoff entries
/// zeroed so the bitstream builder can treat every remaining non-zero
/// value as kept.
pub struct Selection {
    pub zones: Vec<QuantizerZone>,
    pub coeffs: Vec<f32>,
}

/// Zeros every coefficient whose importance is strictly below `cutoff`.
fn apply_cutoff(coeffs: &[f32], importance: &[f32], cutoff: f32) -> Vec<f32> {
    coeffs
        .iter()
        .zip(importance)
        .map(|(&c, &imp)| if imp < cutoff { 0.0 } else { c })
        .collect()
}

fn select_at_cutoff(
    coeffs: &[f32],
    importance: &[f32],
    log_amp: &[f32],
    energy: &[f32],
    cutoff: f32,
    kbps: f32,
    max_kbps: f32,
) -> Selection {
    let kept = apply_cutoff(coeffs, importance, cutoff);
    let zones = partition_and_quantize(&kept, log_amp, energy, kbps, max_kbps);
    Selection { zones, coeffs: kept }
}

fn plan_cost(selection: &Selection, noise: Option<&NoiseAnalyzer>) -> usize {
    let plan = build_channel_plan(&selection.coeffs, &selection.zones, noise);
    plan_bits(&plan)
}

/// Selects coefficients for one channel under a constant-bitrate budget.
///
/// `budget_bits` is this channel's share of the block's total bit
/// budget (excluding the shared 8-bit window header). Binary-searches
/// the importance cutoff over `[0, max_importance]` until the resulting
/// plan's bit cost is at or under budget, preferring the lowest cutoff
/// (most coefficients kept) that still fits.
#[allow(clippy::too_many_arguments)]
pub fn select_cbr(
    coeffs: &[f32],
    importance: &[f32],
    log_amp: &[f32],
    energy: &[f32],
    budget_bits: usize,
    kbps: f32,
    max_kbps: f32,
    noise: Option<&NoiseAnalyzer>,
) -> Selection {
    let max_importance = importance.iter().cloned().fold(0.0f32, f32::max);
    if max_importance <= 0.0 || budget_bits == 0 {
        return select_at_cutoff(coeffs, importance, log_amp, energy, max_importance + 1.0, kbps, max_kbps);
    }

    let mut lo = 0.0f32;
    let mut hi = max_importance;
    let mut best = select_at_cutoff(coeffs, importance, log_amp, energy, hi, kbps, max_kbps);

    for _ in 0..CBR_SEARCH_STEPS {
        let mid = 0.5 * (lo + hi);
        let candidate = select_at_cutoff(coeffs, importance, log_amp, energy, mid, kbps, max_kbps);
        if plan_cost(&candidate, noise) <= budget_bits {
            best = candidate;
            hi = mid;
        } else {
            lo = mid;
        }
    }
    best
}

/// Selects coefficients for one channel under a fixed quality target.
///
/// Per spec.md §4.6, a coefficient survives when its importance exceeds
/// `exp(-quality * ln 2) = 2^-quality`. That threshold is applied relative
/// to this sub-block's peak importance rather than as an absolute value,
/// since the importance score's absolute scale is itself
/// implementation-defined (an unnormalized `exp(...)`, see
/// `psychoacoustic::analyze`) — see `DESIGN.md` for this Open Question
/// resolution. `quality` is expected in `(0, 100]`; higher keeps more
/// coefficients.
pub fn select_vbr(
    coeffs: &[f32],
    importance: &[f32],
    log_amp: &[f32],
    energy: &[f32],
    quality: f32,
) -> Selection {
    let max_importance = importance.iter().cloned().fold(0.0f32, f32::max);
    let q = quality.clamp(f32::EPSILON, 100.0);
    let cutoff = max_importance * 2f32.powf(-q);
    select_at_cutoff(coeffs, importance, log_amp, energy, cutoff, 0.0, 1.0)
}
