//! Psychoacoustic masking curve and per-coefficient importance scoring.
//!
//! Operates on one sub-block's squared MDCT amplitudes at a time. Two
//! sliding windows (a wide "main critical band" window and a narrower
//! "noise band" window, each scaled proportionally to the band index)
//! are accumulated via prefix sums rather than literal incremental
//! pointer bookkeeping — same O(1)-per-band amortized cost, simpler to
//! get right without a running two-pointer invariant to maintain.

use crate::math::safe_ln;

/// Masking curve and importance score for every coefficient of one
/// sub-block, in Neper (natural-log amplitude) units.
pub struct PsychoacousticAnalysis {
    pub masking: Vec<f32>,
    pub importance: Vec<f32>,
}

/// `flat` weighting term from the importance formula: `8*flat^2*(flat^2-1)`.
fn flatness_term(flat: f32) -> f32 {
    let f2 = flat * flat;
    8.0 * f2 * (f2 - 1.0)
}

/// Analyze one sub-block's squared MDCT amplitudes.
///
/// When `psychoacoustics` is `false`, importance falls back to the raw
/// squared amplitude and masking is left at zero (unused by the caller
/// in that mode). `analysis_power` is an optional per-channel log-domain
/// decay folded additively into every coefficient's score; callers that
/// don't track it should pass `0.0`.
pub fn analyze(
    amp_sq: &[f32],
    noise_coding: bool,
    psychoacoustics: bool,
    analysis_power: f32,
) -> PsychoacousticAnalysis {
    let s = amp_sq.len();
    if !psychoacoustics {
        return PsychoacousticAnalysis {
            masking: vec![0.0; s],
            importance: amp_sq.to_vec(),
        };
    }

    let norm = amp_sq.iter().cloned().fold(0.0f32, f32::max);
    if norm <= 0.0 {
        return PsychoacousticAnalysis {
            masking: vec![0.0; s],
            importance: vec![0.0; s],
        };
    }

    // Normalized energy and its log, plus prefix sums for O(1) windowed
    // sums of E, E*ln(E), and ln(E).
    let energy: Vec<f32> = amp_sq.iter().map(|&e| e / norm).collect();
    let log_energy: Vec<f32> = energy.iter().map(|&e| safe_ln(e)).collect();

    let mut prefix_e = vec![0.0f64; s + 1];
    let mut prefix_e_lne = vec![0.0f64; s + 1];
    let mut prefix_lne = vec![0.0f64; s + 1];
    for i in 0..s {
        prefix_e[i + 1] = prefix_e[i] + energy[i] as f64;
        prefix_e_lne[i + 1] = prefix_e_lne[i] + (energy[i] as f64) * (log_energy[i] as f64);
        prefix_lne[i + 1] = prefix_lne[i] + log_energy[i] as f64;
    }
    let range_sum = |prefix: &[f64], lo: usize, hi: usize| prefix[hi] - prefix[lo];

    let log_norm = (1.0 / 3.0) * (norm as f64).ln();

    let mut masking = vec![0.0f32; s];
    let mut flatness = vec![0.0f32; s];
    for n in 0..s {
        let main_start = (29 * n / 32).min(s);
        let main_end = (45 * n / 32).min(s).max(main_start);
        let sum_e = range_sum(&prefix_e, main_start, main_end);
        let sum_e_lne = range_sum(&prefix_e_lne, main_start, main_end);

        let noise_sum = if noise_coding {
            let noise_start = (15 * n / 16).min(s);
            let noise_end = (20 * n / 16).min(s).max(noise_start);
            range_sum(&prefix_lne, noise_start, noise_end)
        } else {
            0.0
        };

        let main_mean = if sum_e > 0.0 { sum_e_lne / sum_e } else { 0.0 };
        let noise_term = noise_sum / s.max(1) as f64;
        masking[n] = ((main_mean + noise_term) * (-1.0 / 3.0) + log_norm) as f32;

        let count = (main_end - main_start).max(1) as f64;
        let arith_mean = sum_e / count;
        let geo_mean = (range_sum(&prefix_lne, main_start, main_end) / count).exp();
        flatness[n] = if arith_mean > 0.0 {
            ((geo_mean / arith_mean) as f32).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    let mut importance = vec![0.0f32; s];
    for n in 0..s {
        let amplitude_log = 0.5 * log_energy[n];
        let exponent = 2.0 * (3.455 * amplitude_log - 2.533 * masking[n])
            + flatness_term(flatness[n])
            + analysis_power;
        importance[n] = exponent.exp();
    }

    PsychoacousticAnalysis {
        masking,
        importance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_psychoacoustics_uses_raw_energy() {
        let amp_sq = vec![1.0, 4.0, 9.0, 0.0];
        let analysis = analyze(&amp_sq, true, false, 0.0);
        assert_eq!(analysis.importance, amp_sq);
    }

    #[test]
    fn silent_subblock_yields_zero_importance() {
        let amp_sq = vec![0.0; 16];
        let analysis = analyze(&amp_sq, true, true, 0.0);
        assert!(analysis.importance.iter().all(|&i| i == 0.0));
    }

    #[test]
    fn tonal_peak_is_more_important_than_surrounding_noise_floor() {
        let mut amp_sq = vec![0.01f32; 64];
        amp_sq[32] = 10.0;
        let analysis = analyze(&amp_sq, true, true, 0.0);
        assert!(analysis.importance[32] > analysis.importance[10]);
    }
}
