//! Noise-floor and HF-extension parameter extraction.
//!
//! Builds a per-coefficient log-noise-floor curve from the pseudo-DFT
//! power (`MDCT^2 + MDST^2`) of a channel's full coefficient set, then
//! exposes two per-zone queries the bitstream serializer uses when a
//! quantizer zone has nothing but dropped coefficients: a quantized
//! geometric-mean noise amplitude (`noise_quant`), and a weighted-least-
//! squares amplitude/decay pair describing a high-frequency extension
//! (`hf_ext`).

use crate::math::{exp_via_identity, round_clamp_i32, safe_ln, weighted_linear_fit};

pub struct NoiseAnalyzer {
    /// Per-coefficient log-power sample used as the regression's `y`.
    log_power: Vec<f32>,
    /// Per-coefficient weight `w ~= exp(0.5*y)`.
    weight: Vec<f32>,
}

impl NoiseAnalyzer {
    /// `mdct`/`mdst` are same-length per-coefficient arrays for one
    /// channel's full `N/2` coefficients (concatenated across
    /// sub-blocks in band order). `rate_hz` shapes how wide the
    /// mask/floor windows are relative to band index.
    pub fn new(mdct: &[f32], mdst: &[f32], rate_hz: u32) -> Self {
        debug_assert_eq!(mdct.len(), mdst.len());
        let s = mdct.len();
        let power: Vec<f32> = mdct
            .iter()
            .zip(mdst)
            .map(|(&c, &d)| c * c + d * d)
            .collect();

        let norm = power.iter().cloned().fold(0.0f32, f32::max);
        let log_norm = if norm > 0.0 { (1.0 / 3.0) * (norm as f64).ln() } else { 0.0 };
        let inv_log_scale = 1.0 / 3.0;

        let lo_range_scale = (16000.0 * 2.0 / rate_hz.max(1) as f32).min(1.0);
        let hi_range_scale = (rate_hz as f32 / (22000.0 * 2.0)).max(1.0);

        let ln_power: Vec<f64> = power
            .iter()
            .map(|&p| if norm > 0.0 { safe_ln(p / norm) as f64 } else { 0.0 })
            .collect();

        let mut log_power = vec![0.0f32; s];
        let mut weight = vec![0.0f32; s];
        for n in 0..s {
            let start = ((n as f32) * lo_range_scale) as usize;
            let end = (((n as f32) * hi_range_scale) as usize).clamp(start + 1, s.max(1));
            let end = end.min(s);
            let start = start.min(end);

            let window = &ln_power[start..end];
            let mask = if window.is_empty() {
                0.0
            } else {
                window.iter().sum::<f64>() / window.len() as f64
            };
            let floor = window.iter().cloned().fold(f64::INFINITY, f64::min);
            let floor = if floor.is_finite() { floor } else { 0.0 };

            let y = (2.0 * floor - mask) * inv_log_scale + log_norm;
            log_power[n] = y as f32;
            weight[n] = exp_via_identity(0.5 * y as f32);
        }

        NoiseAnalyzer { log_power, weight }
    }

    /// Quantized geometric-mean noise amplitude for `[band, band+width)`,
    /// relative to a zone coded at quantizer exponent `q`. Returns `0`
    /// when the band is silent (amplitude rounds to nothing), matching
    /// the "disabled" sentinel.
    pub fn noise_quant(&self, band: usize, width: usize, q: u8) -> u8 {
        let end = (band + width).min(self.log_power.len());
        if band >= end {
            return 0;
        }
        let mean_log_amp = self.log_power[band..end]
            .iter()
            .map(|&y| 0.5 * y as f64)
            .sum::<f64>()
            / (end - band) as f64;
        let amp = mean_log_amp.exp();
        let scale = 2f64.powi(q as i32);
        round_clamp_i32((amp / scale * 8.0) as f32, 0, 8) as u8
    }

    /// Weighted least-squares `(amplitude, decay)` fit of the log-noise
    /// curve over `[band, band+width)`, relative to quantizer exponent
    /// `q`. `amplitude` encodes `exp(a)`, `decay` encodes `1 - exp(b)`.
    pub fn hf_ext(&self, band: usize, width: usize, q: u8) -> (u8, u8) {
        let end = (band + width).min(self.log_power.len());
        if band + 1 >= end {
            return (0, 0);
        }
        let xs: Vec<f32> = (0..end - band).map(|i| i as f32).collect();
        let ys: Vec<f32> = self.log_power[band..end].to_vec();
        let ws: Vec<f32> = self.weight[band..end].to_vec();
        let (a, b) = weighted_linear_fit(&xs, &ys, &ws);

        let scale = 2f32.powi(q as i32);
        let amplitude = round_clamp_i32((a.exp() / scale) * 15.0, 0, 15) as u8;
        let decay = round_clamp_i32((1.0 - b.exp()) * 255.0, 0, 255) as u8;
        (amplitude, decay)
    }
}
