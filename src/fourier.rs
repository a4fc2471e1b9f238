//! Forward lapped transform (MDCT) and its auxiliary sine companion (MDST).
//!
//! The FFT-accelerated fold/rotate here is the same factorization the
//! teacher crate's `lossy/mdct.rs` uses (itself credited there to Symphonia
//! and ffmpeg), generalized from a fixed full-length sine window to a
//! variable-length sine transition flanked by flat regions, so a single
//! kernel serves every sub-block size and overlap scale a block can pick.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

struct Plan {
    fft: Arc<dyn Fft<f32>>,
    twiddle: Vec<Complex<f32>>,
}

/// Builds and caches one FFT plan + twiddle table per distinct sub-block
/// size seen so far. A block only ever touches a handful of sizes
/// (`N`, `N/2`, `N/4`, `N/8`), so the cache stays tiny for the life of an
/// [`crate::Encoder`].
pub struct Fourier {
    planner: FftPlanner<f32>,
    plans: HashMap<usize, Plan>,
}

impl Fourier {
    pub fn new() -> Self {
        Fourier {
            planner: FftPlanner::new(),
            plans: HashMap::new(),
        }
    }

    fn ensure_plan(&mut self, n: usize) {
        if self.plans.contains_key(&n) {
            return;
        }
        let n4 = n / 4;
        let n2 = n / 2;
        let fft = self.planner.plan_fft_forward(n4);
        let twiddle: Vec<Complex<f32>> = (0..n4)
            .map(|k| {
                let theta = PI / n2 as f32 * (k as f32 + 0.125);
                Complex::new(theta.cos(), theta.sin())
            })
            .collect();
        self.plans.insert(n, Plan { fft, twiddle });
    }

    /// Forward MDCT of `samples` (length `n`) into `n/2` coefficients,
    /// windowed with [`transient_window`] using the given overlap length.
    pub fn mdct(&mut self, n: usize, overlap: usize, samples: &[f32]) -> Vec<f32> {
        debug_assert_eq!(samples.len(), n);
        let window = transient_window(n, overlap);
        let x: Vec<f32> = samples
            .iter()
            .zip(&window)
            .map(|(&s, &w)| s * w)
            .collect();
        self.fold_fft_rotate(n, &x)
    }

    /// Auxiliary MDST of the same windowed data, used only to feed the
    /// noise analyzer's pseudo-DFT power estimate. Evaluated directly
    /// (no FFT factorization) since it runs once per sub-block rather
    /// than on the coefficient-selection hot path.
    pub fn mdst(&self, n: usize, overlap: usize, samples: &[f32]) -> Vec<f32> {
        debug_assert_eq!(samples.len(), n);
        let window = transient_window(n, overlap);
        let n2 = n / 2;
        let mut out = vec![0.0f32; n2];
        for (k, out_k) in out.iter_mut().enumerate() {
            let kf = k as f64 + 0.5;
            let mut acc = 0.0f64;
            for i in 0..n {
                let xi = samples[i] as f64 * window[i] as f64;
                if xi == 0.0 {
                    continue;
                }
                let theta = (PI as f64 / n as f64) * (i as f64 + 0.5 + n2 as f64) * kf;
                acc += xi * theta.sin();
            }
            *out_k = acc as f32;
        }
        out
    }

    /// Inverse MDCT, `n/2` coefficients to `n` unwindowed time samples.
    /// Not invoked by the encode path (decoding is out of scope); kept for
    /// the Fourier kernel's self-test coverage of round-trip energy.
    pub fn imdct(&mut self, n: usize, coeffs: &[f32]) -> Vec<f32> {
        debug_assert_eq!(coeffs.len(), n / 2);
        self.ensure_plan(n);
        let plan = self.plans.get(&n).unwrap();
        let n2 = n / 2;
        let n4 = n / 4;
        let n8 = n4 / 2;

        let mut z: Vec<Complex<f32>> = Vec::with_capacity(n4);
        for i in 0..n4 {
            let even = coeffs[i * 2];
            let odd = -coeffs[n2 - 1 - i * 2];
            let w = plan.twiddle[i];
            z.push(Complex::new(
                odd * w.im - even * w.re,
                odd * w.re + even * w.im,
            ));
        }
        plan.fft.process(&mut z);

        let mut output = vec![0.0f32; n];
        let scale = 2.0 / n2 as f32;
        for i in 0..n8 {
            let w = plan.twiddle[i];
            let val_re = w.re * z[i].re + w.im * z[i].im;
            let val_im = w.im * z[i].re - w.re * z[i].im;
            let fi = 2 * i;
            let ri = n4 - 1 - 2 * i;
            output[ri] = -val_im * scale;
            output[n4 + fi] = val_im * scale;
            output[n2 + ri] = val_re * scale;
            output[n2 + n4 + fi] = val_re * scale;
        }
        for i in 0..n8 {
            let idx = n8 + i;
            let w = plan.twiddle[idx];
            let val_re = w.re * z[idx].re + w.im * z[idx].im;
            let val_im = w.im * z[idx].re - w.re * z[idx].im;
            let fi = 2 * i;
            let ri = n4 - 1 - 2 * i;
            output[fi] = -val_re * scale;
            output[n4 + ri] = val_re * scale;
            output[n2 + fi] = val_im * scale;
            output[n2 + n4 + ri] = val_im * scale;
        }
        output
    }

    fn fold_fft_rotate(&mut self, n: usize, x: &[f32]) -> Vec<f32> {
        self.ensure_plan(n);
        let plan = self.plans.get(&n).unwrap();

        let n2 = n / 2;
        let n4 = n / 4;
        let n8 = n4 / 2;
        let n3 = 3 * n4;

        let mut z: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); n4];
        for i in 0..n8 {
            let re = -x[2 * i + n3] - x[n3 - 1 - 2 * i];
            let im = -x[n4 + 2 * i] + x[n4 - 1 - 2 * i];
            let w = plan.twiddle[i];
            z[i] = Complex::new(-re * w.re - im * w.im, re * w.im - im * w.re);

            let re2 = x[2 * i] - x[n2 - 1 - 2 * i];
            let im2 = -x[n2 + 2 * i] - x[n - 1 - 2 * i];
            let w2 = plan.twiddle[n8 + i];
            z[n8 + i] = Complex::new(-re2 * w2.re - im2 * w2.im, re2 * w2.im - im2 * w2.re);
        }

        plan.fft.process(&mut z);

        let mut output = vec![0.0f32; n2];
        for i in 0..n8 {
            let idx1 = n8 - i - 1;
            let idx2 = n8 + i;

            let w1 = plan.twiddle[idx1];
            let z1 = z[idx1];
            let i1 = -z1.re * w1.im + z1.im * w1.re;
            let r0 = -z1.re * w1.re - z1.im * w1.im;

            let w2 = plan.twiddle[idx2];
            let z2 = z[idx2];
            let i0 = -z2.re * w2.im + z2.im * w2.re;
            let r1 = -z2.re * w2.re - z2.im * w2.im;

            output[2 * idx1] = r0;
            output[2 * idx1 + 1] = i0;
            output[2 * idx2] = r1;
            output[2 * idx2 + 1] = i1;
        }
        output
    }
}

impl Default for Fourier {
    fn default() -> Self {
        Self::new()
    }
}

/// Analysis window of length `n`: a sine-shaped rise over the first
/// `overlap` samples, flat at 1 in the middle, a mirrored sine fall over
/// the last `overlap` samples. `overlap` is clamped to `[1, n/2]`, so the
/// degenerate case `overlap == n/2` is the classic full-length sine window
/// (no flat region at all), and small `overlap` values taper only the
/// edges of an otherwise rectangular window, as used for transient
/// sub-blocks.
pub fn transient_window(n: usize, overlap: usize) -> Vec<f32> {
    let l = overlap.clamp(1, (n / 2).max(1));
    let mut w = vec![1.0f32; n];
    for i in 0..l {
        w[i] = (PI / 2.0 * (i as f32 + 0.5) / l as f32).sin();
    }
    for i in 0..l {
        w[n - 1 - i] = w[i];
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_endpoints_taper_to_near_zero_and_center_is_flat() {
        let w = transient_window(256, 32);
        assert!(w[0] < 0.1);
        assert!(w[255] < 0.1);
        assert!((w[128] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn full_overlap_window_matches_plain_sine_window() {
        let n = 64;
        let w = transient_window(n, n / 2);
        for i in 0..n {
            let expected = (PI * (i as f32 + 0.5) / n as f32).sin();
            assert!((w[i] - expected).abs() < 1e-4, "i={i}");
        }
    }

    #[test]
    fn dc_input_concentrates_energy_in_low_bins() {
        let mut fourier = Fourier::new();
        let n = 256;
        let samples = vec![1.0f32; n];
        let coeffs = fourier.mdct(n, n / 2, &samples);
        let total: f32 = coeffs.iter().map(|c| c * c).sum();
        let low: f32 = coeffs[..8].iter().map(|c| c * c).sum();
        assert!(low / total > 0.9, "low={low} total={total}");
    }

    #[test]
    fn mdct_and_mdst_agree_on_output_length() {
        let mut fourier = Fourier::new();
        let n = 128;
        let samples: Vec<f32> = (0..n).map(|i| (i as f32 * 0.1).sin()).collect();
        let mdct = fourier.mdct(n, 16, &samples);
        let mdst = fourier.mdst(n, 16, &samples);
        assert_eq!(mdct.len(), n / 2);
        assert_eq!(mdst.len(), n / 2);
    }
}
