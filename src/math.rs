//! Small numeric helpers shared by the analyzers.
//!
//! The reference encoder this crate is modeled on leans on fixed-point
//! logarithm/exponent approximations (`ULC_FastLnApprox`, an `(1+x/m)^m`
//! exponent identity) purely for speed on embedded targets. Per the design
//! notes, those approximations are substitutable as long as masking values
//! stay within 0.01 Np and noise-fill amplitudes within 1%, so this crate
//! uses plain `f32` transcendentals and keeps only the `(1+x/m)^m` identity
//! literally, since it is called out by name in the noise analyzer's weight
//! derivation.

/// Sentinel log-amplitude used in place of `ln(0)` for a zero-energy band
/// or coefficient. Keeps masking/noise math well-defined on silence.
pub const NEPER_OUT_OF_RANGE: f32 = 0.0;

/// Natural log with a zero-energy bias instead of `-inf`.
#[inline]
pub fn safe_ln(x: f32) -> f32 {
    if x > 0.0 {
        x.ln()
    } else {
        NEPER_OUT_OF_RANGE
    }
}

/// `e^x` evaluated via the `(1 + x/m)^m -> e^x` identity with `m = 256`,
/// as used in the noise analyzer's weight pairing.
#[inline]
pub fn exp_via_identity(x: f32) -> f32 {
    const M: i32 = 256;
    (1.0 + x / M as f32).powi(M)
}

/// Clamp a floating value into an inclusive integer range and round to
/// nearest, used pervasively when packing into 4-bit/8-bit bitstream fields.
#[inline]
pub fn round_clamp_i32(x: f32, lo: i32, hi: i32) -> i32 {
    x.round().clamp(lo as f32, hi as f32) as i32
}

/// Solution `(a, b)` to a weighted least-squares fit of `y ~= a + b*x`
/// given per-sample weights, via the standard normal equations.
///
/// Returns `(0.0, 0.0)` if the weighted sample is degenerate (all weights
/// zero, or fewer than two distinct `x`).
pub fn weighted_linear_fit(xs: &[f32], ys: &[f32], ws: &[f32]) -> (f32, f32) {
    debug_assert_eq!(xs.len(), ys.len());
    debug_assert_eq!(xs.len(), ws.len());

    let mut sw = 0.0f64;
    let mut swx = 0.0f64;
    let mut swxx = 0.0f64;
    let mut swy = 0.0f64;
    let mut swxy = 0.0f64;

    for ((&x, &y), &w) in xs.iter().zip(ys).zip(ws) {
        let w = w as f64;
        let x = x as f64;
        let y = y as f64;
        sw += w;
        swx += w * x;
        swxx += w * x * x;
        swy += w * y;
        swxy += w * x * y;
    }

    let denom = sw * swxx - swx * swx;
    if sw <= 0.0 || denom.abs() < 1e-12 {
        return (0.0, 0.0);
    }

    let b = (sw * swxy - swx * swy) / denom;
    let a = (swy - b * swx) / sw;
    (a as f32, b as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_identity_matches_real_exp_closely() {
        for &x in &[-2.0f32, -0.5, 0.0, 0.5, 2.0] {
            let approx = exp_via_identity(x);
            let real = x.exp();
            assert!(
                (approx - real).abs() < real.abs() * 0.02 + 0.01,
                "x={x}: approx={approx} real={real}"
            );
        }
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let xs: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let ys: Vec<f32> = xs.iter().map(|&x| 2.0 + 0.5 * x).collect();
        let ws = vec![1.0f32; xs.len()];

        let (a, b) = weighted_linear_fit(&xs, &ys, &ws);
        assert!((a - 2.0).abs() < 1e-3);
        assert!((b - 0.5).abs() < 1e-3);
    }

    #[test]
    fn safe_ln_never_produces_infinite_values() {
        assert_eq!(safe_ln(0.0), NEPER_OUT_OF_RANGE);
        assert!(safe_ln(1.0).abs() < 1e-6);
    }
}
