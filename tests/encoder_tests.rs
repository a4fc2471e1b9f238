//! End-to-end block-encoding scenarios (spec.md §8).

use ulc_encoder_core::bitstream::max_block_bits;
use ulc_encoder_core::{Encoder, EncoderFlags};

fn default_flags() -> EncoderFlags {
    EncoderFlags::default()
}

#[test]
fn dc_stereo_block_fits_in_few_bits() {
    // Scenario 2: rate=44100, C=2, N=512, DC (+1.0) for all samples.
    let mut enc = Encoder::new(44100, 2, 512, default_flags()).unwrap();
    let src = vec![1.0f32; 1024];
    let mut dst = vec![0u8; 4096];
    let bits = enc.encode_block_cbr(&mut dst, &src, 128.0).unwrap();
    assert!(bits <= max_block_bits(512, 2));
    assert!(bits > 0);
}

#[test]
fn gaussian_noise_cbr_lands_close_to_the_target_bit_budget() {
    // Scenario 3: rate=48000, C=1, N=1024, sigma=0.1 noise, CBR=32 kbps.
    let n = 1024usize;
    let rate = 48000u32;
    let kbps = 32.0f32;

    // Deterministic pseudo-noise rather than a real RNG dependency: a sum
    // of incommensurate sines approximates a noise-like broadband signal
    // well enough to exercise the rate controller's search.
    let src: Vec<f32> = (0..n)
        .map(|i| {
            let t = i as f32;
            0.1 * ((t * 0.337).sin() + (t * 0.071).sin() + (t * 1.913).sin()) / 3.0
        })
        .collect();

    let mut enc = Encoder::new(rate, 1, n as u32, default_flags()).unwrap();
    let mut dst = vec![0u8; 16384];
    let bits = enc.encode_block_cbr(&mut dst, &src, kbps).unwrap();

    let target = kbps * 1000.0 * n as f32 / rate as f32;
    assert!(bits <= max_block_bits(n as u32, 1));
    // The binary search only guarantees "fits under budget", not a tight
    // band around it; assert the loose direction explicitly and sanity
    // check it isn't wildly overshooting.
    assert!(
        (bits as f32) <= target + 512.0,
        "bits={bits} target={target}"
    );
}

#[test]
fn deterministic_encoding_of_the_same_input_is_byte_identical() {
    let n = 512usize;
    let src: Vec<f32> = (0..n).map(|i| (i as f32 * 0.05).sin()).collect();

    let mut enc_a = Encoder::new(44100, 1, n as u32, default_flags()).unwrap();
    let mut enc_b = Encoder::new(44100, 1, n as u32, default_flags()).unwrap();
    let mut dst_a = vec![0u8; 8192];
    let mut dst_b = vec![0u8; 8192];

    let bits_a = enc_a.encode_block_cbr(&mut dst_a, &src, 96.0).unwrap();
    let bits_b = enc_b.encode_block_cbr(&mut dst_b, &src, 96.0).unwrap();

    assert_eq!(bits_a, bits_b);
    let bytes = bits_a.div_ceil(8);
    assert_eq!(dst_a[..bytes], dst_b[..bytes]);
}

#[test]
fn repeated_silent_blocks_are_byte_identical_across_blocks() {
    let n = 256usize;
    let mut enc = Encoder::new(44100, 1, n as u32, default_flags()).unwrap();
    let src = vec![0.0f32; n];
    let mut dst_1 = vec![0u8; 4096];
    let mut dst_2 = vec![0u8; 4096];

    let bits_1 = enc.encode_block_cbr(&mut dst_1, &src, 64.0).unwrap();
    let bits_2 = enc.encode_block_cbr(&mut dst_2, &src, 64.0).unwrap();

    assert_eq!(bits_1, bits_2);
    let bytes = bits_1.div_ceil(8);
    assert_eq!(dst_1[..bytes], dst_2[..bytes]);
}

#[test]
fn channel_independence_under_silence_in_the_other_channel() {
    let n = 512usize;
    let sig: Vec<f32> = (0..n).map(|i| (i as f32 * 0.15).sin()).collect();
    let silence = vec![0.0f32; n];

    let mut enc_a = Encoder::new(44100, 2, n as u32, default_flags()).unwrap();
    let mut src_a = sig.clone();
    src_a.extend(silence.clone());
    let mut dst_a = vec![0u8; 8192];
    let bits_a = enc_a.encode_block_cbr(&mut dst_a, &src_a, 96.0).unwrap();

    let mut enc_b = Encoder::new(44100, 2, n as u32, default_flags()).unwrap();
    let mut src_b = silence;
    src_b.extend(sig);
    let mut dst_b = vec![0u8; 8192];
    let bits_b = enc_b.encode_block_cbr(&mut dst_b, &src_b, 96.0).unwrap();

    let diff = (bits_a as i64 - bits_b as i64).abs();
    assert!(diff <= 4, "bits_a={bits_a} bits_b={bits_b}");
}

#[test]
fn monotone_rate_distortion_higher_kbps_does_not_increase_zero_count() {
    let n = 512usize;
    let src: Vec<f32> = (0..n)
        .map(|i| (i as f32 * 0.07).sin() + 0.3 * (i as f32 * 0.21).cos())
        .collect();

    let encoded_bits = |kbps: f32| {
        let mut enc = Encoder::new(44100, 1, n as u32, default_flags()).unwrap();
        let mut dst = vec![0u8; 8192];
        enc.encode_block_cbr(&mut dst, &src, kbps).unwrap()
    };

    let low_bits = encoded_bits(16.0);
    let high_bits = encoded_bits(96.0);
    // More kbps should never produce a strictly smaller encoded block,
    // since the rate controller keeps at least as many coefficients.
    assert!(high_bits >= low_bits, "low={low_bits} high={high_bits}");
}

#[test]
fn vbr_higher_quality_never_produces_fewer_bits() {
    let n = 512usize;
    let src: Vec<f32> = (0..n).map(|i| (i as f32 * 0.11).sin()).collect();

    let mut enc_low = Encoder::new(44100, 1, n as u32, default_flags()).unwrap();
    let mut enc_high = Encoder::new(44100, 1, n as u32, default_flags()).unwrap();
    let mut dst_low = vec![0u8; 8192];
    let mut dst_high = vec![0u8; 8192];

    let low_bits = enc_low.encode_block_vbr(&mut dst_low, &src, 5.0).unwrap();
    let high_bits = enc_high.encode_block_vbr(&mut dst_high, &src, 95.0).unwrap();

    assert!(high_bits >= low_bits, "low={low_bits} high={high_bits}");
}

#[test]
fn invalid_construction_parameters_are_rejected() {
    assert!(Encoder::new(7999, 1, 1024, default_flags()).is_err());
    assert!(Encoder::new(44100, 1, 300, default_flags()).is_err());
    assert!(Encoder::new(44100, 0, 1024, default_flags()).is_err());
    assert!(Encoder::new(44100, 1, 4096, default_flags()).is_ok());
}

#[test]
fn destination_buffer_sized_per_max_bits_formula_never_overflows() {
    let n = 1024u32;
    let channels = 2u8;
    let mut enc = Encoder::new(48000, channels, n, default_flags()).unwrap();
    let src: Vec<f32> = (0..(n as usize * channels as usize))
        .map(|i| (i as f32 * 0.3).sin())
        .collect();
    let max_bytes = max_block_bits(n, channels as u32).div_ceil(8);
    let mut dst = vec![0u8; max_bytes];
    let bits = enc.encode_block_cbr(&mut dst, &src, 256.0).unwrap();
    assert!(bits <= max_block_bits(n, channels as u32));
}
