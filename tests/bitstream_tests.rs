//! Bitstream serializer shape and invariants (spec.md §4.7, §8 universal
//! invariants).

use ulc_encoder_core::bitstream::{build_channel_plan, max_block_bits, serialize_block};
use ulc_encoder_core::types::{QuantizerZone, WindowControl};

#[test]
fn dc_stereo_block_is_header_coefficient_stop_per_channel() {
    // Scenario 2: rate=44100, C=2, N=512, DC input (+1.0) for all samples.
    // A pure DC time-domain signal concentrates almost all MDCT energy in
    // the first coefficient, so the post-selection coefficient array for
    // one channel is a single non-zero bin followed by zeros.
    let mut coeffs = vec![0.0f32; 256];
    coeffs[0] = 1.0;
    let zones = vec![QuantizerZone {
        start: 0,
        end: 256,
        exponent: 0,
        unused: false,
    }];
    let plan = build_channel_plan(&coeffs, &zones, None);
    let window = WindowControl::steady(0);
    let (_, bits) = serialize_block(window, &[plan.clone(), plan]);
    assert!(bits < 64, "bits={bits}");
}

#[test]
fn every_block_stays_within_the_max_bit_length_formula() {
    let n = 2048u32;
    let channels = 2u32;
    let coeffs: Vec<f32> = (0..n / 2).map(|i| if i % 3 == 0 { (i % 7 + 1) as f32 } else { 0.0 }).collect();
    let zones = vec![QuantizerZone {
        start: 0,
        end: (n / 2) as u16,
        exponent: 0,
        unused: false,
    }];
    let plan = build_channel_plan(&coeffs, &zones, None);
    let window = WindowControl::steady(3);
    let (_, bits) = serialize_block(window, &vec![plan; channels as usize]);
    assert!(bits <= max_block_bits(n, channels));
}

#[test]
fn long_silent_zone_splits_into_legal_zero_run_lengths() {
    let coeffs = vec![0.0f32; 300];
    let zones = vec![QuantizerZone {
        start: 0,
        end: 300,
        exponent: 0,
        unused: false,
    }];
    let plan = build_channel_plan(&coeffs, &zones, None);
    for sym in &plan {
        if let ulc_encoder_core::bitstream::ChannelSymbol::ZeroRun(len) = sym {
            assert!((4..=152).contains(len));
        }
    }
}

#[test]
fn nibble_writer_total_bits_is_always_a_multiple_of_four() {
    let coeffs = vec![3.0f32, -2.0, 0.0, 0.0, 0.0, 1.0];
    let zones = vec![QuantizerZone {
        start: 0,
        end: 6,
        exponent: 0,
        unused: false,
    }];
    let plan = build_channel_plan(&coeffs, &zones, None);
    let window = WindowControl::steady(0);
    let (_, bits) = serialize_block(window, &[plan]);
    assert_eq!(bits % 4, 0);
}

#[test]
fn minimum_legal_block_underflow_emits_header_and_stop_only() {
    // §7 bit-budget underflow: an all-silent zone with no noise analyzer
    // must still emit a valid header + stop, never panicking or growing.
    let coeffs = vec![0.0f32; 64];
    let zones = vec![QuantizerZone {
        start: 0,
        end: 64,
        exponent: 0,
        unused: true,
    }];
    let plan = build_channel_plan(&coeffs, &zones, None);
    let window = WindowControl::steady(0);
    let (bytes, bits) = serialize_block(window, &[plan]);
    assert!(bits <= max_block_bits(64, 1));
    assert!(!bytes.is_empty());
}
