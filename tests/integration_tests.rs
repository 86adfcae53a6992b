//! Integration Tests
//!
//! End-to-end properties of the align -> balance -> mix -> normalize chain.

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stemsync::audio::analysis::calculate_peak;
use stemsync::balance::{BalanceBranch, TrackMetrics};
use stemsync::normalize::NormalizeAction;
use stemsync::{
    align, compute_gains, mix, normalize, peak_scale_normalize, Aligner, AlignmentOffset,
    AudioBuffer, BalancePolicy, GainPair, NormalizePolicy,
};

/// Helper to create seeded white noise
fn noise(rng: &mut StdRng, frames: usize, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|_| rng.gen_range(-amplitude..amplitude))
        .collect()
}

fn delayed(samples: &[f32], delay: usize) -> Vec<f32> {
    let mut out = vec![0.0; delay];
    out.extend_from_slice(samples);
    out
}

// === Aligner ===

#[test]
fn test_length_matches_reference_for_any_lengths() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..40 {
        let ref_len = rng.gen_range(1..3000);
        let target_len = rng.gen_range(1..3000);
        let reference = AudioBuffer::from_mono(noise(&mut rng, ref_len, 0.5), 8000).unwrap();
        let target = AudioBuffer::from_mono(noise(&mut rng, target_len, 0.5), 8000).unwrap();

        let aligned = align(&reference, &target).unwrap();
        assert_eq!(aligned.num_frames(), ref_len);
    }
}

#[test]
fn test_delay_is_recovered_exactly() {
    let mut rng = StdRng::seed_from_u64(2);
    let source = noise(&mut rng, 16000, 0.5);
    let reference = AudioBuffer::from_mono(source.clone(), 8000).unwrap();

    for delay in [1, 37, 800, 4000] {
        let target = AudioBuffer::from_mono(delayed(&source, delay), 8000).unwrap();
        let aligner = Aligner::default();

        let offset = aligner.estimate_offset(&reference, &target).unwrap();
        assert_eq!(offset, AlignmentOffset(-(delay as i64)));

        let aligned = aligner.align(&reference, &target).unwrap();
        assert!(aligned.is_identical_to(&reference));

        // Correlating again finds nothing left to correct
        let residual = aligner.estimate_offset(&reference, &aligned).unwrap();
        assert_eq!(residual, AlignmentOffset(0));
    }
}

#[test]
fn test_early_target_is_delayed() {
    let mut rng = StdRng::seed_from_u64(3);
    let source = noise(&mut rng, 8000, 0.5);
    let reference = AudioBuffer::from_mono(delayed(&source, 500), 8000).unwrap();
    let target = AudioBuffer::from_mono(source, 8000).unwrap();

    let offset = Aligner::default().estimate_offset(&reference, &target).unwrap();
    assert_eq!(offset, AlignmentOffset(500));

    let aligned = align(&reference, &target).unwrap();
    assert!(aligned.samples()[..500].iter().all(|&s| s == 0.0));
    assert_eq!(&aligned.samples()[500..], &reference.samples()[500..]);
}

#[test]
fn test_sine_delayed_by_200ms_is_shifted_back() {
    let reference = AudioBuffer::sine_wave(440.0, 5.0, 44100);
    let n = reference.num_frames();
    let delay = 8820;
    let target_samples = delayed(&reference.samples()[..n - delay], delay);
    let target = AudioBuffer::from_mono(target_samples, 44100).unwrap();

    // 2205 frames is a whole number of 440 Hz cycles, so every multiple of it
    // between no shift and the full delay correlates almost equally.
    let offset = Aligner::default().estimate_offset(&reference, &target).unwrap();
    let candidates: Vec<i64> = (0..=4).map(|m| -(delay as i64) + m * 2205).collect();
    assert!(candidates.contains(&offset.frames()), "offset {:?}", offset);
    assert_eq!(offset, AlignmentOffset(-(delay as i64)));

    let aligned = align(&reference, &target).unwrap();
    assert_eq!(aligned.num_frames(), n);
    assert_eq!(&aligned.samples()[..n - delay], &reference.samples()[..n - delay]);
    assert!(aligned.samples()[n - delay..].iter().all(|&s| s == 0.0));
}

// === Balancer ===

#[test]
fn test_masked_vocal_scenario() {
    let policy = BalancePolicy::default();
    let instrumental = TrackMetrics {
        rms: 0.2,
        peak: 0.9,
        band_energy: 1000.0,
        dynamic_range: 4.5,
    };
    let vocal = TrackMetrics {
        rms: 0.05,
        peak: 0.25,
        band_energy: 500.0,
        dynamic_range: 5.0,
    };

    let analysis = policy.decide(&instrumental, &vocal);
    assert_eq!(analysis.branch, BalanceBranch::Masked);
    assert_eq!(analysis.gains.instrumental_gain, 0.7);
    assert_eq!(analysis.gains.vocal_gain, 2.0);
}

#[test]
fn test_gain_bounds_for_random_buffers() {
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..30 {
        let frames = rng.gen_range(256..4096);
        let instrumental_amp = rng.gen_range(0.01..1.0);
        let vocal_amp = rng.gen_range(0.01..1.0);

        let instrumental =
            AudioBuffer::from_mono(noise(&mut rng, frames, instrumental_amp), 44100).unwrap();
        // Sparse vocal: mostly silence with bursts, so its peak/RMS ratio varies
        let mut vocal_samples = noise(&mut rng, frames, vocal_amp);
        let keep = rng.gen_range(1..=10);
        for (i, s) in vocal_samples.iter_mut().enumerate() {
            if i % 10 >= keep {
                *s = 0.0;
            }
        }
        let vocal = AudioBuffer::from_mono(vocal_samples, 44100).unwrap();

        let gains = compute_gains(&instrumental, &vocal).unwrap();
        assert!(
            (0.3..=1.0).contains(&gains.instrumental_gain) || gains.instrumental_gain == 0.7,
            "instrumental gain {}",
            gains.instrumental_gain
        );
        assert!(
            (0.45..=2.0).contains(&gains.vocal_gain),
            "vocal gain {}",
            gains.vocal_gain
        );
    }
}

// === Mixer + Normalizer ===

#[test]
fn test_normalized_mix_never_clips() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
        let frames = rng.gen_range(1..2048);
        let instrumental_amp = rng.gen_range(0.001..1.5);
        let vocal_amp = rng.gen_range(0.001..1.5);
        let instrumental =
            AudioBuffer::from_mono(noise(&mut rng, frames, instrumental_amp), 44100).unwrap();
        let vocal = AudioBuffer::from_mono(noise(&mut rng, frames, vocal_amp), 44100).unwrap();
        let gains = GainPair::new(rng.gen_range(0.3..1.0), rng.gen_range(0.45..2.0)).unwrap();

        let mixed = mix(&instrumental, &vocal, gains).unwrap();
        let mixed_peak = calculate_peak(mixed.samples());
        let out = normalize(mixed).unwrap();
        let peak = calculate_peak(out.samples());

        assert!(peak <= 1.0 + 1e-6, "peak {}", peak);
        if mixed_peak > 1.0 {
            assert!(peak <= 0.95 + 1e-6, "limited peak {}", peak);
        }
    }
}

#[test]
fn test_silence_stays_silent() {
    let silence = AudioBuffer::silence(1.0, 2, 44100);
    let mixed = mix(&silence, &silence, GainPair::new(0.7, 2.0).unwrap()).unwrap();
    assert!(mixed.samples().iter().all(|&s| s == 0.0));

    let out = peak_scale_normalize(mixed, &NormalizePolicy::default()).unwrap();
    assert_eq!(out.action, NormalizeAction::Unchanged { peak: 0.0 });
    assert!(out.buffer.samples().iter().all(|&s| s == 0.0 && s.is_finite()));
}

#[test]
fn test_loud_mix_peak_lands_on_ceiling() {
    let mixed = AudioBuffer::from_mono(vec![0.2, -1.4, 0.7, 1.1], 44100).unwrap();
    let out = normalize(mixed).unwrap();
    assert_abs_diff_eq!(calculate_peak(out.samples()), 0.95, epsilon = 1e-6);
}

#[test]
fn test_quiet_mix_boost_falls_short_of_target() {
    let mixed = AudioBuffer::from_mono(vec![0.05, -0.1, 0.02], 44100).unwrap();
    let out = normalize(mixed).unwrap();
    assert_abs_diff_eq!(calculate_peak(out.samples()), 0.2, epsilon = 1e-6);
}

// === Full chain ===

#[test]
fn test_chain_with_offset_vocal() {
    let mut rng = StdRng::seed_from_u64(6);
    let sample_rate = 16000;
    let instrumental = noise(&mut rng, 32000, 0.3);
    let vocal = noise(&mut rng, 32000, 0.3);
    let reference: Vec<f32> = instrumental
        .iter()
        .zip(&vocal)
        .map(|(i, v)| i + v)
        .collect();

    let reference = AudioBuffer::from_mono(reference, sample_rate).unwrap();
    let instrumental = AudioBuffer::from_mono(instrumental, sample_rate).unwrap();
    let late_vocal = AudioBuffer::from_mono(delayed(&vocal, 1234), sample_rate).unwrap();

    let offset = Aligner::default().estimate_offset(&reference, &late_vocal).unwrap();
    assert_eq!(offset, AlignmentOffset(-1234));

    let aligned_vocal = align(&reference, &late_vocal).unwrap();
    let gains = compute_gains(&instrumental, &aligned_vocal).unwrap();
    let out = normalize(mix(&instrumental, &aligned_vocal, gains).unwrap()).unwrap();

    assert_eq!(out.num_frames(), reference.num_frames());
    assert!(calculate_peak(out.samples()) <= 1.0);
}
