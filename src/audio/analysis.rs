//! Audio measurement utilities
//!
//! Objective measurements used by the balancer and the normalizer.
//!
//! # Measurements
//! - RMS (Root Mean Square) level, epsilon-guarded
//! - Decibel conversion for log output
//! - Peak level
//! - Dynamic range proxy (peak/RMS ratio)
//! - Band-limited spectral energy (FFT)

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Convert linear amplitude to decibels
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS with `epsilon` added under the root so silence never yields zero
pub fn calculate_rms_guarded(samples: &[f32], epsilon: f64) -> f64 {
    let mean_square = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / samples.len() as f64
    };
    (mean_square + epsilon).sqrt()
}

/// Calculate peak (maximum absolute value) of samples
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Peak-to-RMS ratio, a rough compression indicator.
///
/// Low values (around 1.4 for a sine, under 3 for brickwalled material)
/// indicate heavily compressed audio.
pub fn dynamic_range(samples: &[f32], epsilon: f64) -> f64 {
    let rms = calculate_rms_guarded(samples, epsilon);
    calculate_peak(samples) as f64 / (rms + epsilon)
}

/// How band edges are located in the real spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BandSearch {
    /// First bin at or above the edge; an unreachable edge resolves to bin 0.
    /// An unreachable upper edge therefore yields an empty band.
    FirstMatch,
    /// First bin at or above the edge; an unreachable edge resolves to one past
    /// the last bin, so the band extends to Nyquist.
    #[default]
    Clamped,
}

/// Locate `[low_bin, high_bin)` for a band in an `n`-point real spectrum
pub fn band_bins(
    num_samples: usize,
    sample_rate: u32,
    low_hz: f64,
    high_hz: f64,
    search: BandSearch,
) -> (usize, usize) {
    let num_bins = num_samples / 2 + 1;
    let bin_hz = sample_rate as f64 / num_samples.max(1) as f64;

    let find = |edge: f64| {
        let found = (0..num_bins).position(|k| k as f64 * bin_hz >= edge);
        match (found, search) {
            (Some(k), _) => k,
            (None, BandSearch::FirstMatch) => 0,
            (None, BandSearch::Clamped) => num_bins,
        }
    };

    (find(low_hz), find(high_hz))
}

/// Spectral energy (sum of squared magnitudes) between `low_hz` and `high_hz`.
///
/// The whole signal is transformed in one FFT. `epsilon` is added to the sum
/// so the result is strictly positive.
pub fn band_energy(
    samples: &[f32],
    sample_rate: u32,
    low_hz: f64,
    high_hz: f64,
    search: BandSearch,
    epsilon: f64,
) -> f64 {
    if samples.is_empty() {
        return epsilon;
    }

    let (low_bin, high_bin) = band_bins(samples.len(), sample_rate, low_hz, high_hz, search);
    if high_bin <= low_bin {
        return epsilon;
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(samples.len());

    let mut spectrum: Vec<Complex<f64>> = samples
        .iter()
        .map(|&s| Complex::new(s as f64, 0.0))
        .collect();
    fft.process(&mut spectrum);

    let energy: f64 = spectrum[low_bin..high_bin].iter().map(|c| c.norm_sqr()).sum();
    energy + epsilon
}
