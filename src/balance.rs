//! Adaptive gain balancing
//!
//! Derives an instrumental/vocal gain pair from three measurements per track:
//! RMS loudness, spectral energy in the vocal band, and the peak/RMS ratio.
//! The vocal band (300 Hz to 3 kHz by default) is where intelligibility
//! concentrates, so the balancer compares the two stems there first.
//!
//! All heuristic constants live in [`BalancePolicy`].

use crate::audio::analysis::{band_energy, calculate_peak, calculate_rms_guarded, dynamic_range};
use crate::audio::{AudioBuffer, BandSearch};
use crate::error::{Result, StemSyncError};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Linear gains applied to the instrumental and vocal stems
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainPair {
    pub instrumental_gain: f32,
    pub vocal_gain: f32,
}

impl GainPair {
    /// Create a gain pair, rejecting negative or non-finite gains
    pub fn new(instrumental_gain: f32, vocal_gain: f32) -> Result<Self> {
        for (field, value) in [
            ("instrumental_gain", instrumental_gain),
            ("vocal_gain", vocal_gain),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(StemSyncError::InvalidConfig {
                    field: field.to_string(),
                    reason: format!("gain must be finite and non-negative, got {}", value),
                });
            }
        }
        Ok(Self {
            instrumental_gain,
            vocal_gain,
        })
    }

    pub fn unity() -> Self {
        Self {
            instrumental_gain: 1.0,
            vocal_gain: 1.0,
        }
    }
}

/// Inclusive gain bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainRange {
    pub min: f32,
    pub max: f32,
}

impl GainRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min as f64, self.max as f64)
    }
}

/// Tunable constants of the balancing heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancePolicy {
    /// Guard added to RMS and energy terms so silence never divides by zero
    pub epsilon: f64,
    /// Lower edge of the vocal band in Hz
    pub band_low_hz: f64,
    /// Upper edge of the vocal band in Hz
    pub band_high_hz: f64,
    /// How band edges map to FFT bins
    pub band_search: BandSearch,
    /// Vocal/instrumental band energy ratio below which the vocal is masked
    pub target_prominence: f64,
    /// Cap on the vocal boost when masked
    pub max_vocal_gain: f32,
    /// Instrumental gain when the vocal is masked
    pub masked_instrumental_gain: f32,
    /// Numerator of the RMS-based instrumental gain when the vocal is prominent
    pub instrumental_reference: f64,
    /// Bounds of the RMS-based instrumental gain
    pub instrumental_gain_range: GainRange,
    /// Vocal gain when the vocal is prominent, before clamping
    pub prominent_vocal_gain: f32,
    /// Bounds applied to `prominent_vocal_gain`
    pub vocal_gain_range: GainRange,
    /// Peak/RMS ratio below which the vocal counts as heavily compressed
    pub compressed_dynamic_range: f64,
    /// Vocal gain multiplier for heavily compressed vocals
    pub compressed_vocal_scale: f32,
}

impl Default for BalancePolicy {
    fn default() -> Self {
        Self {
            epsilon: 1e-10,
            band_low_hz: 300.0,
            band_high_hz: 3000.0,
            band_search: BandSearch::Clamped,
            target_prominence: 1.5,
            max_vocal_gain: 2.0,
            masked_instrumental_gain: 0.7,
            instrumental_reference: 0.8,
            instrumental_gain_range: GainRange::new(0.3, 1.0),
            prominent_vocal_gain: 1.0,
            vocal_gain_range: GainRange::new(0.5, 2.0),
            compressed_dynamic_range: 3.0,
            compressed_vocal_scale: 0.9,
        }
    }
}

/// Loudness and spectral measurements of one stem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackMetrics {
    /// Epsilon-guarded RMS over all samples
    pub rms: f64,
    /// Maximum absolute sample
    pub peak: f32,
    /// Spectral energy inside the vocal band (mono mixdown)
    pub band_energy: f64,
    /// Peak / (RMS + epsilon)
    pub dynamic_range: f64,
}

impl TrackMetrics {
    /// Measure a buffer with the policy's band and epsilon
    pub fn measure(buffer: &AudioBuffer, policy: &BalancePolicy) -> Self {
        let samples = buffer.samples();
        let rms = calculate_rms_guarded(samples, policy.epsilon);
        let peak = calculate_peak(samples);
        let band_energy = band_energy(
            &buffer.mono_mixdown(),
            buffer.sample_rate(),
            policy.band_low_hz,
            policy.band_high_hz,
            policy.band_search,
            policy.epsilon,
        );

        Self {
            rms,
            peak,
            band_energy,
            dynamic_range: dynamic_range(samples, policy.epsilon),
        }
    }
}

/// Which rule set produced the gains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceBranch {
    /// Vocal band energy below the prominence target: boost vocal, duck instrumental
    Masked,
    /// Vocal already prominent: unity vocal, instrumental set from the RMS ratio
    Prominent,
}

/// Full record of one balancing decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceAnalysis {
    pub instrumental: TrackMetrics,
    pub vocal: TrackMetrics,
    /// Vocal RMS / instrumental RMS
    pub rms_ratio: f64,
    /// Vocal band energy / (instrumental band energy + epsilon)
    pub freq_ratio: f64,
    pub branch: BalanceBranch,
    /// The compressed-vocal reduction was applied
    pub vocal_compressed: bool,
    pub gains: GainPair,
}

impl BalancePolicy {
    /// Turn two sets of measurements into gains
    pub fn decide(&self, instrumental: &TrackMetrics, vocal: &TrackMetrics) -> BalanceAnalysis {
        let rms_ratio = vocal.rms / instrumental.rms;
        let freq_ratio = vocal.band_energy / (instrumental.band_energy + self.epsilon);

        let (branch, instrumental_gain, mut vocal_gain) = if freq_ratio < self.target_prominence {
            let boost = (self.target_prominence / freq_ratio).min(self.max_vocal_gain as f64);
            (
                BalanceBranch::Masked,
                self.masked_instrumental_gain as f64,
                boost,
            )
        } else {
            (
                BalanceBranch::Prominent,
                self.instrumental_gain_range
                    .clamp(self.instrumental_reference / rms_ratio),
                self.vocal_gain_range.clamp(self.prominent_vocal_gain as f64),
            )
        };

        let vocal_compressed = vocal.dynamic_range < self.compressed_dynamic_range;
        if vocal_compressed {
            vocal_gain *= self.compressed_vocal_scale as f64;
        }

        BalanceAnalysis {
            instrumental: *instrumental,
            vocal: *vocal,
            rms_ratio,
            freq_ratio,
            branch,
            vocal_compressed,
            gains: GainPair {
                instrumental_gain: instrumental_gain as f32,
                vocal_gain: vocal_gain as f32,
            },
        }
    }
}

/// Stem balancer
#[derive(Debug, Clone, Default)]
pub struct Balancer {
    policy: BalancePolicy,
}

impl Balancer {
    pub fn new(policy: BalancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BalancePolicy {
        &self.policy
    }

    /// Measure both stems over their common length and decide the gains
    pub fn analyze(
        &self,
        instrumental: &AudioBuffer,
        vocal: &AudioBuffer,
    ) -> Result<BalanceAnalysis> {
        instrumental.validate()?;
        vocal.validate()?;
        instrumental.ensure_compatible(vocal)?;

        let frames = instrumental.num_frames().min(vocal.num_frames());
        let instrumental_metrics =
            TrackMetrics::measure(&instrumental.truncated(frames), &self.policy);
        let vocal_metrics = TrackMetrics::measure(&vocal.truncated(frames), &self.policy);

        debug!(
            "Instr: rms {:.4}, band {:.3e}, dr {:.2} | vocal: rms {:.4}, band {:.3e}, dr {:.2}",
            instrumental_metrics.rms,
            instrumental_metrics.band_energy,
            instrumental_metrics.dynamic_range,
            vocal_metrics.rms,
            vocal_metrics.band_energy,
            vocal_metrics.dynamic_range
        );

        let analysis = self.policy.decide(&instrumental_metrics, &vocal_metrics);

        info!(
            "Balance: {:?} (freq ratio {:.3}), instrumental x{:.3}, vocal x{:.3}{}",
            analysis.branch,
            analysis.freq_ratio,
            analysis.gains.instrumental_gain,
            analysis.gains.vocal_gain,
            if analysis.vocal_compressed {
                ", compressed vocal"
            } else {
                ""
            }
        );

        Ok(analysis)
    }

    /// Gains for mixing `vocal` over `instrumental`
    pub fn compute_gains(
        &self,
        instrumental: &AudioBuffer,
        vocal: &AudioBuffer,
    ) -> Result<GainPair> {
        Ok(self.analyze(instrumental, vocal)?.gains)
    }
}

/// Compute gains with the default policy
pub fn compute_gains(instrumental: &AudioBuffer, vocal: &AudioBuffer) -> Result<GainPair> {
    Balancer::default().compute_gains(instrumental, vocal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn metrics(rms: f64, band_energy: f64, dynamic_range: f64) -> TrackMetrics {
        TrackMetrics {
            rms,
            peak: (rms * dynamic_range) as f32,
            band_energy,
            dynamic_range,
        }
    }

    #[test]
    fn test_masked_vocal_is_boosted_to_cap() {
        let policy = BalancePolicy::default();
        let instrumental = metrics(0.2, 100.0, 5.0);
        let vocal = metrics(0.05, 50.0, 5.0);

        let analysis = policy.decide(&instrumental, &vocal);

        assert_eq!(analysis.branch, BalanceBranch::Masked);
        assert_eq!(analysis.gains.instrumental_gain, 0.7);
        assert_eq!(analysis.gains.vocal_gain, 2.0);
        assert!(!analysis.vocal_compressed);
    }

    #[test]
    fn test_masked_vocal_boost_below_cap() {
        let policy = BalancePolicy::default();
        // freq ratio 1.0 -> boost 1.5
        let analysis = policy.decide(&metrics(0.2, 80.0, 5.0), &metrics(0.1, 80.0, 5.0));
        assert_eq!(analysis.branch, BalanceBranch::Masked);
        assert_relative_eq!(analysis.gains.vocal_gain, 1.5, max_relative = 1e-6);
    }

    #[test]
    fn test_prominent_vocal_keeps_unity() {
        let policy = BalancePolicy::default();
        // rms ratio 2.0 -> instrumental 0.8 / 2.0 = 0.4
        let analysis = policy.decide(&metrics(0.1, 10.0, 5.0), &metrics(0.2, 100.0, 5.0));
        assert_eq!(analysis.branch, BalanceBranch::Prominent);
        assert_eq!(analysis.gains.vocal_gain, 1.0);
        assert_relative_eq!(analysis.gains.instrumental_gain, 0.4, max_relative = 1e-6);
    }

    #[test]
    fn test_prominent_instrumental_gain_clamped() {
        let policy = BalancePolicy::default();
        // rms ratio 0.1 -> 8.0, clamped to 1.0
        let quiet_vocal = policy.decide(&metrics(0.5, 1.0, 5.0), &metrics(0.05, 10.0, 5.0));
        assert_eq!(quiet_vocal.gains.instrumental_gain, 1.0);

        // rms ratio 10 -> 0.08, clamped to 0.3
        let loud_vocal = policy.decide(&metrics(0.05, 1.0, 5.0), &metrics(0.5, 10.0, 5.0));
        assert_eq!(loud_vocal.gains.instrumental_gain, 0.3);
    }

    #[test]
    fn test_compressed_vocal_is_reduced() {
        let policy = BalancePolicy::default();
        let analysis = policy.decide(&metrics(0.1, 10.0, 5.0), &metrics(0.2, 100.0, 2.0));
        assert!(analysis.vocal_compressed);
        assert_relative_eq!(analysis.gains.vocal_gain, 0.9, max_relative = 1e-6);
    }

    #[test]
    fn test_prominence_threshold_boundary() {
        let policy = BalancePolicy::default();
        let above = policy.decide(&metrics(0.1, 100.0, 5.0), &metrics(0.1, 150.01, 5.0));
        assert_eq!(above.branch, BalanceBranch::Prominent);

        let below = policy.decide(&metrics(0.1, 100.0, 5.0), &metrics(0.1, 149.99, 5.0));
        assert_eq!(below.branch, BalanceBranch::Masked);
    }

    #[test]
    fn test_gain_bounds_hold_for_random_metrics() {
        let policy = BalancePolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..5000 {
            let instrumental = metrics(
                rng.gen_range(1e-5..1.0),
                rng.gen_range(0.0..1e6),
                rng.gen_range(0.0..20.0),
            );
            let vocal = metrics(
                rng.gen_range(1e-5..1.0),
                rng.gen_range(0.0..1e6),
                rng.gen_range(0.0..20.0),
            );
            let gains = policy.decide(&instrumental, &vocal).gains;

            assert!(
                (0.3..=1.0).contains(&gains.instrumental_gain)
                    || gains.instrumental_gain == 0.7,
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

    #[test]
    fn test_analyze_silent_stems_is_finite() {
        let silence = AudioBuffer::silence(0.5, 1, 44100);
        let analysis = Balancer::default().analyze(&silence, &silence).unwrap();
        assert!(analysis.gains.instrumental_gain.is_finite());
        assert!(analysis.gains.vocal_gain.is_finite());
    }

    #[test]
    fn test_analyze_uses_common_length() {
        let instrumental = AudioBuffer::sine_wave(200.0, 1.0, 44100);
        let vocal = AudioBuffer::sine_wave(1000.0, 0.5, 44100);
        let analysis = Balancer::default().analyze(&instrumental, &vocal).unwrap();

        // 200 Hz sits below the band, so the vocal tone dominates there
        assert_eq!(analysis.branch, BalanceBranch::Prominent);
        // Both unit sines: equal RMS over the common half second
        assert_relative_eq!(analysis.rms_ratio, 1.0, max_relative = 1e-3);
    }

    #[test]
    fn test_gain_pair_rejects_negative() {
        assert!(GainPair::new(-0.1, 1.0).is_err());
        assert!(GainPair::new(1.0, f32::NAN).is_err());
        assert!(GainPair::new(0.0, 2.5).is_ok());
    }
}
