//! Engine configuration
//!
//! Every tunable of the pipeline in one serde struct, stored as JSON. Missing
//! fields fall back to their defaults, so a file only needs the values it
//! overrides.

use crate::align::AlignConfig;
use crate::balance::{BalancePolicy, GainRange};
use crate::error::{Result, StemSyncError};
use crate::normalize::NormalizePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sample rate every source is decoded at unless configured otherwise
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rate all three sources are decoded at
    pub sample_rate: u32,
    /// Average stereo sources to mono on load
    pub downmix_to_mono: bool,
    /// Also align the instrumental to the reference, not just the vocal
    pub align_instrumental: bool,
    pub align: AlignConfig,
    pub balance: BalancePolicy,
    pub normalize: NormalizePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            downmix_to_mono: true,
            align_instrumental: false,
            align: AlignConfig::default(),
            balance: BalancePolicy::default(),
            normalize: NormalizePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if !(self.align.max_window_secs.is_finite() && self.align.max_window_secs > 0.0) {
            return Err(invalid("align.max_window_secs", "must be a positive number of seconds"));
        }

        let balance = &self.balance;
        if !(balance.epsilon.is_finite() && balance.epsilon > 0.0) {
            return Err(invalid("balance.epsilon", "must be positive"));
        }
        if !(0.0..balance.band_high_hz).contains(&balance.band_low_hz) {
            return Err(invalid(
                "balance.band_low_hz",
                "must be non-negative and below band_high_hz",
            ));
        }
        if !(balance.target_prominence.is_finite() && balance.target_prominence > 0.0) {
            return Err(invalid("balance.target_prominence", "must be positive"));
        }
        check_range("balance.instrumental_gain_range", &balance.instrumental_gain_range)?;
        check_range("balance.vocal_gain_range", &balance.vocal_gain_range)?;
        for (field, value) in [
            ("balance.max_vocal_gain", balance.max_vocal_gain),
            ("balance.masked_instrumental_gain", balance.masked_instrumental_gain),
            ("balance.prominent_vocal_gain", balance.prominent_vocal_gain),
            ("balance.compressed_vocal_scale", balance.compressed_vocal_scale),
        ] {
            check_gain(field, value)?;
        }

        let normalize = &self.normalize;
        for (field, value) in [
            ("normalize.clip_threshold", normalize.clip_threshold),
            ("normalize.ceiling", normalize.ceiling),
            ("normalize.quiet_threshold", normalize.quiet_threshold),
            ("normalize.quiet_target", normalize.quiet_target),
            ("normalize.max_boost", normalize.max_boost),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, "must be positive"));
            }
        }
        if normalize.quiet_threshold > normalize.clip_threshold {
            return Err(invalid(
                "normalize.quiet_threshold",
                "must not exceed clip_threshold",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> StemSyncError {
    StemSyncError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn check_gain(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite, non-negative gain"))
    }
}

fn check_range(field: &str, range: &GainRange) -> Result<()> {
    check_gain(field, range.min)?;
    check_gain(field, range.max)?;
    if range.min > range.max {
        return Err(invalid(field, "min must not exceed max"));
    }
    Ok(())
}
