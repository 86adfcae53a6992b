//! Peak-scale normalization
//!
//! A single linear gain is applied to the whole buffer: loud mixes are scaled
//! so their peak lands on a ceiling, quiet mixes get a capped boost. This is
//! not a limiter or compressor; the waveform shape is never changed.

use crate::audio::analysis::{calculate_peak, linear_to_db};
use crate::audio::AudioBuffer;
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};

/// Normalization thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizePolicy {
    /// Peaks strictly above this are scaled down to `ceiling`
    pub clip_threshold: f32,
    /// Peak level after scaling down
    pub ceiling: f32,
    /// Non-zero peaks strictly below this are boosted
    pub quiet_threshold: f32,
    /// Peak level a quiet mix is boosted toward
    pub quiet_target: f32,
    /// Largest boost factor for quiet mixes
    pub max_boost: f32,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            clip_threshold: 1.0,
            ceiling: 0.95,
            quiet_threshold: 0.3,
            quiet_target: 0.7,
            max_boost: 2.0,
        }
    }
}

/// What the normalizer did
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NormalizeAction {
    /// Peak was above the clip threshold and was scaled down
    Attenuated { peak: f32, scale: f32 },
    /// Peak was quiet and was scaled up (possibly short of the target)
    Boosted { peak: f32, scale: f32 },
    /// Peak was within range, or the buffer was silent
    Unchanged { peak: f32 },
}

impl NormalizeAction {
    /// Linear factor applied to every sample
    pub fn scale(&self) -> f32 {
        match *self {
            Self::Attenuated { scale, .. } | Self::Boosted { scale, .. } => scale,
            Self::Unchanged { .. } => 1.0,
        }
    }
}

impl NormalizePolicy {
    /// Decide the gain for a buffer whose absolute peak is `peak`
    pub fn action_for(&self, peak: f32) -> NormalizeAction {
        if peak > self.clip_threshold {
            NormalizeAction::Attenuated {
                peak,
                scale: self.ceiling / peak,
            }
        } else if peak > 0.0 && peak < self.quiet_threshold {
            NormalizeAction::Boosted {
                peak,
                scale: (self.quiet_target / peak).min(self.max_boost),
            }
        } else {
            // A silent buffer has no meaningful boost target
            NormalizeAction::Unchanged { peak }
        }
    }
}

/// Normalized buffer together with the action taken
#[derive(Debug, Clone)]
pub struct Normalized {
    pub buffer: AudioBuffer,
    pub action: NormalizeAction,
}

/// Scale `mixed` by one linear factor chosen from its peak.
///
/// Takes ownership of the buffer and scales it in place.
pub fn peak_scale_normalize(
    mut mixed: AudioBuffer,
    policy: &NormalizePolicy,
) -> Result<Normalized> {
    mixed.validate()?;

    let action = policy.action_for(calculate_peak(mixed.samples()));
    match action {
        NormalizeAction::Unchanged { peak } => {
            info!("Normalize: peak {:.1} dBFS left unchanged", linear_to_db(peak));
        }
        NormalizeAction::Attenuated { peak, scale } | NormalizeAction::Boosted { peak, scale } => {
            info!(
                "Normalize: peak {:.1} dBFS scaled by {:.3} ({:+.1} dB)",
                linear_to_db(peak),
                scale,
                linear_to_db(scale)
            );
            mixed.apply_gain(scale);
        }
    }

    Ok(Normalized {
        buffer: mixed,
        action,
    })
}

/// Normalize with the default thresholds
pub fn normalize(mixed: AudioBuffer) -> Result<AudioBuffer> {
    Ok(peak_scale_normalize(mixed, &NormalizePolicy::default())?.buffer)
}
