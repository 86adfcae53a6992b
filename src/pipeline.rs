//! Align, balance, mix and normalize in one call
//!
//! `MixEngine` runs the stages strictly in order on in-memory buffers:
//! the vocal (and optionally the instrumental) is aligned to the reference,
//! gains are derived from the aligned stems, the stems are mixed and the mix
//! is peak-normalized. `MixEngine::analyze` stops after the gain decision.
//! No state is kept between calls.

use crate::align::{apply_offset, Aligner, AlignmentOffset};
use crate::audio::AudioBuffer;
use crate::balance::{BalanceAnalysis, Balancer, GainPair};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::mixer::mix;
use crate::normalize::{peak_scale_normalize, NormalizeAction};
use log::info;
use serde::{Deserialize, Serialize};

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct MixOutcome {
    /// Normalized mix, ready for encoding
    pub buffer: AudioBuffer,
    pub report: MixReport,
}

/// Everything the pipeline decided, without the audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixReport {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub vocal_offset: AlignmentOffset,
    pub vocal_offset_secs: f64,
    /// Present when the instrumental was aligned as well
    pub instrumental_offset: Option<AlignmentOffset>,
    pub gains: GainPair,
    /// Absent when gains were supplied manually
    pub balance: Option<BalanceAnalysis>,
    pub normalization: NormalizeAction,
}

/// Offsets and balance decision for one set of stems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixAnalysis {
    pub vocal_offset: AlignmentOffset,
    pub vocal_offset_secs: f64,
    /// Present when the instrumental was aligned as well
    pub instrumental_offset: Option<AlignmentOffset>,
    pub balance: BalanceAnalysis,
}

/// The full alignment and adaptive mix pipeline
#[derive(Debug, Clone, Default)]
pub struct MixEngine {
    config: EngineConfig,
    gain_override: Option<GainPair>,
}

impl MixEngine {
    /// Create an engine from a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gain_override: None,
        })
    }

    /// Use fixed gains instead of the balancer
    pub fn with_gains(mut self, gains: GainPair) -> Self {
        self.gain_override = Some(gains);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Offsets and gain decision for the stems, without mixing.
    ///
    /// Measures exactly the buffers `process` would mix.
    pub fn analyze(
        &self,
        reference: &AudioBuffer,
        instrumental: &AudioBuffer,
        vocal: &AudioBuffer,
    ) -> Result<MixAnalysis> {
        let aligned = self.align_stems(reference, instrumental, vocal)?;
        let balance = Balancer::new(self.config.balance)
            .analyze(&aligned.instrumental, &aligned.vocal)?;

        Ok(MixAnalysis {
            vocal_offset: aligned.vocal_offset,
            vocal_offset_secs: aligned.vocal_offset.as_secs(reference.sample_rate()),
            instrumental_offset: aligned.instrumental_offset,
            balance,
        })
    }

    /// Mix `vocal` over `instrumental`, both lined up against `reference`
    pub fn process(
        &self,
        reference: &AudioBuffer,
        instrumental: &AudioBuffer,
        vocal: &AudioBuffer,
    ) -> Result<MixOutcome> {
        let aligned = self.align_stems(reference, instrumental, vocal)?;

        let (gains, balance) = match self.gain_override {
            Some(gains) => {
                info!(
                    "Using manual gains: instrumental x{:.3}, vocal x{:.3}",
                    gains.instrumental_gain, gains.vocal_gain
                );
                (gains, None)
            }
            None => {
                let analysis = Balancer::new(self.config.balance)
                    .analyze(&aligned.instrumental, &aligned.vocal)?;
                (analysis.gains, Some(analysis))
            }
        };

        let mixed = mix(&aligned.instrumental, &aligned.vocal, gains)?;
        let normalized = peak_scale_normalize(mixed, &self.config.normalize)?;
        let buffer = normalized.buffer;

        let report = MixReport {
            sample_rate: buffer.sample_rate(),
            channels: buffer.channels(),
            frames: buffer.num_frames(),
            vocal_offset: aligned.vocal_offset,
            vocal_offset_secs: aligned.vocal_offset.as_secs(reference.sample_rate()),
            instrumental_offset: aligned.instrumental_offset,
            gains,
            balance,
            normalization: normalized.action,
        };

        Ok(MixOutcome { buffer, report })
    }

    /// Align the vocal, and the instrumental when configured, to the reference
    fn align_stems(
        &self,
        reference: &AudioBuffer,
        instrumental: &AudioBuffer,
        vocal: &AudioBuffer,
    ) -> Result<AlignedStems> {
        for buffer in [reference, instrumental, vocal] {
            buffer.validate()?;
        }
        reference.ensure_compatible(instrumental)?;
        reference.ensure_compatible(vocal)?;

        let aligner = Aligner::new(self.config.align);

        let vocal_offset = aligner.estimate_offset(reference, vocal)?;
        let vocal = apply_offset(reference, vocal, vocal_offset);

        let (instrumental, instrumental_offset) = if self.config.align_instrumental {
            let offset = aligner.estimate_offset(reference, instrumental)?;
            (apply_offset(reference, instrumental, offset), Some(offset))
        } else {
            (instrumental.clone(), None)
        };

        Ok(AlignedStems {
            instrumental,
            vocal,
            vocal_offset,
            instrumental_offset,
        })
    }
}

struct AlignedStems {
    instrumental: AudioBuffer,
    vocal: AudioBuffer,
    vocal_offset: AlignmentOffset,
    instrumental_offset: Option<AlignmentOffset>,
}
