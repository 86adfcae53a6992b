//! Audio buffer implementation
//!
//! AudioBuffer is the core data structure passed between pipeline stages.
//! Stages never mutate their inputs; each one returns a fresh buffer.

use crate::error::{Result, StemSyncError};

/// Audio sample data with metadata
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Interleaved audio samples, nominally in -1.0..1.0
    samples: Vec<f32>,
    /// Number of audio channels (1 = mono, 2 = stereo)
    channels: u16,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new audio buffer with the given parameters
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(StemSyncError::EmptyBuffer);
        }
        if channels == 0 {
            return Err(StemSyncError::UnsupportedFormat {
                details: "Channel count must be at least 1".to_string(),
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(StemSyncError::UnsupportedFormat {
                details: format!(
                    "Sample count {} is not divisible by channel count {}",
                    samples.len(),
                    channels
                ),
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Create a mono buffer from raw samples
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, 1, sample_rate)
    }

    /// Create a silent buffer with the given duration
    pub fn silence(duration_secs: f32, channels: u16, sample_rate: u32) -> Self {
        let num_frames = (duration_secs * sample_rate as f32) as usize;
        Self::zeroed(num_frames, channels, sample_rate)
    }

    /// Create a silent buffer with an exact frame count
    pub fn zeroed(num_frames: usize, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; num_frames * channels as usize],
            channels,
            sample_rate,
        }
    }

    /// Create a mono sine wave test tone with unit amplitude
    pub fn sine_wave(frequency: f32, duration_secs: f32, sample_rate: u32) -> Self {
        let num_samples = (duration_secs * sample_rate as f32) as usize;
        let step = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;
        let samples = (0..num_samples)
            .map(|i| (step * i as f64).sin() as f32)
            .collect();

        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    /// Get a reference to the samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get the number of channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Get the duration in seconds
    pub fn duration(&self) -> f32 {
        self.num_frames() as f32 / self.sample_rate as f32
    }

    /// True if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get samples for a specific channel (0-indexed)
    pub fn channel_samples(&self, channel: u16) -> Vec<f32> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(channel as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }

    /// Average all channels into one mono signal
    pub fn mono_mixdown(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        let scale = 1.0 / self.channels as f32;
        self.samples
            .chunks_exact(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    }

    /// Convert to a mono buffer at the same sample rate
    pub fn to_mono(&self) -> Self {
        Self {
            samples: self.mono_mixdown(),
            channels: 1,
            sample_rate: self.sample_rate,
        }
    }

    /// Copy of the first `num_frames` frames (or all of them if shorter)
    pub fn truncated(&self, num_frames: usize) -> Self {
        let end = num_frames.min(self.num_frames()) * self.channels as usize;
        Self {
            samples: self.samples[..end].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Shift the content by `offset` frames and fit it to `num_frames`.
    ///
    /// A positive offset delays the content (zeros are inserted at the start);
    /// a negative one drops `|offset|` frames from the start. The result is
    /// then zero-padded or truncated at the tail to exactly `num_frames`.
    pub fn shifted(&self, offset: i64, num_frames: usize) -> Self {
        let ch = self.channels as usize;
        let src_frames = self.num_frames() as i64;
        let mut samples = vec![0.0; num_frames * ch];

        for (frame, out) in samples.chunks_exact_mut(ch).enumerate() {
            let src = frame as i64 - offset;
            if (0..src_frames).contains(&src) {
                let start = src as usize * ch;
                out.copy_from_slice(&self.samples[start..start + ch]);
            }
        }

        Self {
            samples,
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Apply gain in linear scale
    pub fn apply_gain(&mut self, gain: f32) {
        for sample in &mut self.samples {
            *sample *= gain;
        }
    }

    /// Reject empty buffers and NaN/Inf samples
    pub fn validate(&self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(StemSyncError::EmptyBuffer);
        }
        if let Some(index) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(StemSyncError::NonFiniteSample { index });
        }
        Ok(())
    }

    /// Check that `other` shares this buffer's sample rate and channel layout
    pub fn ensure_compatible(&self, other: &AudioBuffer) -> Result<()> {
        if self.sample_rate != other.sample_rate {
            return Err(StemSyncError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: other.sample_rate,
            });
        }
        if self.channels != other.channels {
            return Err(StemSyncError::ChannelMismatch {
                expected: self.channels,
                actual: other.channels,
            });
        }
        Ok(())
    }

    /// Check if buffers are identical (bit-perfect comparison)
    pub fn is_identical_to(&self, other: &AudioBuffer) -> bool {
        self.channels == other.channels
            && self.sample_rate == other.sample_rate
            && self.samples == other.samples
    }

    /// Check if buffers are approximately equal within tolerance
    pub fn is_approx_equal(&self, other: &AudioBuffer, tolerance: f32) -> bool {
        if self.channels != other.channels || self.sample_rate != other.sample_rate {
            return false;
        }
        if self.samples.len() != other.samples.len() {
            return false;
        }
        self.samples
            .iter()
            .zip(other.samples.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}
