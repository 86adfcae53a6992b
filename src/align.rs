//! Time alignment by cross-correlation
//!
//! The aligner estimates how far a target recording is shifted against a
//! reference and returns the target moved by that amount and fitted to the
//! reference length.
//!
//! Only the opening `max_window_secs` of each buffer are correlated. Offsets
//! that only show up after that window cannot be detected.
//!
//! Multichannel buffers are correlated on their mono mixdown; the resulting
//! frame offset is applied to every channel.

use crate::audio::AudioBuffer;
use crate::error::Result;
use log::{debug, info, warn};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Default analysis window in seconds
pub const DEFAULT_MAX_WINDOW_SECS: f64 = 30.0;

/// Aligner settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Length of the correlation window taken from the start of each buffer
    pub max_window_secs: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            max_window_secs: DEFAULT_MAX_WINDOW_SECS,
        }
    }
}

impl AlignConfig {
    /// Window length in frames at `sample_rate`
    pub fn window_frames(&self, sample_rate: u32) -> usize {
        (self.max_window_secs * sample_rate as f64).max(0.0) as usize
    }
}

/// Signed frame shift to apply to the target.
///
/// Positive values delay the target (silence is inserted at its start);
/// zero or negative values advance it (frames are dropped from its start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlignmentOffset(pub i64);

impl AlignmentOffset {
    /// Offset in frames
    pub fn frames(self) -> i64 {
        self.0
    }

    /// Offset in seconds at `sample_rate`
    pub fn as_secs(self, sample_rate: u32) -> f64 {
        self.0 as f64 / sample_rate as f64
    }
}

/// Cross-correlation aligner
#[derive(Debug, Clone, Default)]
pub struct Aligner {
    config: AlignConfig,
}

impl Aligner {
    pub fn new(config: AlignConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Estimate the offset that lines `target` up with `reference`
    pub fn estimate_offset(
        &self,
        reference: &AudioBuffer,
        target: &AudioBuffer,
    ) -> Result<AlignmentOffset> {
        reference.validate()?;
        target.validate()?;
        reference.ensure_compatible(target)?;

        // At least one frame is always correlated
        let window = self.config.window_frames(reference.sample_rate()).max(1);
        let ref_window = reference.truncated(window).mono_mixdown();
        let target_window = target.truncated(window).mono_mixdown();

        if is_silent(&ref_window) || is_silent(&target_window) {
            warn!("Correlation window is silent; leaving the target unshifted");
            return Ok(AlignmentOffset(0));
        }

        let correlation = cross_correlate_full(&ref_window, &target_window);
        let peak_index = argmax(&correlation);
        let offset = peak_index as i64 - (target_window.len() as i64 - 1);

        debug!(
            "Correlated {} x {} frames, peak at index {} -> offset {} frames",
            ref_window.len(),
            target_window.len(),
            peak_index,
            offset
        );

        Ok(AlignmentOffset(offset))
    }

    /// Return `target` shifted onto `reference`, with the reference's length
    pub fn align(&self, reference: &AudioBuffer, target: &AudioBuffer) -> Result<AudioBuffer> {
        let offset = self.estimate_offset(reference, target)?;
        Ok(apply_offset(reference, target, offset))
    }
}

/// Align with the default 30 second window
pub fn align(reference: &AudioBuffer, target: &AudioBuffer) -> Result<AudioBuffer> {
    Aligner::default().align(reference, target)
}

/// Shift the full `target` by `offset` and fit it to the reference length
pub fn apply_offset(
    reference: &AudioBuffer,
    target: &AudioBuffer,
    offset: AlignmentOffset,
) -> AudioBuffer {
    info!(
        "Applying alignment offset of {} frames ({:.3}s)",
        offset.frames(),
        offset.as_secs(reference.sample_rate())
    );
    target.shifted(offset.frames(), reference.num_frames())
}

/// Full (non-circular) cross-correlation of `a` against `v`.
///
/// Output has `a.len() + v.len() - 1` entries; entry `k` holds
/// `sum_n a[n + k - (v.len() - 1)] * v[n]`. Computed by zero-padded FFT in
/// double precision.
pub fn cross_correlate_full(a: &[f32], v: &[f32]) -> Vec<f64> {
    if a.is_empty() || v.is_empty() {
        return Vec::new();
    }

    let full_len = a.len() + v.len() - 1;
    let fft_len = full_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut spec_a = padded(a, fft_len);
    let mut spec_v = padded(v, fft_len);
    forward.process(&mut spec_a);
    forward.process(&mut spec_v);

    for (x, y) in spec_a.iter_mut().zip(spec_v.iter()) {
        *x *= y.conj();
    }
    inverse.process(&mut spec_a);

    // Circular lag j maps to full index j + (v.len() - 1); negative lags wrap
    let scale = 1.0 / fft_len as f64;
    let lead = v.len() - 1;
    (0..full_len)
        .map(|k| {
            let circular = if k >= lead { k - lead } else { fft_len - (lead - k) };
            spec_a[circular].re * scale
        })
        .collect()
}

fn padded(samples: &[f32], len: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); len];
    for (slot, &s) in out.iter_mut().zip(samples) {
        slot.re = s as f64;
    }
    out
}

/// Index of the first maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|&s| s == 0.0)
}
