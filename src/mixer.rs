//! Weighted two-stem mixer

use crate::audio::AudioBuffer;
use crate::balance::GainPair;
use crate::error::Result;
use log::debug;

/// Sum `instrumental * instrumental_gain + vocal * vocal_gain` sample by sample.
///
/// Both inputs are truncated to the shorter one's frame count. The output is
/// not range-limited; run it through the normalizer before encoding.
pub fn mix(
    instrumental: &AudioBuffer,
    vocal: &AudioBuffer,
    gains: GainPair,
) -> Result<AudioBuffer> {
    instrumental.validate()?;
    vocal.validate()?;
    instrumental.ensure_compatible(vocal)?;

    let frames = instrumental.num_frames().min(vocal.num_frames());
    let len = frames * instrumental.channels() as usize;

    let mixed: Vec<f32> = instrumental.samples()[..len]
        .iter()
        .zip(&vocal.samples()[..len])
        .map(|(&i, &v)| i * gains.instrumental_gain + v * gains.vocal_gain)
        .collect();

    debug!(
        "Mixed {} frames (instrumental {} / vocal {})",
        frames,
        instrumental.num_frames(),
        vocal.num_frames()
    );

    AudioBuffer::new(mixed, instrumental.channels(), instrumental.sample_rate())
}
