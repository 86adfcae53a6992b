//! Audio file I/O operations
//!
//! Decode and encode collaborators for the mixing core. Loading uses the
//! hound crate for WAV parsing and rubato for sample rate conversion; saving
//! writes 32-bit float or 16/24-bit integer WAV.

use crate::audio::AudioBuffer;
use crate::error::{Result, StemSyncError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;

/// How a source file is brought into the pipeline's common format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Target sample rate in Hz; files at other rates are resampled
    pub sample_rate: u32,
    /// Average all channels into one
    pub mono: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            mono: true,
        }
    }
}

/// Load a WAV file into an AudioBuffer
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let read_err = |e| StemSyncError::AudioReadError {
        path: path.display().to_string(),
        source: e,
    };

    let reader = WavReader::open(path).map_err(read_err)?;

    let spec = reader.spec();
    let channels = spec.channels;
    let sample_rate = spec.sample_rate;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(read_err))
            .collect::<Result<Vec<f32>>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(StemSyncError::UnsupportedFormat {
                    details: format!("{}-bit integer WAV", bits),
                });
            }
            let max_val = (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val).map_err(read_err))
                .collect::<Result<Vec<f32>>>()?
        }
    };

    debug!(
        "Loaded {}: {} ch @ {} Hz, {} samples",
        path.display(),
        channels,
        sample_rate,
        samples.len()
    );

    AudioBuffer::new(samples, channels, sample_rate)
}

/// Load a WAV file and convert it to the requested rate and layout
pub fn load_wav_as<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<AudioBuffer> {
    let mut buffer = load_wav(path)?;
    if options.mono && buffer.channels() > 1 {
        buffer = buffer.to_mono();
    }
    if buffer.sample_rate() != options.sample_rate {
        buffer = resample(&buffer, options.sample_rate)?;
    }
    Ok(buffer)
}

/// Resample a buffer to `target_rate` using band-limited sinc interpolation.
///
/// The whole buffer is processed as a single chunk. The interpolator's output
/// delay is trimmed and its tail flushed, so the result starts on time and
/// holds `ceil(frames * target_rate / source_rate)` frames.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if target_rate == 0 {
        return Err(StemSyncError::ResampleError {
            details: "target sample rate must be positive".to_string(),
        });
    }
    if buffer.sample_rate() == target_rate {
        return Ok(buffer.clone());
    }

    let channels = buffer.channels() as usize;
    let ratio = target_rate as f64 / buffer.sample_rate() as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, buffer.num_frames(), channels)
        .map_err(resample_error)?;

    let delay = resampler.output_delay();
    let expected = (buffer.num_frames() as u64 * target_rate as u64)
        .div_ceil(buffer.sample_rate() as u64) as usize;

    let waves_in: Vec<Vec<f32>> = (0..buffer.channels())
        .map(|c| buffer.channel_samples(c))
        .collect();
    let mut waves_out = resampler.process(&waves_in, None).map_err(resample_error)?;

    // Feed silence until the delayed tail has come out
    while waves_out.first().map_or(0, Vec::len) < delay + expected {
        let flushed = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(resample_error)?;
        if flushed.first().map_or(true, Vec::is_empty) {
            break;
        }
        for (wave, tail) in waves_out.iter_mut().zip(flushed) {
            wave.extend(tail);
        }
    }

    let available = waves_out.first().map_or(0, Vec::len);
    let frames = expected.min(available.saturating_sub(delay));
    let mut samples = Vec::with_capacity(frames * channels);
    for frame in delay..delay + frames {
        for wave in &waves_out {
            samples.push(wave[frame]);
        }
    }

    debug!(
        "Resampled {} Hz -> {} Hz ({} -> {} frames, {} frames delay trimmed)",
        buffer.sample_rate(),
        target_rate,
        buffer.num_frames(),
        frames,
        delay
    );

    AudioBuffer::new(samples, buffer.channels(), target_rate)
}

fn resample_error(e: impl std::fmt::Display) -> StemSyncError {
    StemSyncError::ResampleError {
        details: e.to_string(),
    }
}

/// Save an AudioBuffer to a WAV file (32-bit float)
pub fn save_wav<P: AsRef<Path>>(buffer: &AudioBuffer, path: P) -> Result<()> {
    save_wav_with_depth(buffer, path, 32)
}

/// Save an AudioBuffer to a WAV file with specific bit depth.
///
/// 32 bits writes IEEE float; 16 and 24 bits write clamped integer PCM.
pub fn save_wav_with_depth<P: AsRef<Path>>(
    buffer: &AudioBuffer,
    path: P,
    bits: u16,
) -> Result<()> {
    let path = path.as_ref();
    let write_err = |e| StemSyncError::AudioWriteError {
        path: path.display().to_string(),
        source: e,
    };

    let sample_format = match bits {
        32 => SampleFormat::Float,
        16 | 24 => SampleFormat::Int,
        other => {
            return Err(StemSyncError::UnsupportedFormat {
                details: format!("{}-bit output (use 16, 24 or 32)", other),
            })
        }
    };

    let spec = WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: bits,
        sample_format,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_err)?;

    match sample_format {
        SampleFormat::Float => {
            for &sample in buffer.samples() {
                writer.write_sample(sample).map_err(write_err)?;
            }
        }
        SampleFormat::Int => {
            let max_val = ((1u32 << (bits - 1)) - 1) as f32;
            for &sample in buffer.samples() {
                let clamped = sample.clamp(-1.0, 1.0);
                writer
                    .write_sample((clamped * max_val) as i32)
                    .map_err(write_err)?;
            }
        }
    }

    writer.finalize().map_err(write_err)?;

    debug!("Wrote {} ({}-bit)", path.display(), bits);
    Ok(())
}
