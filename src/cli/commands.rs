//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command: decode the sources,
//! hand the buffers to the engine, encode the result.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::align::Aligner;
use crate::audio::{load_wav_as, save_wav, save_wav_with_depth, AudioBuffer, LoadOptions};
use crate::balance::GainPair;
use crate::config::EngineConfig;
use crate::pipeline::{MixAnalysis, MixEngine, MixReport};

/// Report written next to a rendered mix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderReport {
    pub output: String,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub mix: MixReport,
}

/// Options for the `mix` command
#[derive(Debug, Clone, Default)]
pub struct MixOptions {
    pub gains: Option<GainPair>,
    pub bits: u16,
    pub report: Option<std::path::PathBuf>,
}

/// Load the configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            EngineConfig::from_file(path)
                .with_context(|| format!("Invalid configuration file {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_source(path: &Path, config: &EngineConfig) -> Result<AudioBuffer> {
    let options = LoadOptions {
        sample_rate: config.sample_rate,
        mono: config.downmix_to_mono,
    };
    let buffer =
        load_wav_as(path, options).with_context(|| format!("Failed to load {}", path.display()))?;
    info!(
        "Loaded {} ({:.2}s, {} ch)",
        path.display(),
        buffer.duration(),
        buffer.channels()
    );
    Ok(buffer)
}

/// Align, balance, mix and save.
pub fn mix(
    config: &EngineConfig,
    original: &Path,
    instrumental: &Path,
    vocal: &Path,
    output: &Path,
    options: &MixOptions,
) -> Result<RenderReport> {
    info!("Mixing {} + {} -> {}", instrumental.display(), vocal.display(), output.display());

    let reference = load_source(original, config)?;
    let instrumental = load_source(instrumental, config)?;
    let vocal = load_source(vocal, config)?;

    let mut engine = MixEngine::new(config.clone())?;
    if let Some(gains) = options.gains {
        engine = engine.with_gains(gains);
    }

    let outcome = engine
        .process(&reference, &instrumental, &vocal)
        .context("Mixing failed")?;

    let bits = if options.bits == 0 { 32 } else { options.bits };
    save_wav_with_depth(&outcome.buffer, output, bits)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    let bytes = fs::read(output)?;
    let report = RenderReport {
        output: output.display().to_string(),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
        created_at: Utc::now(),
        mix: outcome.report,
    };

    if let Some(report_path) = &options.report {
        fs::write(report_path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
    }

    println!("Mix saved: {}", output.display());
    println!(
        "Vocal offset: {} samples ({:.3}s)",
        report.mix.vocal_offset.frames(),
        report.mix.vocal_offset_secs
    );
    println!(
        "Gains: instrumental x{:.3}, vocal x{:.3}",
        report.mix.gains.instrumental_gain, report.mix.gains.vocal_gain
    );

    Ok(report)
}

/// Align `target` to `reference` and save the shifted target.
pub fn align(config: &EngineConfig, reference: &Path, target: &Path, output: &Path) -> Result<i64> {
    info!("Aligning {} to {}", target.display(), reference.display());

    let reference = load_source(reference, config)?;
    let target = load_source(target, config)?;

    let aligner = Aligner::new(config.align);
    let offset = aligner.estimate_offset(&reference, &target)?;
    let aligned = crate::align::apply_offset(&reference, &target, offset);

    save_wav(&aligned, output).with_context(|| format!("Failed to save {}", output.display()))?;

    println!(
        "Offset: {} samples ({:.3}s)",
        offset.frames(),
        offset.as_secs(reference.sample_rate())
    );
    println!("Aligned file saved: {}", output.display());

    Ok(offset.frames())
}

/// Print the offsets and the gain decision `mix` would use, as JSON.
pub fn analyze(
    config: &EngineConfig,
    original: &Path,
    instrumental: &Path,
    vocal: &Path,
) -> Result<MixAnalysis> {
    info!("Analyzing {} against {}", vocal.display(), instrumental.display());

    let reference = load_source(original, config)?;
    let instrumental = load_source(instrumental, config)?;
    let vocal = load_source(vocal, config)?;

    let analysis = MixEngine::new(config.clone())?
        .analyze(&reference, &instrumental, &vocal)
        .context("Analysis failed")?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);

    Ok(analysis)
}

/// Print or write the effective configuration.
pub fn show_config(config: &EngineConfig, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            config.to_file(path)?;
            println!("Configuration written: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
