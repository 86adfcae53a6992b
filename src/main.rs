//! StemSync CLI
//!
//! Command-line interface for aligning and blending stems.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use stemsync::balance::GainPair;
use stemsync::cli::commands::{self, MixOptions};
use stemsync::cli::{Cli, Commands};
use stemsync::StemSyncError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("StemSync v{}", env!("CARGO_PKG_VERSION"));

    let result = run(cli);
    if let Err(err) = &result {
        if let Some(engine_err) = err.chain().find_map(|e| e.downcast_ref::<StemSyncError>()) {
            error!("[{}] {}", engine_err.error_code(), engine_err.recovery_hint());
        }
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Mix {
            original,
            instrumental,
            vocal,
            output,
            instrumental_gain,
            vocal_gain,
            bits,
            report,
        } => {
            let gains = match (instrumental_gain, vocal_gain) {
                (Some(i), Some(v)) => Some(GainPair::new(i, v)?),
                _ => None,
            };
            let options = MixOptions {
                gains,
                bits,
                report,
            };
            commands::mix(&config, &original, &instrumental, &vocal, &output, &options)?;
        }
        Commands::Align {
            reference,
            target,
            output,
        } => {
            commands::align(&config, &reference, &target, &output)?;
        }
        Commands::Analyze {
            original,
            instrumental,
            vocal,
        } => {
            commands::analyze(&config, &original, &instrumental, &vocal)?;
        }
        Commands::Config { output } => {
            commands::show_config(&config, output.as_deref())?;
        }
    }

    Ok(())
}
