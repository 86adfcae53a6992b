//! CLI Module
//!
//! Command-line interface for StemSync.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// StemSync - align and blend instrumental and vocal stems
#[derive(Parser, Debug)]
#[command(name = "stemsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align the vocal to the original and mix it with the instrumental
    #[command(name = "mix")]
    Mix {
        /// Reference mix of the song
        original: PathBuf,

        /// Instrumental-only track
        instrumental: PathBuf,

        /// Vocal-only track
        vocal: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Fixed instrumental gain (skips automatic balancing)
        #[arg(long, requires = "vocal_gain")]
        instrumental_gain: Option<f32>,

        /// Fixed vocal gain (skips automatic balancing)
        #[arg(long, requires = "instrumental_gain")]
        vocal_gain: Option<f32>,

        /// Output bit depth (16, 24 or 32 float)
        #[arg(long, default_value_t = 32)]
        bits: u16,

        /// Write a JSON report of the mix decisions
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Align one file to a reference and write the shifted result
    #[command(name = "align")]
    Align {
        /// Reference file
        reference: PathBuf,

        /// File to shift
        target: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the alignment offset and balance analysis without mixing
    #[command(name = "analyze")]
    Analyze {
        /// Reference mix of the song
        original: PathBuf,

        /// Instrumental-only track
        instrumental: PathBuf,

        /// Vocal-only track
        vocal: PathBuf,
    },

    /// Print the effective configuration, or write it to a file
    #[command(name = "config")]
    Config {
        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
