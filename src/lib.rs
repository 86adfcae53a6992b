//! StemSync - stem alignment and adaptive mixing
//!
//! StemSync blends an instrumental-only track and a vocal-only track of the
//! same song, using a reference mix to line them up in time.
//!
//! # Architecture
//!
//! Data flows strictly through these stages:
//! - Loader: decode WAV at a fixed sample rate (`audio::load_wav_as`)
//! - Aligner: cross-correlate against the reference and shift (`align`)
//! - Balancer: derive instrumental/vocal gains (`balance`)
//! - Mixer: weighted sample-wise sum (`mixer`)
//! - Normalizer: one linear peak-scale gain (`normalize`)
//! - Encoder: write WAV (`audio::save_wav`)
//!
//! Every stage is a pure function of its inputs; `pipeline::MixEngine`
//! chains the in-memory stages.

pub mod align;
pub mod audio;
pub mod balance;
pub mod cli;
pub mod config;
pub mod error;
pub mod mixer;
pub mod normalize;
pub mod pipeline;

// Re-export commonly used types
pub use align::{align, AlignConfig, Aligner, AlignmentOffset};
pub use audio::AudioBuffer;
pub use balance::{compute_gains, BalancePolicy, Balancer, GainPair};
pub use config::EngineConfig;
pub use error::{Result, StemSyncError};
pub use mixer::mix;
pub use normalize::{normalize, peak_scale_normalize, NormalizePolicy};
pub use pipeline::{MixAnalysis, MixEngine, MixOutcome, MixReport};
