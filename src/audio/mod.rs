//! Audio buffer, measurements and file I/O
//!
//! This module provides the core audio data structure, the measurement
//! primitives the mixing stages rely on, and the WAV decode/encode
//! collaborators used by the CLI.

pub mod analysis;
mod buffer;
mod io;

pub use analysis::BandSearch;
pub use buffer::AudioBuffer;
pub use io::{load_wav, load_wav_as, resample, save_wav, save_wav_with_depth, LoadOptions};
