//! Error types for StemSync
//!
//! All fallible operations return `StemSyncError`. Input contract violations
//! (empty buffers, mismatched formats, NaN/Inf samples) are detected before
//! any computation runs and are never retried internally.

use thiserror::Error;

/// Result type alias using StemSyncError
pub type Result<T> = std::result::Result<T, StemSyncError>;

/// All possible errors in StemSync
#[derive(Error, Debug)]
pub enum StemSyncError {
    // Input validation errors
    #[error("Audio buffer is empty")]
    EmptyBuffer,

    #[error("Sample rate mismatch: expected {expected}, got {actual}")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: u16, actual: u16 },

    #[error("Non-finite sample (NaN/Inf) at index {index}")]
    NonFiniteSample { index: usize },

    #[error("Unsupported audio format: {details}")]
    UnsupportedFormat { details: String },

    // Audio I/O errors
    #[error("Failed to read audio file: {path}")]
    AudioReadError {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write audio file: {path}")]
    AudioWriteError {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Resampling failed: {details}")]
    ResampleError { details: String },

    // Configuration errors
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Generic I/O
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StemSyncError {
    /// True for caller contract violations on the input buffers
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyBuffer
                | Self::SampleRateMismatch { .. }
                | Self::ChannelMismatch { .. }
                | Self::NonFiniteSample { .. }
        )
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyBuffer => "EMPTY_BUFFER",
            Self::SampleRateMismatch { .. } => "SAMPLE_RATE_MISMATCH",
            Self::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            Self::NonFiniteSample { .. } => "NON_FINITE_SAMPLE",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::AudioReadError { .. } => "AUDIO_READ_ERROR",
            Self::AudioWriteError { .. } => "AUDIO_WRITE_ERROR",
            Self::ResampleError { .. } => "RESAMPLE_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::IoError(_) => "IO_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::EmptyBuffer => "Select a file that contains audio",
            Self::SampleRateMismatch { .. } => {
                "Decode all three sources at the same sample rate"
            }
            Self::ChannelMismatch { .. } => "Use the same channel layout for every source",
            Self::NonFiniteSample { .. } => {
                "Re-export the source file; it contains corrupt samples"
            }
            Self::UnsupportedFormat { .. } => "Convert to WAV format (16/24/32-bit)",
            Self::AudioReadError { .. } => "Check that the file exists and is a valid WAV file",
            Self::AudioWriteError { .. } => "Check that the output directory is writable",
            Self::InvalidConfig { .. } => {
                "Fix the configuration value or delete the file to use defaults"
            }
            _ => "Check the error details and try again",
        }
    }
}
