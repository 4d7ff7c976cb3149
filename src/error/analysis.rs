// Analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Single source of truth for the numeric codes reported by the pipeline,
/// the fixture harness, and anything mapping results into external payloads.
///
/// Error code range: 2001-2007
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Waveform has no samples (or no channels)
    pub const EMPTY_INPUT: i32 = 2001;

    /// More than two channels, or channels of unequal length
    pub const UNSUPPORTED_CHANNEL_LAYOUT: i32 = 2002;

    /// Sample rate must be a positive number of Hz
    pub const INVALID_SAMPLE_RATE: i32 = 2003;

    /// Transform size is zero or not a power of two
    pub const INVALID_TRANSFORM_SIZE: i32 = 2004;

    /// Configuration failed validation
    pub const INVALID_CONFIG: i32 = 2005;

    /// File could not be read or written
    pub const IO_FAILURE: i32 = 2006;

    /// Sample is NaN or infinite
    pub const NON_FINITE_SAMPLE: i32 = 2007;
}

/// Log an analysis error with structured context
///
/// Emits the numeric code, the component, and the human-readable message so
/// log scrapers can match on `code=` without parsing prose.
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=Analyzer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Analysis-related errors
///
/// Degenerate inputs such as silence or a buffer shorter than one analysis
/// window are not errors; they produce zero-valued features.
///
/// Error code range: 2001-2007
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Waveform has zero samples
    EmptyInput,

    /// Channel count or channel lengths the mixdown cannot handle
    UnsupportedChannelLayout { channels: usize, reason: String },

    /// Sample rate of 0 Hz
    InvalidSampleRate { sample_rate: u32 },

    /// Transform length that the radix-2 engine cannot plan
    InvalidTransformSize { size: usize },

    /// Configuration value out of range
    InvalidConfig { field: String, reason: String },

    /// WAV or JSON file could not be read or written
    Io { reason: String },

    /// NaN or infinite sample at `channel`/`frame`
    NonFiniteSample { channel: usize, frame: usize },
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::EmptyInput => AnalysisErrorCodes::EMPTY_INPUT,
            AnalysisError::UnsupportedChannelLayout { .. } => {
                AnalysisErrorCodes::UNSUPPORTED_CHANNEL_LAYOUT
            }
            AnalysisError::InvalidSampleRate { .. } => AnalysisErrorCodes::INVALID_SAMPLE_RATE,
            AnalysisError::InvalidTransformSize { .. } => {
                AnalysisErrorCodes::INVALID_TRANSFORM_SIZE
            }
            AnalysisError::InvalidConfig { .. } => AnalysisErrorCodes::INVALID_CONFIG,
            AnalysisError::Io { .. } => AnalysisErrorCodes::IO_FAILURE,
            AnalysisError::NonFiniteSample { .. } => AnalysisErrorCodes::NON_FINITE_SAMPLE,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::EmptyInput => "Empty input: waveform contains no samples".to_string(),
            AnalysisError::UnsupportedChannelLayout { channels, reason } => {
                format!("Unsupported channel layout ({} channels): {}", channels, reason)
            }
            AnalysisError::InvalidSampleRate { sample_rate } => {
                format!("Sample rate must be greater than 0 (got {})", sample_rate)
            }
            AnalysisError::InvalidTransformSize { size } => {
                format!("Transform size must be a non-zero power of two (got {})", size)
            }
            AnalysisError::InvalidConfig { field, reason } => {
                format!("Invalid configuration for {}: {}", field, reason)
            }
            AnalysisError::Io { reason } => format!("I/O failed: {}", reason),
            AnalysisError::NonFiniteSample { channel, frame } => format!(
                "Non-finite sample in channel {} at frame {}",
                channel, frame
            ),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<hound::Error> for AnalysisError {
    fn from(err: hound::Error) -> Self {
        AnalysisError::Io {
            reason: err.to_string(),
        }
    }
}
