//! Error types for splicelot
//!
//! Only two conditions are fatal for an analysis: the audio could not be
//! decoded, or the sample rate cannot carry the noise extractor's high-pass
//! cutoff. Everything a detector runs into (short clips, silent input, zero
//! means) is turned into an unsuspicious result instead of an error.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for splicelot operations
pub type Result<T> = std::result::Result<T, ForensicError>;

#[derive(Error, Debug)]
pub enum ForensicError {
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Sample rate {sample_rate} Hz cannot represent a {cutoff_hz} Hz high-pass cutoff")]
    InvalidSampleRate { sample_rate: u32, cutoff_hz: f64 },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Analysis did not finish within {budget:?}")]
    DeadlineExceeded { budget: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForensicError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        ForensicError::Config {
            reason: reason.into(),
        }
    }

    /// Short machine-readable code used in CSV/JSON reports
    pub fn error_code(&self) -> &'static str {
        match self {
            ForensicError::Decode { .. } => "DECODE_FAILURE",
            ForensicError::EmptyAudio => "EMPTY_AUDIO",
            ForensicError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            ForensicError::Config { .. } => "CONFIG_ERROR",
            ForensicError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            ForensicError::Io(_) => "IO_ERROR",
            ForensicError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sample_rate_message() {
        let err = ForensicError::InvalidSampleRate {
            sample_rate: 8000,
            cutoff_hz: 5000.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("8000"));
        assert!(msg.contains("5000"));
        assert_eq!(err.error_code(), "INVALID_SAMPLE_RATE");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ForensicError = io.into();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_deadline_message_includes_budget() {
        let err = ForensicError::DeadlineExceeded {
            budget: Duration::from_millis(250),
        };
        assert!(err.to_string().contains("250ms"));
    }
}
