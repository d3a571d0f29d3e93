//! Error types for the round-trip harness.
//!
//! [`FailureReason`] names the invariant a round trip violated;
//! [`HarnessError`] covers everything that goes wrong before one can run.

use crate::state::RoundTripState;
use config_loader::ConfigError;
use logging::LoggingError;
use media::{FrameType, MediaError};
use std::fmt;
use std::time::Duration;

/// Point in the round trip where a call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pulling the input frame
    FrameSource,
    Encode,
    Decode,
    /// Comparing the decoded picture with the input
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::FrameSource => write!(f, "frame source"),
            Stage::Encode => write!(f, "encode"),
            Stage::Decode => write!(f, "decode"),
            Stage::Verify => write!(f, "verify"),
        }
    }
}

/// Why a round trip ended in `Failed`
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// A synchronous call returned an error; no wait was issued for it
    CallFailure { stage: Stage, error: String },
    /// No callback arrived within the bound
    CallbackTimeout { stage: Stage, waited: Duration },
    /// The first encoded frame was not a key frame
    FrameTypeViolation { actual: FrameType },
    /// Decoder-recovered QP differs from the encoder-recorded QP
    QpMismatch {
        encoded: Option<u8>,
        decoded: Option<u8>,
    },
    /// Reconstruction quality did not exceed the acceptance bound
    QualityBelowThreshold { psnr_db: f64, threshold_db: f64 },
    /// The decode callback fired without a picture
    MissingDecodedFrame,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::CallFailure { stage, error } => {
                write!(f, "{} call failed: {}", stage, error)
            }
            FailureReason::CallbackTimeout { stage, waited } => write!(
                f,
                "{} callback timed out after {} ms",
                stage,
                waited.as_millis()
            ),
            FailureReason::FrameTypeViolation { actual } => {
                write!(f, "expected a key frame, got a {} frame", actual)
            }
            FailureReason::QpMismatch { encoded, decoded } => write!(
                f,
                "QP mismatch: encoded {}, decoded {}",
                fmt_qp(*encoded),
                fmt_qp(*decoded)
            ),
            FailureReason::QualityBelowThreshold {
                psnr_db,
                threshold_db,
            } => write!(
                f,
                "PSNR {:.2} dB does not exceed {:.2} dB",
                psnr_db, threshold_db
            ),
            FailureReason::MissingDecodedFrame => {
                write!(f, "decode callback delivered no picture")
            }
        }
    }
}

fn fmt_qp(qp: Option<u8>) -> String {
    qp.map_or_else(|| "none".to_string(), |qp| qp.to_string())
}

/// A failed round trip with the states it went through
#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    pub case: String,
    pub reason: FailureReason,
    /// States visited, ending in `Failed`
    pub trace: Vec<RoundTripState>,
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.case, self.reason)
    }
}

impl std::error::Error for TestFailure {}

/// Error raised while preparing a harness
#[derive(Debug)]
pub enum HarnessError {
    /// Configuration file could not be located, read or parsed
    Config(ConfigError),
    /// Configuration values are unusable
    InvalidConfig(String),
    Logging(LoggingError),
    /// A codec could not be created or initialized
    Setup { codec: String, error: MediaError },
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Config(err) => write!(f, "Configuration error: {}", err),
            HarnessError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            HarnessError::Logging(err) => write!(f, "Logging error: {}", err),
            HarnessError::Setup { codec, error } => {
                write!(f, "Failed to set up {}: {}", codec, error)
            }
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Config(err) => Some(err),
            HarnessError::Logging(err) => Some(err),
            HarnessError::Setup { error, .. } => Some(error),
            HarnessError::InvalidConfig(_) => None,
        }
    }
}

impl From<ConfigError> for HarnessError {
    fn from(err: ConfigError) -> Self {
        HarnessError::Config(err)
    }
}

impl From<LoggingError> for HarnessError {
    fn from(err: LoggingError) -> Self {
        HarnessError::Logging(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_display() {
        let reason = FailureReason::CallbackTimeout {
            stage: Stage::Decode,
            waited: Duration::from_millis(25),
        };
        assert_eq!(reason.to_string(), "decode callback timed out after 25 ms");

        let reason = FailureReason::QpMismatch {
            encoded: Some(30),
            decoded: None,
        };
        assert_eq!(reason.to_string(), "QP mismatch: encoded 30, decoded none");
    }

    #[test]
    fn test_quality_display_rounds() {
        let reason = FailureReason::QualityBelowThreshold {
            psnr_db: 30.456,
            threshold_db: 36.0,
        };
        assert_eq!(reason.to_string(), "PSNR 30.46 dB does not exceed 36.00 dB");
    }

    #[test]
    fn test_harness_error_source() {
        use std::error::Error;

        let err = HarnessError::Setup {
            codec: "I420Q".to_string(),
            error: MediaError::Codec("boom".to_string()),
        };
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Failed to set up I420Q: Codec error: boom");
    }
}
