//! Error types for media operations.
//!
//! Every synchronous codec call reports failure through [`MediaError`]; an
//! `Err` from `encode`/`decode` means no completion callback will follow.

use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, MediaError>;

/// Error type for media operations
#[derive(Debug)]
pub enum MediaError {
    /// Configuration error
    Config(String),
    /// I/O error
    Io(io::Error),
    /// Codec error
    Codec(String),
    /// Processing error
    Processing(String),
    /// Two images that must share dimensions do not
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// The frame source has no frames left
    ClipExhausted { frames: usize },
    /// Malformed bitstream
    Bitstream(String),
    /// The codec cannot accept more work right now
    ResourceExhausted(String),
    /// A codec call was made before initialization or callback registration
    Uninitialized(&'static str),
    /// Support for this codec was not compiled in
    Unsupported(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Config(msg) => write!(f, "Config error: {}", msg),
            MediaError::Io(err) => write!(f, "I/O error: {}", err),
            MediaError::Codec(msg) => write!(f, "Codec error: {}", msg),
            MediaError::Processing(msg) => write!(f, "Processing error: {}", msg),
            MediaError::DimensionMismatch { expected, actual } => write!(
                f,
                "Dimension mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            MediaError::ClipExhausted { frames } => {
                write!(f, "Clip exhausted after {} frames", frames)
            }
            MediaError::Bitstream(msg) => write!(f, "Bitstream error: {}", msg),
            MediaError::ResourceExhausted(msg) => write!(f, "Resource exhausted: {}", msg),
            MediaError::Uninitialized(what) => write!(f, "Uninitialized: {}", what),
            MediaError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
        }
    }
}

impl std::error::Error for MediaError {}

impl From<io::Error> for MediaError {
    fn from(err: io::Error) -> Self {
        MediaError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_codec() {
        let err = MediaError::Codec("Encoding failed".to_string());
        assert_eq!(err.to_string(), "Codec error: Encoding failed");
    }

    #[test]
    fn test_error_display_dimension_mismatch() {
        let err = MediaError::DimensionMismatch {
            expected: (176, 144),
            actual: (352, 288),
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: expected 176x144, got 352x288"
        );
    }

    #[test]
    fn test_error_display_clip_exhausted() {
        let err = MediaError::ClipExhausted { frames: 10 };
        assert_eq!(err.to_string(), "Clip exhausted after 10 frames");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let media_err: MediaError = io_err.into();

        assert!(matches!(media_err, MediaError::Io(_)));
    }

    #[test]
    fn test_error_is_error_trait() {
        let err = MediaError::Uninitialized("encoder");
        let _: &dyn std::error::Error = &err;
    }
}
