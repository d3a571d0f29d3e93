//! H.264 (AVC) codec implementation
//!
//! Encoding through FFmpeg's libx264 and decoding through FFmpeg's h264
//! decoder, available with the `h264` cargo feature. The factory functions
//! exist either way so callers can decide at runtime whether to run H.264
//! tests; without the feature they return `MediaError::Unsupported`.

#[cfg(feature = "h264")]
mod convert;
#[cfg(feature = "h264")]
pub mod decoder;
#[cfg(feature = "h264")]
pub mod encoder;

#[cfg(feature = "h264")]
pub use decoder::H264Decoder;
#[cfg(feature = "h264")]
pub use encoder::H264Encoder;

use crate::error::Result;
use crate::video::traits::{VideoDecoder, VideoEncoder};
use logging::Logger;

/// Returns true if H.264 encode and decode can be used in this build.
#[cfg(feature = "h264")]
pub fn is_available() -> bool {
    use ffmpeg_next as ffmpeg;

    ffmpeg::init().is_ok()
        && ffmpeg::encoder::find(ffmpeg::codec::Id::H264).is_some()
        && ffmpeg::decoder::find(ffmpeg::codec::Id::H264).is_some()
}

/// Returns true if H.264 encode and decode can be used in this build.
#[cfg(not(feature = "h264"))]
pub fn is_available() -> bool {
    false
}

/// Creates an uninitialized H.264 encoder.
#[cfg(feature = "h264")]
pub fn create_encoder(logger: Logger) -> Result<Box<dyn VideoEncoder>> {
    Ok(Box::new(H264Encoder::new(logger)?))
}

/// Creates an uninitialized H.264 decoder.
#[cfg(feature = "h264")]
pub fn create_decoder(logger: Logger) -> Result<Box<dyn VideoDecoder>> {
    Ok(Box::new(H264Decoder::new(logger)?))
}

#[cfg(not(feature = "h264"))]
pub fn create_encoder(_logger: Logger) -> Result<Box<dyn VideoEncoder>> {
    Err(unsupported())
}

#[cfg(not(feature = "h264"))]
pub fn create_decoder(_logger: Logger) -> Result<Box<dyn VideoDecoder>> {
    Err(unsupported())
}

#[cfg(not(feature = "h264"))]
fn unsupported() -> crate::error::MediaError {
    crate::error::MediaError::Unsupported(
        "H.264 support not compiled in (enable the `h264` feature)".to_string(),
    )
}

#[cfg(all(test, not(feature = "h264")))]
mod tests {
    use super::*;
    use crate::error::MediaError;

    #[test]
    fn test_factories_report_unsupported() {
        assert!(!is_available());
        assert!(matches!(
            create_encoder(Logger::disabled()),
            Err(MediaError::Unsupported(_))
        ));
        assert!(matches!(
            create_decoder(Logger::disabled()),
            Err(MediaError::Unsupported(_))
        ));
    }
}
