//! Common constants shared across media modules

/// Logging intervals for frame processing
pub mod logging {
    /// Log progress every N frames (encoder)
    pub const ENCODER_LOG_INTERVAL: u64 = 60;
    /// Log progress every N frames (decoder)
    pub const DECODER_LOG_INTERVAL: u64 = 60;
}

/// RTP timing
pub mod timing {
    /// Video RTP clock rate (Hz)
    pub const VIDEO_PAYLOAD_FREQUENCY: u32 = 90_000;
}
