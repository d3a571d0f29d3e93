//! Video codec traits for encoding and decoding
//!
//! These traits are the surface a codec under test exposes. Work is
//! submitted synchronously and completed asynchronously: a successful
//! `encode`/`decode` call only means the input was accepted, and the result
//! shows up later in the [`ResultSink`] registered with the codec, possibly
//! delivered from another thread.

use super::encoded::{CodecSpecificInfo, DecodedFrame, EncodeResult, EncodedFrame, FrameType};
use super::frame::VideoFrame;
use super::settings::CodecSettings;
use super::sink::ResultSink;
use crate::error::Result;

/// Trait for video encoders
///
/// # Responsibilities
/// - Compress raw frames and deliver exactly one [`EncodeResult`] per
///   accepted `encode` call
/// - Produce a key frame as the first output of a fresh instance
/// - Honour key-frame requests passed in `frame_types`
pub trait VideoEncoder {
    /// Configures the encoder. Must be called before `encode`.
    fn init_encode(&mut self, settings: &CodecSettings) -> Result<()>;

    /// Sets the sink that receives completed frames.
    ///
    /// Replaces any previously registered sink.
    fn register_encode_complete_callback(&mut self, sink: ResultSink<EncodeResult>);

    /// Submits one raw frame.
    ///
    /// # Arguments
    /// * `frame` - The raw video frame to encode
    /// * `codec_specific_info` - Optional side information from the caller
    /// * `frame_types` - Optional frame-type requests; containing
    ///   [`FrameType::Key`] forces a key frame
    ///
    /// # Returns
    /// * `Ok(())` - Accepted; one result will be delivered to the sink
    /// * `Err` - Rejected; nothing will be delivered
    fn encode(
        &mut self,
        frame: &VideoFrame,
        codec_specific_info: Option<&CodecSpecificInfo>,
        frame_types: Option<&[FrameType]>,
    ) -> Result<()>;

    /// Frees codec resources. The encoder must be re-initialized before
    /// further use.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns the codec name (e.g., "H264")
    fn get_codec(&self) -> &str;
}

/// Trait for video decoders
///
/// # Responsibilities
/// - Decompress accepted frames and deliver one [`DecodedFrame`] per
///   completed decode
/// - Reject frames that cannot be decoded (no reference, empty input)
///   synchronously
pub trait VideoDecoder {
    /// Configures the decoder. Must be called before `decode`.
    fn init_decode(&mut self, settings: &CodecSettings) -> Result<()>;

    /// Sets the sink that receives decoded pictures.
    fn register_decode_complete_callback(&mut self, sink: ResultSink<DecodedFrame>);

    /// Submits one encoded frame.
    ///
    /// # Arguments
    /// * `frame` - Encoded frame; its `frame_type` tells the decoder whether
    ///   it may start decoding here
    /// * `missing_frames` - Set when frames preceding this one were lost
    /// * `render_time_ms` - Optional render time to stamp on the output
    fn decode(
        &mut self,
        frame: &EncodedFrame,
        missing_frames: bool,
        render_time_ms: Option<i64>,
    ) -> Result<()>;

    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns the codec name (e.g., "H264")
    fn get_codec(&self) -> &str;

    /// Drops reference state so decoding restarts at the next key frame.
    fn reset(&mut self) {
        // Default: no-op, codecs can override
    }
}
