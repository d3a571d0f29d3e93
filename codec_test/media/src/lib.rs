//! Media building blocks for codec round-trip testing
//!
//! Raw and encoded frame types, the encoder/decoder traits that codecs under
//! test implement, the single-slot result sink their asynchronous callbacks
//! deliver into, bitstream and quality tooling, and the test clip source.

pub mod common;
pub mod error;
pub mod video;

// Re-export commonly used types
pub use error::{MediaError, Result};

pub use video::{
    CodecSettings, CodecSpecificInfo, CodecSpecifics, DecodedFrame, EncodeResult, EncodedFrame,
    FrameSource, FrameType, Plane, ResultSink, SquareClip, VideoCodecType, VideoDecoder,
    VideoEncoder, VideoFrame,
};
pub use video::codecs::{QuantizedDecoder, QuantizedEncoder, h264};
pub use video::quality::{PsnrReport, i420_psnr, plane_psnr, psnr_report};
