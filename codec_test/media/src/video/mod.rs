//! Video processing module
//!
//! Frames, codec traits, result delivery, codecs, and quality measurement.

pub mod bitstream;
pub mod codecs;
pub mod constants;
pub mod encoded;
pub mod frame;
pub mod quality;
pub mod settings;
pub mod sink;
pub mod source;
pub mod traits;
pub mod utils;

// Re-exports
pub use encoded::{
    CodecSpecificInfo, CodecSpecifics, DecodedFrame, EncodeResult, EncodedFrame, FrameType,
};
pub use frame::{Plane, VideoFrame};
pub use settings::{CodecSettings, VideoCodecType};
pub use sink::ResultSink;
pub use source::{FrameSource, SquareClip};
pub use traits::{VideoDecoder, VideoEncoder};
