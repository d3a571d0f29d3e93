//! Encoder output and decoder output types.

use super::frame::VideoFrame;
use super::settings::VideoCodecType;
use std::fmt;
use std::time::Duration;

/// Frame-type tag of an encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Self-contained, decodable without prior frames
    Key,
    /// Predicted from earlier frames
    Delta,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::Key => write!(f, "key"),
            FrameType::Delta => write!(f, "delta"),
        }
    }
}

/// Compressed frame as produced by an encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    data: Vec<u8>,
    /// Frame type as reported by the encoder. The harness may overwrite it
    /// before handing the frame to a decoder.
    pub frame_type: FrameType,
    /// Quantization parameter the encoder used, if it reports one.
    pub qp: Option<u8>,
    pub encoded_width: u32,
    pub encoded_height: u32,
    /// RTP timestamp copied from the input frame
    pub timestamp: u32,
}

impl EncodedFrame {
    pub fn new(data: Vec<u8>, frame_type: FrameType) -> Self {
        EncodedFrame {
            data,
            frame_type,
            qp: None,
            encoded_width: 0,
            encoded_height: 0,
            timestamp: 0,
        }
    }

    pub fn with_qp(mut self, qp: Option<u8>) -> Self {
        self.qp = qp;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.encoded_width = width;
        self.encoded_height = height;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Bitstream bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bitstream length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replaces the bitstream, keeping the metadata.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }
}

/// Codec-specific side-channel data. Passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecSpecifics {
    H264 {
        /// RFC 6184 packetization mode
        packetization_mode: u8,
        idr_frame: bool,
    },
    Quantized {
        quantizer_step: u16,
    },
    Generic,
}

/// Metadata accompanying an [`EncodedFrame`].
#[derive(Debug, Clone, PartialEq)]
pub struct CodecSpecificInfo {
    pub codec_type: VideoCodecType,
    pub specifics: CodecSpecifics,
}

impl CodecSpecificInfo {
    pub fn generic(codec_type: VideoCodecType) -> Self {
        CodecSpecificInfo {
            codec_type,
            specifics: CodecSpecifics::Generic,
        }
    }
}

/// Payload delivered to the encode-complete sink.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeResult {
    pub frame: EncodedFrame,
    pub codec_specific_info: CodecSpecificInfo,
}

/// Payload delivered to the decode-complete sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Reconstructed picture. `None` when the decoder completed a call
    /// without producing a picture.
    pub frame: Option<VideoFrame>,
    /// QP recovered from the bitstream, if the decoder can extract it.
    pub qp: Option<u8>,
    pub decode_time: Option<Duration>,
}

impl DecodedFrame {
    pub fn new(frame: VideoFrame, qp: Option<u8>) -> Self {
        DecodedFrame {
            frame: Some(frame),
            qp,
            decode_time: None,
        }
    }

    pub fn with_decode_time(mut self, decode_time: Duration) -> Self {
        self.decode_time = Some(decode_time);
        self
    }
}
