//! I420Q frame layout.
//!
//! ```text
//! 0       4     5    6        8        10          14            18
//! +-------+-----+----+--------+--------+-----------+-------------+---------
//! | QVC1  | typ | qp | width  | height | timestamp | payload_len | payload
//! +-------+-----+----+--------+--------+-----------+-------------+---------
//! ```
//!
//! Multi-byte fields are big-endian. A key-frame payload holds one quantizer
//! index (u8) per sample; a delta-frame payload holds one residual level
//! (i16) per sample. Samples are stored plane by plane, Y then U then V.

use crate::error::{MediaError, Result};
use crate::video::encoded::FrameType;
use crate::video::frame::chroma_size;

pub const MAGIC: [u8; 4] = *b"QVC1";
pub const HEADER_LEN: usize = 18;

const FRAME_TYPE_KEY: u8 = 0;
const FRAME_TYPE_DELTA: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: FrameType,
    pub qp: u8,
    pub width: u16,
    pub height: u16,
    pub timestamp: u32,
    pub payload_len: u32,
}

impl FrameHeader {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.push(match self.frame_type {
            FrameType::Key => FRAME_TYPE_KEY,
            FrameType::Delta => FRAME_TYPE_DELTA,
        });
        out.push(self.qp);
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.payload_len.to_be_bytes());
    }

    /// Samples per frame implied by the header dimensions.
    pub fn sample_count(&self) -> usize {
        let (cw, ch) = chroma_size(self.width as u32, self.height as u32);
        self.width as usize * self.height as usize + 2 * cw * ch
    }

    /// Payload bytes a well-formed frame of this type carries.
    pub fn expected_payload_len(&self) -> usize {
        match self.frame_type {
            FrameType::Key => self.sample_count(),
            FrameType::Delta => 2 * self.sample_count(),
        }
    }
}

/// Splits a frame into its header and payload.
///
/// # Errors
///
/// Returns `MediaError::Bitstream` for a bad magic, unknown frame type,
/// zero dimensions, or a payload that is truncated or does not match the
/// dimensions.
pub fn parse_frame(data: &[u8]) -> Result<(FrameHeader, &[u8])> {
    if data.len() < HEADER_LEN {
        return Err(MediaError::Bitstream(format!(
            "frame of {} bytes is shorter than the {} byte header",
            data.len(),
            HEADER_LEN
        )));
    }
    if data[0..4] != MAGIC {
        return Err(MediaError::Bitstream("bad frame magic".to_string()));
    }

    let frame_type = match data[4] {
        FRAME_TYPE_KEY => FrameType::Key,
        FRAME_TYPE_DELTA => FrameType::Delta,
        other => {
            return Err(MediaError::Bitstream(format!(
                "unknown frame type {}",
                other
            )));
        }
    };

    let header = FrameHeader {
        frame_type,
        qp: data[5],
        width: u16::from_be_bytes([data[6], data[7]]),
        height: u16::from_be_bytes([data[8], data[9]]),
        timestamp: u32::from_be_bytes([data[10], data[11], data[12], data[13]]),
        payload_len: u32::from_be_bytes([data[14], data[15], data[16], data[17]]),
    };

    if header.width == 0 || header.height == 0 {
        return Err(MediaError::Bitstream(format!(
            "invalid dimensions {}x{}",
            header.width, header.height
        )));
    }

    let payload = &data[HEADER_LEN..];
    if payload.len() != header.payload_len as usize {
        return Err(MediaError::Bitstream(format!(
            "payload length {} does not match header length {}",
            payload.len(),
            header.payload_len
        )));
    }
    if payload.len() != header.expected_payload_len() {
        return Err(MediaError::Bitstream(format!(
            "{} frame {}x{} needs {} payload bytes, got {}",
            header.frame_type,
            header.width,
            header.height,
            header.expected_payload_len(),
            payload.len()
        )));
    }

    Ok((header, payload))
}
