//! Bitstream inspection
//!
//! Bit-level reading plus the H.264 parsing used to recover slice QP from
//! encoded frames.

pub mod bit_reader;
pub mod h264_parser;

pub use bit_reader::BitReader;
#[cfg(test)]
pub(crate) use bit_reader::BitWriter;
pub use h264_parser::{H264BitstreamParser, PpsState, SpsState};
