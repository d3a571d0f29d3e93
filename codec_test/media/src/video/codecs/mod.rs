//! Video codecs module
//!
//! Encoder/decoder implementations exercised by the round-trip harness.

pub mod h264;
pub mod quantized;

pub use quantized::{QuantizedDecoder, QuantizedEncoder};
