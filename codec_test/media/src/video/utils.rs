//! Video codec utilities
//!
//! Helpers for walking H.264 Annex-B byte streams.

use super::constants::h264::*;

/// Extracts the NAL unit type of the first NAL unit in `data`
///
/// Searches for a 4-byte or 3-byte start code and reads the type from the
/// following header byte.
///
/// # NAL Types
/// - 1: Non-IDR coded slice
/// - 5: IDR coded slice (keyframe)
/// - 7: SPS (Sequence Parameter Set)
/// - 8: PPS (Picture Parameter Set)
///
/// # Returns
/// * NAL unit type (0 if no start code found)
pub fn extract_nal_type(data: &[u8]) -> u8 {
    split_nal_units(data)
        .first()
        .and_then(|nal| nal.first())
        .map(|header| header & NAL_TYPE_MASK)
        .unwrap_or(0)
}

/// Checks if NAL unit is a parameter set (SPS or PPS)
pub fn is_parameter_set(nal_type: u8) -> bool {
    nal_type == NAL_TYPE_SPS || nal_type == NAL_TYPE_PPS
}

/// Splits an Annex-B byte stream into NAL units (header byte included,
/// start codes removed).
///
/// Trailing zero bytes belonging to the next start code are stripped. Data
/// before the first start code is ignored.
pub fn split_nal_units(data: &[u8]) -> Vec<&[u8]> {
    let mut starts = Vec::new();
    let mut i = 0;

    while i + NAL_START_CODE_3.len() <= data.len() {
        if data[i..i + NAL_START_CODE_3.len()] == NAL_START_CODE_3 {
            starts.push(i + NAL_START_CODE_3.len());
            i += NAL_START_CODE_3.len();
        } else {
            i += 1;
        }
    }

    let mut units = Vec::with_capacity(starts.len());
    for (index, &start) in starts.iter().enumerate() {
        let mut end = match starts.get(index + 1) {
            Some(&next) => next - NAL_START_CODE_3.len(),
            None => data.len(),
        };
        while end > start && data[end - 1] == 0x00 && index + 1 < starts.len() {
            end -= 1;
        }
        if end > start {
            units.push(&data[start..end]);
        }
    }
    units
}

/// Removes emulation prevention bytes (`00 00 03` -> `00 00`) from a NAL
/// unit payload, yielding the raw byte sequence payload.
pub fn unescape_rbsp(nal: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(nal.len());
    let mut zeros = 0usize;

    for &byte in nal {
        if zeros >= 2 && byte == EMULATION_PREVENTION_BYTE {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }
    rbsp
}
