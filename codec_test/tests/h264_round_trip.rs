//! H.264 round trips through FFmpeg
//!
//! Only built with the `h264` feature; skipped when FFmpeg lacks an H.264
//! encoder or decoder.

#![cfg(feature = "h264")]

mod common;

use codec_test::{CodecFamily, CodecHarness, TestCase};
use common::{patient_config, quiet};
use media::{FrameType, h264};

#[test]
fn test_h264_encode_decode() {
    if !h264::is_available() {
        return;
    }
    let config = patient_config();
    let mut harness = CodecHarness::set_up(&CodecFamily::h264(), &config, &quiet()).unwrap();

    let report = harness
        .run(&TestCase::encode_decode(config.psnr_threshold_db))
        .expect("H.264 round trip should pass");

    assert_eq!(report.frame_type, FrameType::Key);
    assert!(report.psnr_db.unwrap() > config.psnr_threshold_db);
    harness.tear_down().unwrap();
}

#[test]
fn test_h264_decoded_qp_equals_encoded_qp() {
    if !h264::is_available() {
        return;
    }
    let mut harness =
        CodecHarness::set_up(&CodecFamily::h264(), &patient_config(), &quiet()).unwrap();

    let report = harness.run(&TestCase::decoded_qp_equals_encoded_qp()).unwrap();

    assert!(report.encoded_qp.is_some());
    assert_eq!(report.encoded_qp, report.decoded_qp);
}
