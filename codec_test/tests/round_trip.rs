//! Integration tests for successful round trips
//!
//! Covers the quantized reference codec through the full harness flow:
//! - Key frame on stream start, PSNR above threshold
//! - Decoded QP equal to encoded QP
//! - Every QP the settings allow
//! - Scripted codecs that satisfy the checks

mod common;

use codec_test::{CodecFamily, CodecHarness, RoundTripState, TestCase};
use common::{CallLog, DecoderScript, EncoderScript, patient_config, quiet, scripted_family};
use media::FrameType;

#[test]
fn test_quantized_encode_decode() {
    let config = patient_config();
    let mut harness = CodecHarness::set_up(&CodecFamily::quantized(), &config, &quiet()).unwrap();

    let report = harness
        .run(&TestCase::encode_decode(config.psnr_threshold_db))
        .expect("Round trip should pass");

    assert_eq!(report.frame_type, FrameType::Key);
    assert!(report.psnr_db.unwrap() > config.psnr_threshold_db);
    assert_eq!(
        report.trace,
        vec![
            RoundTripState::Idle,
            RoundTripState::Encoding,
            RoundTripState::AwaitingEncoded,
            RoundTripState::Decoding,
            RoundTripState::AwaitingDecoded,
            RoundTripState::Verified,
        ]
    );
    harness.tear_down().unwrap();
}

#[test]
fn test_quantized_qp_round_trip() {
    let config = patient_config();
    let mut harness = CodecHarness::set_up(&CodecFamily::quantized(), &config, &quiet()).unwrap();

    let report = harness.run(&TestCase::decoded_qp_equals_encoded_qp()).unwrap();

    assert_eq!(report.encoded_qp, Some(24));
    assert_eq!(report.decoded_qp, Some(24));
}

#[test]
fn test_qp_recovered_across_range() {
    let config = patient_config();

    for qp_max in [0u8, 5, 17, 30, 51] {
        let family = CodecFamily::quantized().with_settings_modifier(move |s| s.qp_max = qp_max);
        let mut harness = CodecHarness::set_up(&family, &config, &quiet()).unwrap();

        let report = harness
            .run(&TestCase::decoded_qp_equals_encoded_qp())
            .unwrap_or_else(|f| panic!("qp_max {}: {}", qp_max, f));

        assert_eq!(report.encoded_qp, Some(qp_max.min(24)));
        assert_eq!(report.encoded_qp, report.decoded_qp);
        harness.tear_down().unwrap();
    }
}

#[test]
fn test_odd_resolution_round_trip() {
    let config = patient_config();
    let family = CodecFamily::quantized().with_settings_modifier(|s| {
        s.width = 33;
        s.height = 17;
    });
    let mut harness = CodecHarness::set_up(&family, &config, &quiet()).unwrap();

    let report = harness
        .run(&TestCase::encode_decode(config.psnr_threshold_db))
        .unwrap();
    assert!(report.psnr_db.unwrap() > config.psnr_threshold_db);
}

#[test]
fn test_scripted_pair_satisfies_qp_check() {
    let calls = CallLog::default();
    let family = scripted_family(
        EncoderScript::key(30),
        DecoderScript::Flat { qp_offset: 0 },
        &calls,
    );
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let report = harness.run(&TestCase::decoded_qp_equals_encoded_qp()).unwrap();
    assert_eq!(report.decoded_qp, Some(30));

    harness.tear_down().unwrap();
    assert_eq!(
        calls.calls(),
        vec![
            "init_encode",
            "init_decode",
            "encode",
            "decode",
            "release_encoder",
            "release_decoder"
        ]
    );
}
