//! Integration tests for failing round trips
//!
//! Every failure must be reported on the first problem:
//! - Synchronous call failures never issue a wait
//! - Missing callbacks time out within the bound and discard the pair
//! - Frame type, QP and quality violations name what went wrong
//! - Empty and corrupt bitstreams fail instead of hanging

mod common;

use codec_test::{CodecHarness, FailureReason, RoundTripState, Stage, TestCase};
use common::{
    CallLog, DecoderScript, EncoderScript, impatient_config, patient_config, quiet,
    scripted_family, scripted_into_quantized,
};
use media::FrameType;
use std::time::{Duration, Instant};

fn qp_case() -> TestCase {
    TestCase::decoded_qp_equals_encoded_qp()
}

#[test]
fn test_encode_rejection_fails_fast() {
    let calls = CallLog::default();
    let family = scripted_family(
        EncoderScript::RejectFull,
        DecoderScript::Flat { qp_offset: 0 },
        &calls,
    );
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let started = Instant::now();
    let failure = harness.run(&qp_case()).unwrap_err();

    match &failure.reason {
        FailureReason::CallFailure { stage, error } => {
            assert_eq!(*stage, Stage::Encode);
            assert!(error.contains("queue full"), "{}", error);
        }
        other => panic!("Expected call failure, got {}", other),
    }
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(harness.synchronizer().encoded_waits(), 0);
    assert_eq!(harness.synchronizer().decoded_waits(), 0);
    assert_eq!(calls.count("decode"), 0);
    assert_eq!(
        failure.trace,
        vec![
            RoundTripState::Idle,
            RoundTripState::Encoding,
            RoundTripState::Failed(failure.reason.clone()),
        ]
    );
}

#[test]
fn test_decode_rejection_fails_fast() {
    let calls = CallLog::default();
    let family = scripted_family(EncoderScript::key(30), DecoderScript::Reject, &calls);
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let failure = harness.run(&qp_case()).unwrap_err();

    assert!(matches!(
        failure.reason,
        FailureReason::CallFailure {
            stage: Stage::Decode,
            ..
        }
    ));
    assert_eq!(harness.synchronizer().encoded_waits(), 1);
    assert_eq!(harness.synchronizer().decoded_waits(), 0);
    assert!(!harness.is_discarded());
}

#[test]
fn test_encode_timeout_within_bound() {
    let calls = CallLog::default();
    let family = scripted_family(EncoderScript::Silent, DecoderScript::Silent, &calls);
    let config = impatient_config();
    let mut harness = CodecHarness::set_up(&family, &config, &quiet()).unwrap();

    let started = Instant::now();
    let failure = harness.run(&qp_case()).unwrap_err();
    let elapsed = started.elapsed();

    match failure.reason {
        FailureReason::CallbackTimeout { stage, waited } => {
            assert_eq!(stage, Stage::Encode);
            assert!(waited >= config.encode_timeout());
        }
        other => panic!("Expected timeout, got {}", other),
    }
    assert!(elapsed >= config.encode_timeout());
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(calls.count("decode"), 0);
    assert!(harness.is_discarded());
}

#[test]
fn test_decode_timeout_discards_pair() {
    let calls = CallLog::default();
    let family = scripted_family(EncoderScript::key(30), DecoderScript::Silent, &calls);
    let mut harness = CodecHarness::set_up(&family, &impatient_config(), &quiet()).unwrap();

    let failure = harness.run(&qp_case()).unwrap_err();
    assert!(matches!(
        failure.reason,
        FailureReason::CallbackTimeout {
            stage: Stage::Decode,
            ..
        }
    ));
    assert!(harness.is_discarded());

    // A discarded pair is not driven again.
    let again = harness.run(&qp_case()).unwrap_err();
    assert!(matches!(again.reason, FailureReason::CallFailure { .. }));
    assert_eq!(calls.count("encode"), 1);

    harness.tear_down().unwrap();
    assert_eq!(calls.count("release_encoder"), 0);
    assert_eq!(calls.count("release_decoder"), 0);
}

#[test]
fn test_delta_first_frame_is_violation() {
    let calls = CallLog::default();
    let family = scripted_family(
        EncoderScript::Deliver {
            frame_type: FrameType::Delta,
            qp: Some(30),
            payload: vec![1; 8],
        },
        DecoderScript::Flat { qp_offset: 0 },
        &calls,
    );
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let failure = harness.run(&qp_case()).unwrap_err();

    assert_eq!(
        failure.reason,
        FailureReason::FrameTypeViolation {
            actual: FrameType::Delta
        }
    );
    assert_eq!(calls.count("decode"), 0);
}

#[test]
fn test_wrong_decoded_qp_is_mismatch() {
    let calls = CallLog::default();
    let family = scripted_family(
        EncoderScript::key(30),
        DecoderScript::Flat { qp_offset: 1 },
        &calls,
    );
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let failure = harness.run(&qp_case()).unwrap_err();

    assert_eq!(
        failure.reason,
        FailureReason::QpMismatch {
            encoded: Some(30),
            decoded: Some(31),
        }
    );
}

#[test]
fn test_missing_qp_is_mismatch() {
    let calls = CallLog::default();
    let family = scripted_family(
        EncoderScript::Deliver {
            frame_type: FrameType::Key,
            qp: None,
            payload: vec![1; 8],
        },
        DecoderScript::Flat { qp_offset: 0 },
        &calls,
    );
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let failure = harness.run(&qp_case()).unwrap_err();
    assert_eq!(
        failure.reason,
        FailureReason::QpMismatch {
            encoded: None,
            decoded: None,
        }
    );
}

#[test]
fn test_flat_picture_below_threshold() {
    let calls = CallLog::default();
    let family = scripted_family(
        EncoderScript::key(30),
        DecoderScript::Flat { qp_offset: 0 },
        &calls,
    );
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let failure = harness.run(&TestCase::encode_decode(36.0)).unwrap_err();

    match failure.reason {
        FailureReason::QualityBelowThreshold {
            psnr_db,
            threshold_db,
        } => {
            assert!(psnr_db < 36.0);
            assert_eq!(threshold_db, 36.0);
        }
        other => panic!("Expected quality failure, got {}", other),
    }
}

#[test]
fn test_callback_without_picture() {
    let calls = CallLog::default();
    let family = scripted_family(EncoderScript::key(30), DecoderScript::NoPicture, &calls);
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let failure = harness.run(&TestCase::encode_decode(36.0)).unwrap_err();
    assert_eq!(failure.reason, FailureReason::MissingDecodedFrame);
}

#[test]
fn test_empty_bitstream_rejected_by_decoder() {
    let calls = CallLog::default();
    let family = scripted_into_quantized(
        EncoderScript::Deliver {
            frame_type: FrameType::Key,
            qp: Some(24),
            payload: Vec::new(),
        },
        &calls,
    );
    let mut harness = CodecHarness::set_up(&family, &patient_config(), &quiet()).unwrap();

    let failure = harness.run(&qp_case()).unwrap_err();

    assert!(matches!(
        failure.reason,
        FailureReason::CallFailure {
            stage: Stage::Decode,
            ..
        }
    ));
    assert_eq!(harness.synchronizer().decoded_waits(), 0);
}

#[test]
fn test_corrupt_bitstream_times_out() {
    let calls = CallLog::default();
    let family = scripted_into_quantized(
        EncoderScript::Deliver {
            frame_type: FrameType::Key,
            qp: Some(24),
            payload: b"not a quantized frame".to_vec(),
        },
        &calls,
    );
    let config = impatient_config();
    let mut harness = CodecHarness::set_up(&family, &config, &quiet()).unwrap();

    let started = Instant::now();
    let failure = harness.run(&qp_case()).unwrap_err();

    assert!(matches!(
        failure.reason,
        FailureReason::CallbackTimeout {
            stage: Stage::Decode,
            ..
        }
    ));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_timeouts_are_deterministic() {
    let config = impatient_config();

    for _ in 0..3 {
        let calls = CallLog::default();
        let family = scripted_family(EncoderScript::Silent, DecoderScript::Silent, &calls);
        let mut harness = CodecHarness::set_up(&family, &config, &quiet()).unwrap();

        let failure = harness.run(&qp_case()).unwrap_err();
        assert!(matches!(
            failure.reason,
            FailureReason::CallbackTimeout {
                stage: Stage::Encode,
                ..
            }
        ));
    }
}
