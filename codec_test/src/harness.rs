//! Encode/decode round trip on one codec pair.
//!
//! A [`CodecHarness`] owns a freshly built encoder and decoder, the
//! [`Synchronizer`] their callbacks deliver into, and the input clip. Each
//! [`TestCase`] run walks the [`RoundTripState`] machine once: pull a frame,
//! encode, wait, force the frame type to key, decode, wait, verify. The
//! first problem ends the run; nothing is retried.

use crate::config::HarnessConfig;
use crate::error::{FailureReason, HarnessError, Stage, TestFailure};
use crate::family::CodecFamily;
use crate::state::RoundTripState;
use crate::synchronizer::{Synchronizer, WaitOutcome};
use logging::Logger;
use media::{
    CodecSettings, FrameSource, FrameType, SquareClip, VideoDecoder, VideoEncoder, i420_psnr,
};
use std::time::{Duration, Instant};

/// Assertions applied to a completed round trip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTripChecks {
    /// The encoded frame must be delivered as a key frame
    pub key_frame: bool,
    /// Decoded QP must equal encoded QP
    pub qp_equality: bool,
    /// PSNR of the decoded picture must exceed this (dB)
    pub min_psnr_db: Option<f64>,
}

/// A named set of checks
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub checks: RoundTripChecks,
}

impl TestCase {
    pub fn new(name: &str, checks: RoundTripChecks) -> Self {
        TestCase {
            name: name.to_string(),
            checks,
        }
    }

    /// Key frame on stream start and reconstruction above `threshold_db`.
    pub fn encode_decode(threshold_db: f64) -> Self {
        Self::new(
            "EncodeDecode",
            RoundTripChecks {
                key_frame: true,
                qp_equality: false,
                min_psnr_db: Some(threshold_db),
            },
        )
    }

    /// Key frame on stream start and decoded QP equal to encoded QP.
    pub fn decoded_qp_equals_encoded_qp() -> Self {
        Self::new(
            "DecodedQpEqualsEncodedQp",
            RoundTripChecks {
                key_frame: true,
                qp_equality: true,
                min_psnr_db: None,
            },
        )
    }
}

/// Measurements of a verified round trip
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTripReport {
    pub case: String,
    pub codec: String,
    /// Frame type as delivered by the encoder, before the key override
    pub frame_type: FrameType,
    pub encoded_size: usize,
    pub encoded_qp: Option<u8>,
    pub decoded_qp: Option<u8>,
    /// Only measured when the case has a PSNR check
    pub psnr_db: Option<f64>,
    /// Time spent blocked on the encode callback
    pub encode_wait: Duration,
    /// Time spent blocked on the decode callback
    pub decode_wait: Duration,
    pub trace: Vec<RoundTripState>,
}

/// Harness around one encoder/decoder pair
pub struct CodecHarness {
    codec: String,
    encoder: Box<dyn VideoEncoder>,
    decoder: Box<dyn VideoDecoder>,
    settings: CodecSettings,
    synchronizer: Synchronizer,
    source: Box<dyn FrameSource>,
    encode_timeout: Duration,
    decode_timeout: Duration,
    trace: Vec<RoundTripState>,
    discarded: bool,
    logger: Logger,
}

impl CodecHarness {
    /// Builds, wires and initializes a codec pair from `family`.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Setup` if either codec cannot be created or
    /// initialized, or the clip cannot be built for the settings.
    pub fn set_up(
        family: &CodecFamily,
        config: &HarnessConfig,
        logger: &Logger,
    ) -> Result<Self, HarnessError> {
        let logger = logger.for_component("Harness");
        let settings = family.settings();
        let setup_error = |error| HarnessError::Setup {
            codec: family.name.clone(),
            error,
        };

        logger.info(&format!(
            "Setting up {}: {}x{} @ {} fps",
            family.name, settings.width, settings.height, settings.max_framerate
        ));

        let mut encoder = family
            .create_encoder(logger.for_component(&format!("{}Encoder", family.name)))
            .map_err(setup_error)?;
        let mut decoder = family
            .create_decoder(logger.for_component(&format!("{}Decoder", family.name)))
            .map_err(setup_error)?;

        let synchronizer = Synchronizer::new(logger.for_component("Synchronizer"));
        encoder.register_encode_complete_callback(synchronizer.encoded_sink());
        decoder.register_decode_complete_callback(synchronizer.decoded_sink());

        encoder.init_encode(&settings).map_err(setup_error)?;
        decoder.init_decode(&settings).map_err(setup_error)?;

        let source = SquareClip::for_settings(&settings, config.clip.frame_count, config.clip.seed)
            .map_err(setup_error)?;

        Ok(CodecHarness {
            codec: family.name.clone(),
            encoder,
            decoder,
            settings,
            synchronizer,
            source: Box::new(source),
            encode_timeout: config.encode_timeout(),
            decode_timeout: config.decode_timeout(),
            trace: Vec::new(),
            discarded: false,
            logger,
        })
    }

    /// Replaces the input clip.
    pub fn with_source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.source = source;
        self
    }

    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    /// True once a callback timeout has made the codec pair unusable.
    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Runs one round trip for `case`.
    ///
    /// A harness whose codec pair was discarded refuses to run.
    pub fn run(&mut self, case: &TestCase) -> Result<RoundTripReport, TestFailure> {
        self.trace = vec![RoundTripState::Idle];
        self.logger
            .info(&format!("[{}] {} started", self.codec, case.name));

        if self.discarded {
            return Err(self.fail(
                case,
                FailureReason::CallFailure {
                    stage: Stage::Encode,
                    error: "codec pair was discarded after a callback timeout".to_string(),
                },
            ));
        }

        self.synchronizer.clear();
        let result = self.round_trip(case);

        match &result {
            Ok(report) => self.logger.info(&format!(
                "[{}] {} passed (qp {:?}/{:?}, psnr {:?})",
                self.codec, case.name, report.encoded_qp, report.decoded_qp, report.psnr_db
            )),
            Err(failure) => self.logger.error(&format!(
                "[{}] {} failed: {}",
                self.codec, case.name, failure.reason
            )),
        }
        result
    }

    fn round_trip(&mut self, case: &TestCase) -> Result<RoundTripReport, TestFailure> {
        let checks = case.checks;

        let input = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                return Err(self.call_failure(case, Stage::FrameSource, e.to_string()));
            }
        };

        self.transition(RoundTripState::Encoding);
        if let Err(e) = self.encoder.encode(&input, None, None) {
            return Err(self.call_failure(case, Stage::Encode, e.to_string()));
        }

        self.transition(RoundTripState::AwaitingEncoded);
        let wait_started = Instant::now();
        let encoded = match self.synchronizer.wait_for_encoded_frame(self.encode_timeout) {
            WaitOutcome::Ready(result) => result,
            WaitOutcome::TimedOut { waited } => {
                return Err(self.timeout(case, Stage::Encode, waited));
            }
        };
        let encode_wait = wait_started.elapsed();

        let delivered_type = encoded.frame.frame_type;
        if checks.key_frame && delivered_type != FrameType::Key {
            return Err(self.fail(
                case,
                FailureReason::FrameTypeViolation {
                    actual: delivered_type,
                },
            ));
        }

        let mut frame = encoded.frame;
        frame.frame_type = FrameType::Key;

        self.transition(RoundTripState::Decoding);
        if let Err(e) = self.decoder.decode(&frame, false, None) {
            return Err(self.call_failure(case, Stage::Decode, e.to_string()));
        }

        self.transition(RoundTripState::AwaitingDecoded);
        let wait_started = Instant::now();
        let decoded = match self.synchronizer.wait_for_decoded_frame(self.decode_timeout) {
            WaitOutcome::Ready(decoded) => decoded,
            WaitOutcome::TimedOut { waited } => {
                return Err(self.timeout(case, Stage::Decode, waited));
            }
        };
        let decode_wait = wait_started.elapsed();

        let Some(picture) = decoded.frame else {
            return Err(self.fail(case, FailureReason::MissingDecodedFrame));
        };

        if checks.qp_equality && (frame.qp.is_none() || frame.qp != decoded.qp) {
            return Err(self.fail(
                case,
                FailureReason::QpMismatch {
                    encoded: frame.qp,
                    decoded: decoded.qp,
                },
            ));
        }

        let psnr_db = match checks.min_psnr_db {
            Some(threshold_db) => {
                let psnr_db = match i420_psnr(&input, &picture) {
                    Ok(psnr) => psnr,
                    Err(e) => return Err(self.call_failure(case, Stage::Verify, e.to_string())),
                };
                self.logger.debug(&format!(
                    "[{}] PSNR {:.2} dB (threshold {:.2} dB)",
                    self.codec, psnr_db, threshold_db
                ));
                if psnr_db <= threshold_db {
                    return Err(self.fail(
                        case,
                        FailureReason::QualityBelowThreshold {
                            psnr_db,
                            threshold_db,
                        },
                    ));
                }
                Some(psnr_db)
            }
            None => None,
        };

        self.transition(RoundTripState::Verified);

        Ok(RoundTripReport {
            case: case.name.clone(),
            codec: self.codec.clone(),
            frame_type: delivered_type,
            encoded_size: frame.len(),
            encoded_qp: frame.qp,
            decoded_qp: decoded.qp,
            psnr_db,
            encode_wait,
            decode_wait,
            trace: self.trace.clone(),
        })
    }

    fn transition(&mut self, next: RoundTripState) {
        if let Some(current) = self.trace.last() {
            if !current.can_transition_to(&next) {
                self.logger.warn(&format!(
                    "[{}] Unexpected transition {} -> {}",
                    self.codec, current, next
                ));
            }
            self.logger
                .debug(&format!("[{}] {} -> {}", self.codec, current, next));
        }
        self.trace.push(next);
    }

    fn fail(&mut self, case: &TestCase, reason: FailureReason) -> TestFailure {
        self.transition(RoundTripState::Failed(reason.clone()));
        TestFailure {
            case: case.name.clone(),
            reason,
            trace: self.trace.clone(),
        }
    }

    fn call_failure(&mut self, case: &TestCase, stage: Stage, error: String) -> TestFailure {
        self.fail(case, FailureReason::CallFailure { stage, error })
    }

    fn timeout(&mut self, case: &TestCase, stage: Stage, waited: Duration) -> TestFailure {
        self.logger.warn(&format!(
            "[{}] {} callback timed out, discarding codec pair",
            self.codec, stage
        ));
        self.discarded = true;
        self.fail(case, FailureReason::CallbackTimeout { stage, waited })
    }

    /// Releases both codecs. A discarded pair is dropped without release.
    pub fn tear_down(mut self) -> Result<(), HarnessError> {
        if self.discarded {
            self.logger
                .warn(&format!("[{}] Dropping discarded codec pair", self.codec));
            return Ok(());
        }

        let setup_error = |error| HarnessError::Setup {
            codec: self.codec.clone(),
            error,
        };
        self.encoder.release().map_err(setup_error)?;
        self.decoder.release().map_err(setup_error)?;
        self.logger.debug(&format!("[{}] Codec pair released", self.codec));
        Ok(())
    }
}
