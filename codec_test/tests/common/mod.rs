//! Scripted codecs for driving the harness into specific outcomes.

#![allow(dead_code)]

use codec_test::{CodecFamily, HarnessConfig};
use logging::Logger;
use media::{
    CodecSettings, CodecSpecificInfo, DecodedFrame, EncodeResult, EncodedFrame, FrameType,
    MediaError, QuantizedDecoder, ResultSink, VideoCodecType, VideoDecoder, VideoEncoder,
    VideoFrame,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Calls made on scripted codecs, in order
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: &str) {
        self.0.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

#[derive(Clone)]
pub enum EncoderScript {
    /// Accept and deliver `payload` with the given type and QP
    Deliver {
        frame_type: FrameType,
        qp: Option<u8>,
        payload: Vec<u8>,
    },
    /// `encode` reports that the input queue is full
    RejectFull,
    /// Accept and never deliver
    Silent,
}

impl EncoderScript {
    pub fn key(qp: u8) -> Self {
        EncoderScript::Deliver {
            frame_type: FrameType::Key,
            qp: Some(qp),
            payload: vec![0xAB; 32],
        }
    }
}

pub struct ScriptedEncoder {
    script: EncoderScript,
    sink: Option<ResultSink<EncodeResult>>,
    calls: CallLog,
}

impl ScriptedEncoder {
    pub fn new(script: EncoderScript, calls: CallLog) -> Self {
        ScriptedEncoder {
            script,
            sink: None,
            calls,
        }
    }
}

impl VideoEncoder for ScriptedEncoder {
    fn init_encode(&mut self, _settings: &CodecSettings) -> media::Result<()> {
        self.calls.record("init_encode");
        Ok(())
    }

    fn register_encode_complete_callback(&mut self, sink: ResultSink<EncodeResult>) {
        self.sink = Some(sink);
    }

    fn encode(
        &mut self,
        frame: &VideoFrame,
        _codec_specific_info: Option<&CodecSpecificInfo>,
        _frame_types: Option<&[FrameType]>,
    ) -> media::Result<()> {
        self.calls.record("encode");
        match &self.script {
            EncoderScript::Deliver {
                frame_type,
                qp,
                payload,
            } => {
                let encoded = EncodedFrame::new(payload.clone(), *frame_type)
                    .with_qp(*qp)
                    .with_dimensions(frame.width(), frame.height())
                    .with_timestamp(frame.timestamp());
                if let Some(sink) = &self.sink {
                    sink.deliver(EncodeResult {
                        frame: encoded,
                        codec_specific_info: CodecSpecificInfo::generic(VideoCodecType::Generic),
                    });
                }
                Ok(())
            }
            EncoderScript::RejectFull => Err(MediaError::ResourceExhausted(
                "encoder input queue full".to_string(),
            )),
            EncoderScript::Silent => Ok(()),
        }
    }

    fn release(&mut self) -> media::Result<()> {
        self.calls.record("release_encoder");
        Ok(())
    }

    fn get_codec(&self) -> &str {
        "Scripted"
    }
}

#[derive(Clone, Copy)]
pub enum DecoderScript {
    /// Deliver a flat picture of the encoded size, reporting `qp + qp_offset`
    Flat { qp_offset: i16 },
    /// Complete the call without a picture
    NoPicture,
    /// `decode` fails synchronously
    Reject,
    /// Accept and never deliver
    Silent,
}

pub struct ScriptedDecoder {
    script: DecoderScript,
    sink: Option<ResultSink<DecodedFrame>>,
    calls: CallLog,
}

impl ScriptedDecoder {
    pub fn new(script: DecoderScript, calls: CallLog) -> Self {
        ScriptedDecoder {
            script,
            sink: None,
            calls,
        }
    }
}

impl VideoDecoder for ScriptedDecoder {
    fn init_decode(&mut self, _settings: &CodecSettings) -> media::Result<()> {
        self.calls.record("init_decode");
        Ok(())
    }

    fn register_decode_complete_callback(&mut self, sink: ResultSink<DecodedFrame>) {
        self.sink = Some(sink);
    }

    fn decode(
        &mut self,
        frame: &EncodedFrame,
        _missing_frames: bool,
        _render_time_ms: Option<i64>,
    ) -> media::Result<()> {
        self.calls.record("decode");
        let Some(sink) = &self.sink else {
            return Err(MediaError::Uninitialized("decode complete callback not registered"));
        };
        match self.script {
            DecoderScript::Flat { qp_offset } => {
                let picture =
                    VideoFrame::filled(frame.encoded_width, frame.encoded_height, 64, 128, 128);
                let qp = frame
                    .qp
                    .map(|qp| (i16::from(qp) + qp_offset).clamp(0, 255) as u8);
                sink.deliver(DecodedFrame::new(picture, qp));
                Ok(())
            }
            DecoderScript::NoPicture => {
                sink.deliver(DecodedFrame {
                    frame: None,
                    qp: frame.qp,
                    decode_time: None,
                });
                Ok(())
            }
            DecoderScript::Reject => Err(MediaError::Codec("scripted decode failure".to_string())),
            DecoderScript::Silent => Ok(()),
        }
    }

    fn release(&mut self) -> media::Result<()> {
        self.calls.record("release_decoder");
        Ok(())
    }

    fn get_codec(&self) -> &str {
        "Scripted"
    }
}

/// Family of scripted codecs sharing `calls`.
pub fn scripted_family(encoder: EncoderScript, decoder: DecoderScript, calls: &CallLog) -> CodecFamily {
    let encoder_calls = calls.clone();
    let decoder_calls = calls.clone();
    CodecFamily::new(
        "Scripted",
        VideoCodecType::Generic,
        move |_logger| {
            Ok(Box::new(ScriptedEncoder::new(encoder.clone(), encoder_calls.clone()))
                as Box<dyn VideoEncoder>)
        },
        move |_logger| {
            Ok(Box::new(ScriptedDecoder::new(decoder, decoder_calls.clone()))
                as Box<dyn VideoDecoder>)
        },
    )
    .with_qp_recovery(true)
}

/// Scripted encoder feeding the real quantized decoder.
pub fn scripted_into_quantized(encoder: EncoderScript, calls: &CallLog) -> CodecFamily {
    let encoder_calls = calls.clone();
    CodecFamily::new(
        "ScriptedIntoI420Q",
        VideoCodecType::Quantized,
        move |_logger| {
            Ok(Box::new(ScriptedEncoder::new(encoder.clone(), encoder_calls.clone()))
                as Box<dyn VideoEncoder>)
        },
        |logger| Ok(Box::new(QuantizedDecoder::new(logger)) as Box<dyn VideoDecoder>),
    )
}

/// Generous bounds for cases expected to complete.
pub fn patient_config() -> HarnessConfig {
    HarnessConfig::default().with_timeouts(Duration::from_millis(1000), Duration::from_millis(1000))
}

/// Short bounds for cases expected to time out.
pub fn impatient_config() -> HarnessConfig {
    HarnessConfig::default().with_timeouts(Duration::from_millis(30), Duration::from_millis(30))
}

pub fn quiet() -> Logger {
    Logger::disabled()
}
