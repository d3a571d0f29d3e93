//! I420Q encoder.

use super::bitstream::{FrameHeader, HEADER_LEN};
use super::{
    DEFAULT_QP, DEFAULT_QUEUE_CAPACITY, Worker, dequantize_sample, quantize_residual,
    quantize_sample, quantizer_step, reconstruct,
};
use crate::common::constants::logging::ENCODER_LOG_INTERVAL;
use crate::error::{MediaError, Result};
use crate::video::encoded::{
    CodecSpecificInfo, CodecSpecifics, EncodeResult, EncodedFrame, FrameType,
};
use crate::video::frame::VideoFrame;
use crate::video::settings::{CodecSettings, VideoCodecType};
use crate::video::sink::ResultSink;
use crate::video::traits::VideoEncoder;
use logging::Logger;

const WORKER_NAME: &str = "quantized-encoder";

struct EncodeJob {
    frame: VideoFrame,
    frame_type: FrameType,
    sink: ResultSink<EncodeResult>,
}

/// Encoder state owned by the worker thread.
struct EncoderCore {
    qp: u8,
    step: u16,
    /// Decoder-side reconstruction of the last frame, planes concatenated
    reference: Option<Vec<u8>>,
    frames_encoded: u64,
    logger: Logger,
}

impl EncoderCore {
    fn handle(&mut self, job: EncodeJob) {
        let result = self.encode(&job.frame, job.frame_type);

        self.frames_encoded += 1;
        if self.frames_encoded.is_multiple_of(ENCODER_LOG_INTERVAL) {
            self.logger
                .debug(&format!("Encoded {} frames", self.frames_encoded));
        }

        self.logger.debug(&format!(
            "Encoded {} frame: size={}, qp={}, ts={}",
            result.frame.frame_type,
            result.frame.len(),
            self.qp,
            result.frame.timestamp
        ));

        if job.sink.deliver(result) {
            self.logger
                .warn("Previous encoded frame was never consumed, overwritten");
        }
    }

    fn encode(&mut self, frame: &VideoFrame, requested: FrameType) -> EncodeResult {
        let sample_count = frame.sample_count();
        let samples = frame.planes().iter().flat_map(|p| p.data().iter().copied());

        let frame_type = match self.reference {
            Some(ref r) if requested == FrameType::Delta && r.len() == sample_count => {
                FrameType::Delta
            }
            _ => FrameType::Key,
        };

        let mut payload = Vec::with_capacity(match frame_type {
            FrameType::Key => sample_count,
            FrameType::Delta => 2 * sample_count,
        });
        let mut reconstruction = Vec::with_capacity(sample_count);

        match (frame_type, self.reference.as_deref()) {
            (FrameType::Delta, Some(reference)) => {
                for (sample, &previous) in samples.zip(reference) {
                    let level = quantize_residual(sample as i16 - previous as i16, self.step);
                    payload.extend_from_slice(&level.to_be_bytes());
                    reconstruction.push(reconstruct(previous, level, self.step));
                }
            }
            _ => {
                for sample in samples {
                    let index = quantize_sample(sample, self.step);
                    payload.push(index);
                    reconstruction.push(dequantize_sample(index, self.step));
                }
            }
        }

        let header = FrameHeader {
            frame_type,
            qp: self.qp,
            width: frame.width() as u16,
            height: frame.height() as u16,
            timestamp: frame.timestamp(),
            payload_len: payload.len() as u32,
        };
        let mut data = Vec::with_capacity(HEADER_LEN + payload.len());
        header.write_to(&mut data);
        data.extend_from_slice(&payload);

        self.reference = Some(reconstruction);

        EncodeResult {
            frame: EncodedFrame::new(data, frame_type)
                .with_qp(Some(self.qp))
                .with_dimensions(frame.width(), frame.height())
                .with_timestamp(frame.timestamp()),
            codec_specific_info: CodecSpecificInfo {
                codec_type: VideoCodecType::Quantized,
                specifics: CodecSpecifics::Quantized {
                    quantizer_step: self.step,
                },
            },
        }
    }
}

/// I420Q encoder with a worker-thread completion path
///
/// The first frame after `init_encode` is always a key frame. Later frames
/// are delta frames unless a key frame is requested or the key-frame
/// interval elapses.
pub struct QuantizedEncoder {
    logger: Logger,
    settings: Option<CodecSettings>,
    qp: u8,
    sink: Option<ResultSink<EncodeResult>>,
    worker: Option<Worker<EncodeJob>>,
    queue_capacity: usize,
    frames_submitted: u64,
}

impl QuantizedEncoder {
    pub fn new(logger: Logger) -> Self {
        QuantizedEncoder {
            logger,
            settings: None,
            qp: DEFAULT_QP,
            sink: None,
            worker: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            frames_submitted: 0,
        }
    }

    /// Sets how many frames may wait for the worker before `encode` fails.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// QP chosen at initialization
    pub fn qp(&self) -> u8 {
        self.qp
    }

    fn next_frame_type(&self, settings: &CodecSettings, frame_types: Option<&[FrameType]>) -> FrameType {
        let requested = frame_types.is_some_and(|types| types.contains(&FrameType::Key));
        let interval_elapsed = settings.key_frame_interval > 0
            && self
                .frames_submitted
                .is_multiple_of(settings.key_frame_interval as u64);

        if self.frames_submitted == 0 || requested || interval_elapsed {
            FrameType::Key
        } else {
            FrameType::Delta
        }
    }
}

impl VideoEncoder for QuantizedEncoder {
    fn init_encode(&mut self, settings: &CodecSettings) -> Result<()> {
        settings.validate()?;
        if settings.width > u16::MAX as u32 || settings.height > u16::MAX as u32 {
            return Err(MediaError::Config(format!(
                "I420Q supports at most {}x{}",
                u16::MAX,
                u16::MAX
            )));
        }

        // Re-initialization restarts the stream.
        self.worker.take();

        self.qp = DEFAULT_QP.min(settings.qp_max);
        let step = quantizer_step(self.qp);

        self.logger.info(&format!(
            "Initializing I420Q encoder: {}x{}, qp={}, step={}, gop={}",
            settings.width, settings.height, self.qp, step, settings.key_frame_interval
        ));

        let mut core = EncoderCore {
            qp: self.qp,
            step,
            reference: None,
            frames_encoded: 0,
            logger: self.logger.clone(),
        };
        self.worker = Some(Worker::spawn(
            WORKER_NAME,
            self.queue_capacity,
            self.logger.clone(),
            move |job: EncodeJob| core.handle(job),
        )?);

        self.settings = Some(settings.clone());
        self.frames_submitted = 0;
        Ok(())
    }

    fn register_encode_complete_callback(&mut self, sink: ResultSink<EncodeResult>) {
        self.sink = Some(sink);
    }

    fn encode(
        &mut self,
        frame: &VideoFrame,
        _codec_specific_info: Option<&CodecSpecificInfo>,
        frame_types: Option<&[FrameType]>,
    ) -> Result<()> {
        let (Some(worker), Some(settings)) = (self.worker.as_ref(), self.settings.as_ref()) else {
            return Err(MediaError::Uninitialized("encoder not initialized"));
        };
        let sink = self
            .sink
            .clone()
            .ok_or(MediaError::Uninitialized("encode complete callback not registered"))?;

        if frame.width() != settings.width || frame.height() != settings.height {
            return Err(MediaError::DimensionMismatch {
                expected: (settings.width, settings.height),
                actual: (frame.width(), frame.height()),
            });
        }

        let frame_type = self.next_frame_type(settings, frame_types);
        let job = EncodeJob {
            frame: frame.clone(),
            frame_type,
            sink,
        };

        if let Err(e) = worker.submit(job) {
            self.logger.error(&format!("Rejecting frame: {}", e));
            return Err(e);
        }

        self.frames_submitted += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.worker.take().is_some() {
            self.logger.info("Releasing I420Q encoder");
        }
        self.settings = None;
        self.frames_submitted = 0;
        Ok(())
    }

    fn get_codec(&self) -> &str {
        VideoCodecType::Quantized.name()
    }
}
