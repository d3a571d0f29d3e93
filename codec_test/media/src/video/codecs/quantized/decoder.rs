//! I420Q decoder.

use super::bitstream::{FrameHeader, parse_frame};
use super::{DEFAULT_QUEUE_CAPACITY, Worker, dequantize_sample, quantizer_step, reconstruct};
use crate::common::constants::logging::DECODER_LOG_INTERVAL;
use crate::error::{MediaError, Result};
use crate::video::encoded::{DecodedFrame, EncodedFrame, FrameType};
use crate::video::frame::{Plane, VideoFrame, chroma_size};
use crate::video::settings::{CodecSettings, VideoCodecType};
use crate::video::sink::ResultSink;
use crate::video::traits::VideoDecoder;
use logging::Logger;
use std::time::Instant;

const WORKER_NAME: &str = "quantized-decoder";

enum DecoderCommand {
    Decode(DecodeJob),
    Reset,
}

struct DecodeJob {
    data: Vec<u8>,
    render_time_ms: Option<i64>,
    submitted_at: Instant,
    sink: ResultSink<DecodedFrame>,
}

struct Reference {
    width: u16,
    height: u16,
    samples: Vec<u8>,
}

/// Decoder state owned by the worker thread.
struct DecoderCore {
    reference: Option<Reference>,
    frames_decoded: u64,
    logger: Logger,
}

impl DecoderCore {
    fn handle(&mut self, command: DecoderCommand) {
        let job = match command {
            DecoderCommand::Decode(job) => job,
            DecoderCommand::Reset => {
                self.reference = None;
                self.logger.debug("Reference frame dropped");
                return;
            }
        };

        // Undecodable input completes without a callback.
        let (picture, qp) = match self.decode(&job.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.logger
                    .error(&format!("Dropping undecodable frame: {}", e));
                return;
            }
        };

        self.frames_decoded += 1;
        if self.frames_decoded.is_multiple_of(DECODER_LOG_INTERVAL) {
            self.logger.debug(&format!(
                "Decoded {} frames (latest: {}x{})",
                self.frames_decoded,
                picture.width(),
                picture.height()
            ));
        }

        let picture = picture.with_render_time_ms(job.render_time_ms.unwrap_or(0));
        let decoded =
            DecodedFrame::new(picture, Some(qp)).with_decode_time(job.submitted_at.elapsed());

        if job.sink.deliver(decoded) {
            self.logger
                .warn("Previous decoded frame was never consumed, overwritten");
        }
    }

    fn decode(&mut self, data: &[u8]) -> Result<(VideoFrame, u8)> {
        let (header, payload) = parse_frame(data)?;
        let step = quantizer_step(header.qp);

        let samples: Vec<u8> = match header.frame_type {
            FrameType::Key => payload
                .iter()
                .map(|&index| dequantize_sample(index, step))
                .collect(),
            FrameType::Delta => {
                let reference = self
                    .reference
                    .as_ref()
                    .filter(|r| r.width == header.width && r.height == header.height)
                    .ok_or_else(|| {
                        MediaError::Codec("delta frame without matching reference".to_string())
                    })?;
                payload
                    .chunks_exact(2)
                    .zip(&reference.samples)
                    .map(|(level, &previous)| {
                        reconstruct(previous, i16::from_be_bytes([level[0], level[1]]), step)
                    })
                    .collect()
            }
        };

        let picture = assemble_frame(&header, &samples)?;
        self.reference = Some(Reference {
            width: header.width,
            height: header.height,
            samples,
        });

        Ok((picture, header.qp))
    }
}

fn assemble_frame(header: &FrameHeader, samples: &[u8]) -> Result<VideoFrame> {
    let (width, height) = (header.width as usize, header.height as usize);
    let (cw, ch) = chroma_size(header.width as u32, header.height as u32);
    let luma_len = width * height;
    let chroma_len = cw * ch;

    let y = Plane::new(samples[..luma_len].to_vec(), width, height)?;
    let u = Plane::new(samples[luma_len..luma_len + chroma_len].to_vec(), cw, ch)?;
    let v = Plane::new(samples[luma_len + chroma_len..].to_vec(), cw, ch)?;

    VideoFrame::from_planes(
        header.width as u32,
        header.height as u32,
        y,
        u,
        v,
        header.timestamp,
    )
}

/// I420Q decoder with a worker-thread completion path
///
/// Input that is structurally unusable (empty, no reference for a delta
/// frame, known missing frames) is rejected synchronously. Frames whose
/// contents turn out to be corrupt are accepted and silently produce no
/// callback, as a hardware decoder would.
pub struct QuantizedDecoder {
    logger: Logger,
    initialized: bool,
    sink: Option<ResultSink<DecodedFrame>>,
    worker: Option<Worker<DecoderCommand>>,
    queue_capacity: usize,
    has_reference: bool,
}

impl QuantizedDecoder {
    pub fn new(logger: Logger) -> Self {
        QuantizedDecoder {
            logger,
            initialized: false,
            sink: None,
            worker: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            has_reference: false,
        }
    }

    /// Sets how many frames may wait for the worker before `decode` fails.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

impl VideoDecoder for QuantizedDecoder {
    fn init_decode(&mut self, settings: &CodecSettings) -> Result<()> {
        settings.validate()?;
        self.worker.take();

        self.logger.info(&format!(
            "Initializing I420Q decoder: {}x{}",
            settings.width, settings.height
        ));

        let mut core = DecoderCore {
            reference: None,
            frames_decoded: 0,
            logger: self.logger.clone(),
        };
        self.worker = Some(Worker::spawn(
            WORKER_NAME,
            self.queue_capacity,
            self.logger.clone(),
            move |command: DecoderCommand| core.handle(command),
        )?);

        self.initialized = true;
        self.has_reference = false;
        Ok(())
    }

    fn register_decode_complete_callback(&mut self, sink: ResultSink<DecodedFrame>) {
        self.sink = Some(sink);
    }

    fn decode(
        &mut self,
        frame: &EncodedFrame,
        missing_frames: bool,
        render_time_ms: Option<i64>,
    ) -> Result<()> {
        let worker = match self.worker.as_ref() {
            Some(worker) if self.initialized => worker,
            _ => return Err(MediaError::Uninitialized("decoder not initialized")),
        };
        let sink = self
            .sink
            .clone()
            .ok_or(MediaError::Uninitialized("decode complete callback not registered"))?;

        if frame.is_empty() {
            self.logger.warn("Rejecting empty bitstream");
            return Err(MediaError::Codec("Empty bitstream".to_string()));
        }

        if frame.frame_type == FrameType::Delta {
            if missing_frames {
                return Err(MediaError::Codec(
                    "Delta frame after missing frames, key frame required".to_string(),
                ));
            }
            if !self.has_reference {
                return Err(MediaError::Codec(
                    "Delta frame without a preceding key frame".to_string(),
                ));
            }
        }

        let job = DecodeJob {
            data: frame.data().to_vec(),
            render_time_ms,
            submitted_at: Instant::now(),
            sink,
        };
        if let Err(e) = worker.submit(DecoderCommand::Decode(job)) {
            self.logger.error(&format!("Rejecting frame: {}", e));
            return Err(e);
        }

        if frame.frame_type == FrameType::Key {
            self.has_reference = true;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.worker.take().is_some() {
            self.logger.info("Releasing I420Q decoder");
        }
        self.initialized = false;
        self.has_reference = false;
        Ok(())
    }

    fn get_codec(&self) -> &str {
        VideoCodecType::Quantized.name()
    }

    fn reset(&mut self) {
        self.logger.info("Resetting I420Q decoder");
        self.has_reference = false;
        if let Some(worker) = self.worker.as_ref()
            && let Err(e) = worker.submit_blocking(DecoderCommand::Reset)
        {
            self.logger.error(&format!("Failed to reset worker: {}", e));
        }
    }
}
