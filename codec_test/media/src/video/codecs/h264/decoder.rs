//! H.264 (AVC) video decoder implementation.
//!
//! Provides H.264 decoding using FFmpeg. The slice QP is recovered from the
//! bitstream with [`H264BitstreamParser`] and reported with each picture.

use super::convert::from_ffmpeg_frame;
use crate::common::constants::logging::DECODER_LOG_INTERVAL;
use crate::error::{MediaError, Result};
use crate::video::bitstream::H264BitstreamParser;
use crate::video::encoded::{DecodedFrame, EncodedFrame, FrameType};
use crate::video::settings::{CodecSettings, VideoCodecType};
use crate::video::sink::ResultSink;
use crate::video::traits::VideoDecoder;
use crate::video::utils::{extract_nal_type, is_parameter_set};
use ffmpeg::decoder::video::Video as FfmpegVideoDecoder;
use ffmpeg_next as ffmpeg;
use logging::Logger;
use std::time::Instant;

/// Represents an H.264 video decoder using FFmpeg.
pub struct H264Decoder {
    decoder: Option<FfmpegVideoDecoder>,
    sink: Option<ResultSink<DecodedFrame>>,
    parser: H264BitstreamParser,
    logger: Logger,
    frame_count: u64,
    received_sps_pps: bool,
}

impl H264Decoder {
    /// Creates an uninitialized decoder.
    ///
    /// # Errors
    ///
    /// Returns error if FFmpeg cannot be initialized.
    pub fn new(logger: Logger) -> Result<Self> {
        ffmpeg::init().map_err(|e| MediaError::Codec(format!("Error init ffmpeg: {}", e)))?;

        Ok(H264Decoder {
            decoder: None,
            sink: None,
            parser: H264BitstreamParser::new(),
            logger,
            frame_count: 0,
            received_sps_pps: false,
        })
    }

    fn open_decoder() -> Result<FfmpegVideoDecoder> {
        // Try multiple decoder lookups for compatibility
        let codec = ffmpeg::decoder::find_by_name("h264")
            .or_else(|| ffmpeg::decoder::find(ffmpeg::codec::Id::H264))
            .ok_or_else(|| MediaError::Codec("H264 decoder not found".to_string()))?;

        let mut ctx = ffmpeg::codec::context::Context::new_with_codec(codec);
        // Output each picture as soon as it is complete.
        ctx.set_flags(ffmpeg::codec::Flags::LOW_DELAY);

        ctx.decoder()
            .video()
            .map_err(|e| MediaError::Codec(format!("Error creating/opening decoder: {}", e)))
    }
}

impl VideoDecoder for H264Decoder {
    fn init_decode(&mut self, settings: &CodecSettings) -> Result<()> {
        settings.validate()?;
        self.logger.info(&format!(
            "Initializing H264 decoder: {}x{}",
            settings.width, settings.height
        ));

        self.decoder = Some(Self::open_decoder()?);
        self.parser = H264BitstreamParser::new();
        self.frame_count = 0;
        self.received_sps_pps = false;
        Ok(())
    }

    fn register_decode_complete_callback(&mut self, sink: ResultSink<DecodedFrame>) {
        self.sink = Some(sink);
    }

    /// Decodes one access unit.
    ///
    /// A packet that FFmpeg accepts without producing a picture returns
    /// `Ok(())` and delivers nothing.
    fn decode(
        &mut self,
        frame: &EncodedFrame,
        missing_frames: bool,
        render_time_ms: Option<i64>,
    ) -> Result<()> {
        let sink = self
            .sink
            .clone()
            .ok_or(MediaError::Uninitialized("decode complete callback not registered"))?;
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(MediaError::Uninitialized("decoder not initialized"));
        };

        if frame.is_empty() {
            self.logger.warn("Rejecting empty bitstream");
            return Err(MediaError::Codec("Empty bitstream".to_string()));
        }
        if frame.frame_type == FrameType::Delta && missing_frames {
            return Err(MediaError::Codec(
                "Delta frame after missing frames, key frame required".to_string(),
            ));
        }

        let started = Instant::now();
        let nal_type = extract_nal_type(frame.data());
        if is_parameter_set(nal_type) {
            self.received_sps_pps = true;
        }
        if !self.received_sps_pps {
            return Err(MediaError::Codec(
                "Frame data received before SPS/PPS".to_string(),
            ));
        }

        let packet = ffmpeg::Packet::copy(frame.data());
        decoder
            .send_packet(&packet)
            .map_err(|e| MediaError::Codec(format!("Failed to send packet: {}", e)))?;

        let mut decoded_frame = ffmpeg::frame::Video::empty();
        if decoder.receive_frame(&mut decoded_frame).is_err() {
            self.logger.debug("Packet accepted, no picture produced yet");
            return Ok(());
        }

        let picture = from_ffmpeg_frame(&decoded_frame, frame.timestamp)?
            .with_render_time_ms(render_time_ms.unwrap_or(0));

        let qp = match self.parser.parse_bitstream(frame.data()) {
            Ok(()) => self.parser.last_slice_qp(),
            Err(e) => {
                self.logger
                    .warn(&format!("Failed to parse QP from bitstream: {}", e));
                None
            }
        };

        self.frame_count += 1;
        if self.frame_count.is_multiple_of(DECODER_LOG_INTERVAL) {
            self.logger.debug(&format!(
                "Decoded {} frames (latest: {}x{})",
                self.frame_count,
                picture.width(),
                picture.height()
            ));
        }

        let decoded = DecodedFrame::new(picture, qp).with_decode_time(started.elapsed());
        if sink.deliver(decoded) {
            self.logger
                .warn("Previous decoded frame was never consumed, overwritten");
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.decoder.take().is_some() {
            self.logger.info("Releasing H264 decoder");
        }
        Ok(())
    }

    fn get_codec(&self) -> &str {
        VideoCodecType::H264.name()
    }

    fn reset(&mut self) {
        self.logger.info("Resetting H264 decoder");
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.flush();
        }
        self.received_sps_pps = false;
        self.frame_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CodecSettings {
        CodecSettings::for_codec(VideoCodecType::H264)
    }

    #[test]
    fn test_decoder_creation() {
        let mut decoder = H264Decoder::new(Logger::disabled()).unwrap();
        assert!(decoder.init_decode(&settings()).is_ok());
        assert_eq!(decoder.get_codec(), "H264");
    }

    #[test]
    fn test_empty_bitstream_rejected() {
        let mut decoder = H264Decoder::new(Logger::disabled()).unwrap();
        decoder.register_decode_complete_callback(ResultSink::new());
        decoder.init_decode(&settings()).unwrap();

        let empty = EncodedFrame::new(Vec::new(), FrameType::Key);
        assert!(decoder.decode(&empty, false, None).is_err());
    }

    #[test]
    fn test_slice_before_parameter_sets_rejected() {
        let mut decoder = H264Decoder::new(Logger::disabled()).unwrap();
        decoder.register_decode_complete_callback(ResultSink::new());
        decoder.init_decode(&settings()).unwrap();

        let idr = EncodedFrame::new(vec![0x00, 0x00, 0x00, 0x01, 0x65, 0x88], FrameType::Key);
        assert!(decoder.decode(&idr, false, None).is_err());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut decoder = H264Decoder::new(Logger::disabled()).unwrap();
        decoder.init_decode(&settings()).unwrap();
        decoder.reset();
        assert_eq!(decoder.frame_count, 0);
        assert!(!decoder.received_sps_pps);
    }
}
