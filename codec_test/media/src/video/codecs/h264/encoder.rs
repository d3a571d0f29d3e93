//! H.264 (AVC) video encoder implementation.
//!
//! Provides H.264 encoding using FFmpeg's libx264, tuned for zero latency so
//! every submitted frame yields its packet before `encode` returns. The
//! completion callback is therefore delivered on the caller's thread.

use super::convert::to_ffmpeg_frame;
use crate::common::constants::logging::ENCODER_LOG_INTERVAL;
use crate::error::{MediaError, Result};
use crate::video::bitstream::H264BitstreamParser;
use crate::video::constants::h264::*;
use crate::video::encoded::{
    CodecSpecificInfo, CodecSpecifics, EncodeResult, EncodedFrame, FrameType,
};
use crate::video::frame::VideoFrame;
use crate::video::settings::{CodecSettings, VideoCodecType};
use crate::video::sink::ResultSink;
use crate::video::traits::VideoEncoder;
use crate::video::utils::{is_parameter_set, split_nal_units};
use ffmpeg_next as ffmpeg;
use logging::Logger;

/// RFC 6184 non-interleaved mode
const PACKETIZATION_MODE: u8 = 1;

/// Represents an H.264 video encoder using FFmpeg.
///
/// Caches SPS/PPS parameter sets and prepends them to IDR frames that
/// arrive without them, so every key frame is independently decodable.
pub struct H264Encoder {
    encoder: Option<ffmpeg::encoder::Video>,
    settings: Option<CodecSettings>,
    sink: Option<ResultSink<EncodeResult>>,
    parser: H264BitstreamParser,
    logger: Logger,
    frame_count: u64,
    pts: i64,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
}

impl H264Encoder {
    /// Creates an uninitialized encoder.
    ///
    /// # Errors
    ///
    /// Returns error if FFmpeg cannot be initialized.
    pub fn new(logger: Logger) -> Result<Self> {
        ffmpeg::init().map_err(|e| MediaError::Codec(format!("Error init ffmpeg: {}", e)))?;

        Ok(H264Encoder {
            encoder: None,
            settings: None,
            sink: None,
            parser: H264BitstreamParser::new(),
            logger,
            frame_count: 0,
            pts: 0,
            sps: None,
            pps: None,
        })
    }

    fn open_encoder(&self, settings: &CodecSettings) -> Result<ffmpeg::encoder::Video> {
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::H264)
            .ok_or_else(|| MediaError::Codec("H264 codec not found".to_string()))?
            .video()
            .map_err(|e| MediaError::Codec(format!("Not a video codec: {}", e)))?;

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(*codec)
            .encoder()
            .video()
            .map_err(|e| MediaError::Codec(format!("Error creating context: {}", e)))?;

        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_bit_rate(settings.start_bitrate_kbps as usize * 1000);
        encoder.set_max_bit_rate(settings.max_bitrate_kbps as usize * 1000);

        let fps = settings.max_framerate as i32;
        encoder.set_time_base((1, fps));
        encoder.set_frame_rate(Some((fps, 1)));

        encoder.set_gop(settings.key_frame_interval);
        encoder.set_max_b_frames(0); // Disable B-frames for low latency
        encoder.set_qmax((settings.qp_max as i32).min(MAX_QP));

        let mut opts = ffmpeg::Dictionary::new();
        opts.set("preset", "ultrafast");
        opts.set("tune", "zerolatency");
        opts.set("threads", settings.number_of_cores.max(1).to_string().as_str());
        opts.set("rc-lookahead", "0");
        opts.set("sliced-threads", "0");
        // Key-frame requests must produce IDR pictures, not just I slices.
        opts.set("forced-idr", "1");

        encoder
            .open_with(opts)
            .map_err(|e| MediaError::Codec(format!("Error opening encoder: {}", e)))
    }

    /// Caches parameter sets and prepends them to IDR access units that lack them.
    fn complete_access_unit(&mut self, data: Vec<u8>) -> Vec<u8> {
        let mut has_sps = false;
        let mut has_pps = false;
        let mut is_idr = false;

        for nal in split_nal_units(&data) {
            let Some(&header) = nal.first() else { continue };
            let nal_type = header & NAL_TYPE_MASK;
            if is_parameter_set(nal_type) {
                let mut unit = NAL_START_CODE_4.to_vec();
                unit.extend_from_slice(nal);
                if nal_type == NAL_TYPE_SPS {
                    self.logger.debug("Caching SPS parameter set");
                    self.sps = Some(unit);
                    has_sps = true;
                } else {
                    self.logger.debug("Caching PPS parameter set");
                    self.pps = Some(unit);
                    has_pps = true;
                }
            } else if nal_type == NAL_TYPE_IDR {
                is_idr = true;
            }
        }

        if !is_idr || (has_sps && has_pps) {
            return data;
        }
        match (&self.sps, &self.pps) {
            (Some(sps), Some(pps)) => {
                self.logger.debug("Prepending cached SPS/PPS to IDR frame");
                let mut unit = Vec::with_capacity(sps.len() + pps.len() + data.len());
                unit.extend_from_slice(sps);
                unit.extend_from_slice(pps);
                unit.extend_from_slice(&data);
                unit
            }
            _ => data,
        }
    }

    /// Returns cached SPS parameter set if available
    pub fn get_sps(&self) -> Option<&Vec<u8>> {
        self.sps.as_ref()
    }

    /// Returns cached PPS parameter set if available
    pub fn get_pps(&self) -> Option<&Vec<u8>> {
        self.pps.as_ref()
    }
}

impl VideoEncoder for H264Encoder {
    fn init_encode(&mut self, settings: &CodecSettings) -> Result<()> {
        settings.validate()?;

        self.logger.info(&format!(
            "Initializing H264 encoder: {}x{}, bitrate={}kbps, fps={}, gop={}, qp_max={}",
            settings.width,
            settings.height,
            settings.start_bitrate_kbps,
            settings.max_framerate,
            settings.key_frame_interval,
            settings.qp_max
        ));

        self.encoder = Some(self.open_encoder(settings)?);
        self.settings = Some(settings.clone());
        self.parser = H264BitstreamParser::new();
        self.frame_count = 0;
        self.pts = 0;
        self.sps = None;
        self.pps = None;
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
        let sink = self
            .sink
            .clone()
            .ok_or(MediaError::Uninitialized("encode complete callback not registered"))?;
        let (Some(encoder), Some(settings)) = (self.encoder.as_mut(), self.settings.as_ref()) else {
            return Err(MediaError::Uninitialized("encoder not initialized"));
        };

        if frame.width() != settings.width || frame.height() != settings.height {
            return Err(MediaError::DimensionMismatch {
                expected: (settings.width, settings.height),
                actual: (frame.width(), frame.height()),
            });
        }

        let mut yuv_frame = to_ffmpeg_frame(frame);
        yuv_frame.set_pts(Some(self.pts));
        self.pts += 1;

        let key_requested = frame_types.is_some_and(|types| types.contains(&FrameType::Key));
        if key_requested || self.frame_count == 0 {
            yuv_frame.set_kind(ffmpeg::picture::Type::I);
        }

        encoder
            .send_frame(&yuv_frame)
            .map_err(|e| MediaError::Codec(format!("Error sending frame: {}", e)))?;

        let mut data = Vec::new();
        let mut is_key = false;
        let mut encoded_packet = ffmpeg::Packet::empty();
        while encoder.receive_packet(&mut encoded_packet).is_ok() {
            data.extend_from_slice(encoded_packet.data().unwrap_or(&[]));
            is_key |= encoded_packet.is_key();
        }

        if data.is_empty() {
            self.logger.error("Encoder produced no output for frame");
            return Err(MediaError::Codec("Encoder produced no output".to_string()));
        }

        let data = self.complete_access_unit(data);

        let qp = match self.parser.parse_bitstream(&data) {
            Ok(()) => self.parser.last_slice_qp(),
            Err(e) => {
                self.logger
                    .warn(&format!("Failed to parse QP from encoded frame: {}", e));
                None
            }
        };

        let frame_type = if is_key {
            FrameType::Key
        } else {
            FrameType::Delta
        };

        self.frame_count += 1;
        if self.frame_count.is_multiple_of(ENCODER_LOG_INTERVAL) {
            self.logger
                .debug(&format!("Encoded {} frames", self.frame_count));
        }
        self.logger.debug(&format!(
            "Encoded packet: size={}, frame_type={}, qp={:?}",
            data.len(),
            frame_type,
            qp
        ));

        let result = EncodeResult {
            frame: EncodedFrame::new(data, frame_type)
                .with_qp(qp)
                .with_dimensions(frame.width(), frame.height())
                .with_timestamp(frame.timestamp()),
            codec_specific_info: CodecSpecificInfo {
                codec_type: VideoCodecType::H264,
                specifics: CodecSpecifics::H264 {
                    packetization_mode: PACKETIZATION_MODE,
                    idr_frame: is_key,
                },
            },
        };

        if sink.deliver(result) {
            self.logger
                .warn("Previous encoded frame was never consumed, overwritten");
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.encoder.take().is_some() {
            self.logger.info("Releasing H264 encoder");
        }
        self.settings = None;
        Ok(())
    }

    fn get_codec(&self) -> &str {
        VideoCodecType::H264.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> CodecSettings {
        CodecSettings::for_codec(VideoCodecType::H264)
    }

    #[test]
    fn test_first_frame_is_idr_with_qp() {
        let mut encoder = H264Encoder::new(Logger::disabled()).unwrap();
        let sink = ResultSink::new();
        encoder.register_encode_complete_callback(sink.clone());
        encoder.init_encode(&settings()).unwrap();

        let frame = VideoFrame::filled(176, 144, 100, 120, 140);
        encoder.encode(&frame, None, None).unwrap();

        let result = sink.wait_take(Duration::ZERO).unwrap();
        assert_eq!(result.frame.frame_type, FrameType::Key);
        assert!(result.frame.qp.is_some());
        assert!(encoder.get_sps().is_some());
        assert!(encoder.get_pps().is_some());
    }

    #[test]
    fn test_encode_before_init_fails() {
        let mut encoder = H264Encoder::new(Logger::disabled()).unwrap();
        encoder.register_encode_complete_callback(ResultSink::new());
        let frame = VideoFrame::filled(176, 144, 0, 0, 0);

        assert!(matches!(
            encoder.encode(&frame, None, None),
            Err(MediaError::Uninitialized(_))
        ));
    }

    #[test]
    fn test_encoder_trait() {
        let encoder = H264Encoder::new(Logger::disabled()).unwrap();
        assert_eq!(encoder.get_codec(), "H264");
    }
}
