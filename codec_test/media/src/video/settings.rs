//! Codec configuration handed to `init_encode` / `init_decode`.

use std::fmt;

/// Codec family identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodecType {
    H264,
    Quantized,
    Generic,
}

impl VideoCodecType {
    /// Canonical codec name as used in SDP
    pub fn name(&self) -> &'static str {
        match self {
            VideoCodecType::H264 => "H264",
            VideoCodecType::Quantized => "I420Q",
            VideoCodecType::Generic => "Generic",
        }
    }
}

impl fmt::Display for VideoCodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Settings shared by an encoder/decoder pair
#[derive(Debug, Clone, PartialEq)]
pub struct CodecSettings {
    pub codec_type: VideoCodecType,
    pub codec_name: String,
    pub width: u32,
    pub height: u32,
    /// Kilobits per second
    pub start_bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub min_bitrate_kbps: u32,
    pub max_framerate: u32,
    pub qp_max: u8,
    /// Frames between forced key frames
    pub key_frame_interval: u32,
    pub number_of_cores: u32,
}

impl CodecSettings {
    /// Reference defaults for a codec family: a small CIF-quarter clip with
    /// a generous bitrate range.
    pub fn for_codec(codec_type: VideoCodecType) -> Self {
        CodecSettings {
            codec_type,
            codec_name: codec_type.name().to_string(),
            width: 176,
            height: 144,
            start_bitrate_kbps: 300,
            max_bitrate_kbps: 4000,
            min_bitrate_kbps: 100,
            max_framerate: 30,
            qp_max: 56,
            key_frame_interval: 3000,
            number_of_cores: 1,
        }
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Checks the settings are usable by any codec.
    pub fn validate(&self) -> crate::Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(crate::MediaError::Config(format!(
                "Invalid resolution {}x{}",
                self.width, self.height
            )));
        }
        if self.max_framerate == 0 {
            return Err(crate::MediaError::Config(
                "max_framerate must be positive".to_string(),
            ));
        }
        if self.min_bitrate_kbps > self.max_bitrate_kbps {
            return Err(crate::MediaError::Config(format!(
                "min bitrate {} kbps exceeds max bitrate {} kbps",
                self.min_bitrate_kbps, self.max_bitrate_kbps
            )));
        }
        Ok(())
    }
}
