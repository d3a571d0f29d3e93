//! Codec families: how to build, configure and judge one encoder/decoder pair.
//!
//! A family is plain data plus three functions, so a new codec joins the
//! harness by constructing a value rather than implementing a fixture.

use logging::Logger;
use media::{
    CodecSettings, QuantizedDecoder, QuantizedEncoder, VideoCodecType, VideoDecoder, VideoEncoder,
    h264,
};

/// Builds an uninitialized encoder
pub type EncoderFactory = Box<dyn Fn(Logger) -> media::Result<Box<dyn VideoEncoder>>>;

/// Builds an uninitialized decoder
pub type DecoderFactory = Box<dyn Fn(Logger) -> media::Result<Box<dyn VideoDecoder>>>;

/// Adjusts the reference settings before both codecs are initialized
pub type SettingsModifier = Box<dyn Fn(&mut CodecSettings)>;

pub struct CodecFamily {
    pub name: String,
    pub codec_type: VideoCodecType,
    encoder_factory: EncoderFactory,
    decoder_factory: DecoderFactory,
    modify_settings: SettingsModifier,
    /// The decoder reports the QP it parsed from the bitstream
    pub supports_qp_recovery: bool,
}

impl CodecFamily {
    pub fn new<E, D>(name: &str, codec_type: VideoCodecType, encoder_factory: E, decoder_factory: D) -> Self
    where
        E: Fn(Logger) -> media::Result<Box<dyn VideoEncoder>> + 'static,
        D: Fn(Logger) -> media::Result<Box<dyn VideoDecoder>> + 'static,
    {
        CodecFamily {
            name: name.to_string(),
            codec_type,
            encoder_factory: Box::new(encoder_factory),
            decoder_factory: Box::new(decoder_factory),
            modify_settings: Box::new(|_| {}),
            supports_qp_recovery: false,
        }
    }

    pub fn with_settings_modifier<F>(mut self, modify: F) -> Self
    where
        F: Fn(&mut CodecSettings) + 'static,
    {
        self.modify_settings = Box::new(modify);
        self
    }

    pub fn with_qp_recovery(mut self, supported: bool) -> Self {
        self.supports_qp_recovery = supported;
        self
    }

    /// The worker-thread reference codec.
    pub fn quantized() -> Self {
        CodecFamily::new(
            "I420Q",
            VideoCodecType::Quantized,
            |logger| Ok(Box::new(QuantizedEncoder::new(logger)) as Box<dyn VideoEncoder>),
            |logger| Ok(Box::new(QuantizedDecoder::new(logger)) as Box<dyn VideoDecoder>),
        )
        .with_qp_recovery(true)
    }

    /// FFmpeg H.264; creation fails with `Unsupported` unless built with `h264`.
    pub fn h264() -> Self {
        CodecFamily::new(
            "H264",
            VideoCodecType::H264,
            h264::create_encoder,
            h264::create_decoder,
        )
        .with_settings_modifier(|settings| {
            // Single slice per frame keeps one slice QP per picture.
            settings.number_of_cores = 1;
        })
        .with_qp_recovery(true)
    }

    /// Reference settings for this family after its modifier has run.
    pub fn settings(&self) -> CodecSettings {
        let mut settings = CodecSettings::for_codec(self.codec_type);
        (self.modify_settings)(&mut settings);
        settings
    }

    pub fn create_encoder(&self, logger: Logger) -> media::Result<Box<dyn VideoEncoder>> {
        (self.encoder_factory)(logger)
    }

    pub fn create_decoder(&self, logger: Logger) -> media::Result<Box<dyn VideoDecoder>> {
        (self.decoder_factory)(logger)
    }
}

impl std::fmt::Debug for CodecFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecFamily")
            .field("name", &self.name)
            .field("codec_type", &self.codec_type)
            .field("supports_qp_recovery", &self.supports_qp_recovery)
            .finish_non_exhaustive()
    }
}
