use crate::config::LoggingConfig;
use crate::error::HarnessError;
use config_loader::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "codec_test.json";

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "CODEC_TEST_CONFIG";

/// Input clip parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    pub frame_count: usize,
    pub seed: u64,
}

impl Default for ClipConfig {
    fn default() -> Self {
        ClipConfig {
            frame_count: 10,
            seed: 1,
        }
    }
}

/// Which codec suites run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecToggles {
    pub quantized: bool,
    /// Also requires the `h264` feature and an FFmpeg build with libx264
    pub h264: bool,
}

impl Default for CodecToggles {
    fn default() -> Self {
        CodecToggles {
            quantized: true,
            h264: true,
        }
    }
}

/// Round-trip harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Decoded PSNR must exceed this (dB)
    pub psnr_threshold_db: f64,
    pub encode_timeout_ms: u64,
    pub decode_timeout_ms: u64,
    pub clip: ClipConfig,
    pub codecs: CodecToggles,
    pub logging: LoggingConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            psnr_threshold_db: 36.0,
            encode_timeout_ms: 100,
            decode_timeout_ms: 25,
            clip: ClipConfig::default(),
            codecs: CodecToggles::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, HarnessError> {
        let config: HarnessConfig = config_loader::load_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self, HarnessError> {
        let config: HarnessConfig = config_loader::parse_json(content, "<inline>")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration file from `$CODEC_TEST_CONFIG`,
    /// `./config/codec_test.json` or `./codec_test.json`, falling back to
    /// defaults when none exists.
    pub fn find_and_load() -> Result<Self, HarnessError> {
        match config_loader::find_config_file(CONFIG_FILE_NAME, CONFIG_ENV_VAR) {
            Ok(path) => Self::load_from_file(path),
            Err(ConfigError::FileNotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, HarnessError> {
        serde_json::to_string_pretty(self).map_err(|e| HarnessError::InvalidConfig(e.to_string()))
    }

    pub fn encode_timeout(&self) -> Duration {
        Duration::from_millis(self.encode_timeout_ms)
    }

    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }

    /// Sets both callback timeouts.
    pub fn with_timeouts(mut self, encode: Duration, decode: Duration) -> Self {
        self.encode_timeout_ms = encode.as_millis() as u64;
        self.decode_timeout_ms = decode.as_millis() as u64;
        self
    }

    /// Checks values that deserialize fine but cannot drive a round trip.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if !self.psnr_threshold_db.is_finite() {
            return Err(HarnessError::InvalidConfig(format!(
                "psnr_threshold_db must be finite, got {}",
                self.psnr_threshold_db
            )));
        }
        if self.clip.frame_count == 0 {
            return Err(HarnessError::InvalidConfig(
                "clip.frame_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();

        assert_eq!(config.psnr_threshold_db, 36.0);
        assert_eq!(config.encode_timeout(), Duration::from_millis(100));
        assert_eq!(config.decode_timeout(), Duration::from_millis(25));
        assert_eq!(config.clip.frame_count, 10);
        assert!(config.codecs.quantized && config.codecs.h264);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            HarnessConfig::from_json(r#"{ "psnr_threshold_db": 40.5, "codecs": { "h264": false } }"#)
                .unwrap();

        assert_eq!(config.psnr_threshold_db, 40.5);
        assert!(!config.codecs.h264);
        assert!(config.codecs.quantized);
        assert_eq!(config.encode_timeout_ms, 100);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "encode_timeout_ms": 500, "decode_timeout_ms": 250, "clip": {{ "seed": 9 }} }}"#
        )
        .unwrap();

        let config = HarnessConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.encode_timeout(), Duration::from_millis(500));
        assert_eq!(config.decode_timeout(), Duration::from_millis(250));
        assert_eq!(config.clip.seed, 9);
        assert_eq!(config.clip.frame_count, 10);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            HarnessConfig::from_json("{ not json"),
            Err(HarnessError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_zero_frame_clip_rejected() {
        assert!(matches!(
            HarnessConfig::from_json(r#"{ "clip": { "frame_count": 0 } }"#),
            Err(HarnessError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = HarnessConfig::default().with_timeouts(
            Duration::from_millis(1000),
            Duration::from_millis(500),
        );
        let json = config.to_json().unwrap();
        assert_eq!(HarnessConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("config")
            .join(CONFIG_FILE_NAME);
        assert_eq!(
            HarnessConfig::load_from_file(path).unwrap(),
            HarnessConfig::default()
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(matches!(
            HarnessConfig::load_from_file("/nonexistent/codec_test.json"),
            Err(HarnessError::Config(ConfigError::FileNotFound(_)))
        ));
    }
}
