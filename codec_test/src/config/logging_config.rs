use crate::error::HarnessError;
use logging::{LogLevel, Logger};
use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_file_path: String,
    pub log_level: String,
    pub enable_console: bool,
    pub enable_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_file_path: "codec_test.log".to_string(),
            log_level: "info".to_string(),
            enable_console: false,
            enable_file: false,
        }
    }
}

impl LoggingConfig {
    /// Builds the root logger described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the level name is unknown or the log file cannot be
    /// opened.
    pub fn build_logger(&self) -> Result<Logger, HarnessError> {
        let level: LogLevel = self.log_level.parse()?;

        if self.enable_file {
            Ok(Logger::with_component(
                self.log_file_path.clone().into(),
                level,
                Some("CodecTest".to_string()),
                self.enable_console,
            )?)
        } else {
            Ok(Logger::console(level, self.enable_console))
        }
    }
}
