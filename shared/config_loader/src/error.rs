use std::fmt;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be found
    FileNotFound(String),

    /// The file exists but could not be read
    ReadError(String),

    /// The file content is not valid for the requested type
    ParseError { path: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::ReadError(msg) => {
                write!(f, "Failed to read configuration file: {}", msg)
            }
            ConfigError::ParseError { path, message } => {
                write!(f, "Invalid configuration in {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
