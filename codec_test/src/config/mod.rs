//! Harness configuration

pub mod harness_config;
pub mod logging_config;

pub use harness_config::{ClipConfig, CodecToggles, HarnessConfig};
pub use logging_config::LoggingConfig;
