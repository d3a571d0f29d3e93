//! Thread-safe logging library shared by the codec test workspace.
//!
//! Messages can go to a file (through a dedicated writer thread), to an
//! in-memory buffer that tests inspect, or nowhere at all.

pub mod error;
mod log_level;
mod log_message;
mod log_writer;
mod logger;

pub use error::{LoggingError, Result};
pub use log_level::LogLevel;
pub use logger::{LogBuffer, Logger};
