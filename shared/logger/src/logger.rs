//! Thread-safe logger front end.
//!
//! [`Logger`] is cheap to clone and safe to hand to codec worker threads.
//! All clones (and all component loggers derived with
//! [`Logger::for_component`]) share one target.

use crate::error::Result;
use crate::log_level::LogLevel;
use crate::log_message::LogMessage;
use crate::log_writer::spawn_file_writer;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// In-memory log target, shared between a logger and whoever inspects it.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogBuffer {
    fn push(&self, line: String) {
        let mut lines = self
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line);
    }

    /// Returns a snapshot of every line recorded so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns true if any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

#[derive(Clone)]
enum LogTarget {
    File(Sender<LogMessage>),
    Memory(LogBuffer),
    Null,
}

/// Thread-safe, non-blocking logger.
///
/// # Examples
///
/// ```
/// use logging::{LogLevel, Logger};
///
/// let (logger, buffer) = Logger::in_memory(LogLevel::Info);
/// let encoder_log = logger.for_component("Encoder");
/// encoder_log.info("Initialized");
/// assert!(buffer.contains("[Encoder]: Initialized"));
/// ```
#[derive(Clone)]
pub struct Logger {
    target: LogTarget,
    level: LogLevel,
    component: Option<String>,
    console_output: bool,
}

impl Logger {
    /// Creates a logger appending to `log_path` from a dedicated writer thread.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn new(log_path: PathBuf, level: LogLevel) -> Result<Self> {
        Self::with_component(log_path, level, None, false)
    }

    /// Creates a file logger with an optional component name and console echo.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn with_component(
        log_path: PathBuf,
        level: LogLevel,
        component: Option<String>,
        console_output: bool,
    ) -> Result<Self> {
        let sender = spawn_file_writer(&log_path)?;
        Ok(Logger {
            target: LogTarget::File(sender),
            level,
            component,
            console_output,
        })
    }

    /// Creates a logger that records into memory, plus the buffer to read it back.
    ///
    /// Lines are appended synchronously, so they are visible as soon as the
    /// logging call returns.
    pub fn in_memory(level: LogLevel) -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        let logger = Logger {
            target: LogTarget::Memory(buffer.clone()),
            level,
            component: None,
            console_output: false,
        };
        (logger, buffer)
    }

    /// Creates a logger that drops everything except optional console echo.
    pub fn console(level: LogLevel, console_output: bool) -> Self {
        Logger {
            target: LogTarget::Null,
            level,
            component: None,
            console_output,
        }
    }

    /// Creates a logger that discards every message.
    pub fn disabled() -> Self {
        Self::console(LogLevel::Error, false)
    }

    /// Returns a logger sharing this target but tagged with another component.
    pub fn for_component(&self, component: &str) -> Self {
        Logger {
            component: Some(component.to_string()),
            ..self.clone()
        }
    }

    /// Minimum level this logger records.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Logs a debug message (only if level is Debug).
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs an info message (only if level is Info or lower).
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Logs a warning message (only if level is Warn or lower).
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Logs an error message (always recorded).
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if level < self.level {
            return;
        }

        let msg = LogMessage::new(level, self.component.clone(), message.to_string());

        if self.console_output {
            print!("{}", msg.format());
        }

        match &self.target {
            LogTarget::File(sender) => {
                let _ = sender.send(msg);
            }
            LogTarget::Memory(buffer) => buffer.push(msg.format()),
            LogTarget::Null => {}
        }
    }
}
