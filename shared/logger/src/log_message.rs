//! Internal log message structure.

use crate::log_level::LogLevel;
use chrono::Local;

/// Internal representation of a log message.
#[derive(Debug, Clone)]
pub(crate) struct LogMessage {
    pub timestamp: String,
    pub level: LogLevel,
    pub thread: String,
    pub component: Option<String>,
    pub message: String,
}

impl LogMessage {
    /// Creates a message stamped with the current time and calling thread.
    pub fn new(level: LogLevel, component: Option<String>, message: String) -> Self {
        let current = std::thread::current();
        let thread = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));

        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level,
            thread,
            component,
            message,
        }
    }

    /// Formats message as `[timestamp] LEVEL (thread) [component]: message\n`
    pub fn format(&self) -> String {
        match self.component {
            Some(ref component) => format!(
                "[{}] {} ({}) [{}]: {}\n",
                self.timestamp,
                self.level.as_str(),
                self.thread,
                component,
                self.message
            ),
            None => format!(
                "[{}] {} ({}): {}\n",
                self.timestamp,
                self.level.as_str(),
                self.thread,
                self.message
            ),
        }
    }
}
