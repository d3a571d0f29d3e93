//! Log file writer running on its own thread.

use crate::error::Result;
use crate::log_message::LogMessage;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Appends formatted messages to a log file.
pub(crate) struct LogWriter {
    file: File,
}

impl LogWriter {
    /// Opens (or creates) the file in append mode.
    pub fn open(log_path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        Ok(Self { file })
    }

    fn write_message(&mut self, message: &LogMessage) {
        if let Err(e) = self
            .file
            .write_all(message.format().as_bytes())
            .and_then(|_| self.file.flush())
        {
            eprintln!("Error writing log: {}", e);
        }
    }

    /// Drains the channel until every sender is dropped.
    fn run(mut self, receiver: Receiver<LogMessage>) {
        for message in receiver {
            self.write_message(&message);
        }
    }
}

/// Opens the file and spawns the writer thread, returning the feeding end.
pub(crate) fn spawn_file_writer(log_path: &Path) -> Result<Sender<LogMessage>> {
    let writer = LogWriter::open(log_path)?;
    let (sender, receiver) = channel();
    std::thread::Builder::new()
        .name("log-writer".to_string())
        .spawn(move || writer.run(receiver))?;
    Ok(sender)
}
