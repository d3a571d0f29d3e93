//! Uniform-quantization reference codec ("I420Q")
//!
//! A lossy intra/inter codec that does all of its work on a dedicated
//! worker thread, so completion callbacks always arrive from a thread other
//! than the caller's. Samples are quantized with a step derived from the QP;
//! key frames carry quantized samples, delta frames carry quantized
//! residuals against the previous reconstruction. The QP travels in the
//! frame header and is reported by both sides.

pub mod bitstream;
pub mod decoder;
pub mod encoder;

pub use decoder::QuantizedDecoder;
pub use encoder::QuantizedEncoder;

use crate::error::{MediaError, Result};
use logging::Logger;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

/// QP used when the settings allow it
pub const DEFAULT_QP: u8 = 24;

/// Pending jobs a worker accepts before calls fail with `ResourceExhausted`
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Quantizer step for `qp`.
pub fn quantizer_step(qp: u8) -> u16 {
    1 + qp as u16 / 4
}

/// Quantizes a sample to an index.
pub(crate) fn quantize_sample(sample: u8, step: u16) -> u8 {
    ((sample as u16 + step / 2) / step) as u8
}

pub(crate) fn dequantize_sample(index: u8, step: u16) -> u8 {
    (index as u16 * step).min(255) as u8
}

/// Quantizes a signed residual, rounding half away from zero.
pub(crate) fn quantize_residual(residual: i16, step: u16) -> i16 {
    let step = step as i16;
    let magnitude = (residual.abs() + step / 2) / step;
    magnitude * residual.signum()
}

pub(crate) fn reconstruct(reference: u8, level: i16, step: u16) -> u8 {
    (reference as i32 + level as i32 * step as i32).clamp(0, 255) as u8
}

/// Bounded job queue served by one named thread.
pub(crate) struct Worker<J: Send + 'static> {
    sender: Option<SyncSender<J>>,
    handle: Option<JoinHandle<()>>,
    name: String,
    logger: Logger,
}

impl<J: Send + 'static> Worker<J> {
    pub(crate) fn spawn<F>(name: &str, capacity: usize, logger: Logger, handler: F) -> Result<Self>
    where
        F: FnMut(J) + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(receiver, handler))?;

        logger.debug(&format!("{} thread started", name));

        Ok(Worker {
            sender: Some(sender),
            handle: Some(handle),
            name: name.to_string(),
            logger,
        })
    }

    /// Queues a job without blocking.
    pub(crate) fn submit(&self, job: J) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(MediaError::Uninitialized("worker stopped"))?;

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(MediaError::ResourceExhausted(format!(
                "{} queue is full",
                self.name
            ))),
            Err(TrySendError::Disconnected(_)) => {
                Err(MediaError::Codec(format!("{} thread exited", self.name)))
            }
        }
    }

    /// Queues a job, waiting for queue space if necessary.
    pub(crate) fn submit_blocking(&self, job: J) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(MediaError::Uninitialized("worker stopped"))?;
        sender
            .send(job)
            .map_err(|_| MediaError::Codec(format!("{} thread exited", self.name)))
    }

    /// Closes the queue and waits for queued jobs to drain.
    pub(crate) fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                self.logger
                    .error(&format!("{} thread panicked", self.name));
            } else {
                self.logger.debug(&format!("{} thread stopped", self.name));
            }
        }
    }
}

impl<J: Send + 'static> Drop for Worker<J> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<J, F: FnMut(J)>(receiver: Receiver<J>, mut handler: F) {
    while let Ok(job) = receiver.recv() {
        handler(job);
    }
}
