//! Bounded waits on codec completion callbacks.
//!
//! The [`Synchronizer`] owns the two result sinks a codec pair delivers
//! into. Producer handles go to the codecs; the harness blocks on the
//! consumer side for at most the configured timeout.

use logging::Logger;
use media::{DecodedFrame, EncodeResult, ResultSink};
use std::time::{Duration, Instant};

/// Result of a bounded wait
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<T> {
    /// The result arrived and has been consumed
    Ready(T),
    /// Nothing arrived before the deadline
    TimedOut { waited: Duration },
}

impl<T> WaitOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready(_))
    }

    /// Converts into an `Option`, dropping the timeout detail.
    pub fn ready(self) -> Option<T> {
        match self {
            WaitOutcome::Ready(item) => Some(item),
            WaitOutcome::TimedOut { .. } => None,
        }
    }
}

/// Rendezvous between the harness and a codec pair's callbacks
pub struct Synchronizer {
    encoded: ResultSink<EncodeResult>,
    decoded: ResultSink<DecodedFrame>,
    encoded_waits: u64,
    decoded_waits: u64,
    logger: Logger,
}

impl Synchronizer {
    pub fn new(logger: Logger) -> Self {
        Synchronizer {
            encoded: ResultSink::new(),
            decoded: ResultSink::new(),
            encoded_waits: 0,
            decoded_waits: 0,
            logger,
        }
    }

    /// Producer handle for the encoder's completion callback.
    pub fn encoded_sink(&self) -> ResultSink<EncodeResult> {
        self.encoded.clone()
    }

    /// Producer handle for the decoder's completion callback.
    pub fn decoded_sink(&self) -> ResultSink<DecodedFrame> {
        self.decoded.clone()
    }

    /// Blocks until an encoded frame is delivered or `timeout` elapses.
    pub fn wait_for_encoded_frame(&mut self, timeout: Duration) -> WaitOutcome<EncodeResult> {
        self.encoded_waits += 1;
        wait_on(&self.encoded, timeout, "encoded frame", &self.logger)
    }

    /// Blocks until a decoded frame is delivered or `timeout` elapses.
    pub fn wait_for_decoded_frame(&mut self, timeout: Duration) -> WaitOutcome<DecodedFrame> {
        self.decoded_waits += 1;
        wait_on(&self.decoded, timeout, "decoded frame", &self.logger)
    }

    /// Number of encoded-frame waits issued so far.
    pub fn encoded_waits(&self) -> u64 {
        self.encoded_waits
    }

    /// Number of decoded-frame waits issued so far.
    pub fn decoded_waits(&self) -> u64 {
        self.decoded_waits
    }

    /// Drops any undelivered results left over from an earlier round trip.
    pub fn clear(&self) {
        if self.encoded.take().is_some() {
            self.logger.debug("Discarded stale encoded frame");
        }
        if self.decoded.take().is_some() {
            self.logger.debug("Discarded stale decoded frame");
        }
    }
}

fn wait_on<T>(
    sink: &ResultSink<T>,
    timeout: Duration,
    what: &str,
    logger: &Logger,
) -> WaitOutcome<T> {
    let started = Instant::now();
    match sink.wait_take(timeout) {
        Some(item) => {
            logger.debug(&format!(
                "Received {} after {} us",
                what,
                started.elapsed().as_micros()
            ));
            WaitOutcome::Ready(item)
        }
        None => {
            let waited = started.elapsed();
            logger.warn(&format!(
                "Timed out waiting for {} after {} ms",
                what,
                waited.as_millis()
            ));
            WaitOutcome::TimedOut { waited }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::LogLevel;
    use media::{
        CodecSpecificInfo, EncodedFrame, FrameType, VideoCodecType, VideoFrame,
    };
    use std::thread;

    fn encode_result(timestamp: u32) -> EncodeResult {
        EncodeResult {
            frame: EncodedFrame::new(vec![1, 2, 3], FrameType::Key).with_timestamp(timestamp),
            codec_specific_info: CodecSpecificInfo::generic(VideoCodecType::Generic),
        }
    }

    #[test]
    fn test_wait_times_out_within_bound() {
        let mut sync = Synchronizer::new(Logger::disabled());
        let timeout = Duration::from_millis(40);

        match sync.wait_for_encoded_frame(timeout) {
            WaitOutcome::TimedOut { waited } => {
                assert!(waited >= timeout);
                assert!(waited < Duration::from_secs(2));
            }
            WaitOutcome::Ready(_) => panic!("Expected timeout"),
        }
        assert_eq!(sync.encoded_waits(), 1);
        assert_eq!(sync.decoded_waits(), 0);
    }

    #[test]
    fn test_result_consumed_exactly_once() {
        let mut sync = Synchronizer::new(Logger::disabled());
        sync.encoded_sink().deliver(encode_result(90));

        let first = sync.wait_for_encoded_frame(Duration::from_millis(10));
        assert_eq!(first.ready().map(|r| r.frame.timestamp), Some(90));
        assert!(!sync.wait_for_encoded_frame(Duration::from_millis(10)).is_ready());
    }

    #[test]
    fn test_delivery_from_codec_thread() {
        let mut sync = Synchronizer::new(Logger::disabled());
        let sink = sync.decoded_sink();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            sink.deliver(DecodedFrame::new(VideoFrame::filled(2, 2, 0, 0, 0), Some(20)));
        });

        let outcome = sync.wait_for_decoded_frame(Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(outcome.ready().and_then(|d| d.qp), Some(20));
    }

    #[test]
    fn test_clear_drops_stale_results() {
        let sync = Synchronizer::new(Logger::disabled());
        sync.encoded_sink().deliver(encode_result(0));
        sync.clear();
        assert!(!sync.encoded_sink().has_pending());
    }

    #[test]
    fn test_timeout_is_logged() {
        let (logger, buffer) = Logger::in_memory(LogLevel::Warn);
        let mut sync = Synchronizer::new(logger);
        sync.wait_for_decoded_frame(Duration::from_millis(1));
        assert!(buffer.contains("Timed out waiting for decoded frame"));
    }
}
