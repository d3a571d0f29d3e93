//! Single-slot result mailbox between a codec callback and its consumer.
//!
//! A codec delivers each completed encode or decode into a [`ResultSink`]
//! from whatever thread it runs its work on. The consumer takes the result
//! out, optionally blocking for a bounded time. The sink holds at most one
//! pending result; a delivery that finds an unconsumed result replaces it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Slot<T> {
    pending: Option<T>,
    delivered: u64,
    overwritten: u64,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// Thread-safe single-slot mailbox (last write wins).
///
/// Clones share the same slot: hand one clone to the codec as its callback
/// target and keep another to read results.
pub struct ResultSink<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ResultSink<T> {
    fn clone(&self) -> Self {
        ResultSink {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for ResultSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultSink<T> {
    pub fn new() -> Self {
        ResultSink {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    pending: None,
                    delivered: 0,
                    overwritten: 0,
                }),
                ready: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // A panicking producer cannot leave the slot half-written: every
        // mutation is a single assignment.
        self.shared
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `item` and wakes a waiting consumer.
    ///
    /// Returns `true` if an unconsumed result was overwritten.
    pub fn deliver(&self, item: T) -> bool {
        let replaced = {
            let mut slot = self.lock();
            let replaced = slot.pending.replace(item).is_some();
            slot.delivered += 1;
            if replaced {
                slot.overwritten += 1;
            }
            replaced
        };
        self.shared.ready.notify_all();
        replaced
    }

    /// Removes the pending result without blocking.
    pub fn take(&self) -> Option<T> {
        self.lock().pending.take()
    }

    /// Removes the pending result, waiting at most `timeout` for one to arrive.
    ///
    /// Returns `None` once the deadline passes with the slot still empty.
    pub fn wait_take(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();

        loop {
            if let Some(item) = slot.pending.take() {
                return Some(item);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            slot = match self.shared.ready.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Returns true if a result is waiting to be taken.
    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Number of deliveries since creation.
    pub fn delivered_count(&self) -> u64 {
        self.lock().delivered
    }

    /// Number of deliveries that replaced an unconsumed result.
    pub fn overwritten_count(&self) -> u64 {
        self.lock().overwritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_take_empty_sink() {
        let sink: ResultSink<u32> = ResultSink::new();
        assert_eq!(sink.take(), None);
        assert!(!sink.has_pending());
    }

    #[test]
    fn test_deliver_then_take_consumes_once() {
        let sink = ResultSink::new();
        assert!(!sink.deliver(7));

        assert!(sink.has_pending());
        assert_eq!(sink.take(), Some(7));
        assert_eq!(sink.take(), None);
        assert_eq!(sink.delivered_count(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let sink = ResultSink::new();
        sink.deliver("first");
        assert!(sink.deliver("second"));

        assert_eq!(sink.take(), Some("second"));
        assert_eq!(sink.overwritten_count(), 1);
        assert_eq!(sink.delivered_count(), 2);
    }

    #[test]
    fn test_wait_take_times_out() {
        let sink: ResultSink<u8> = ResultSink::new();
        let started = Instant::now();

        assert_eq!(sink.wait_take(Duration::from_millis(30)), None);

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_wait_take_returns_pending_immediately() {
        let sink = ResultSink::new();
        sink.deliver(1);
        assert_eq!(sink.wait_take(Duration::ZERO), Some(1));
    }

    #[test]
    fn test_wait_take_wakes_on_delivery_from_other_thread() {
        let sink = ResultSink::new();
        let producer = sink.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.deliver(42u32);
        });

        assert_eq!(sink.wait_take(Duration::from_secs(5)), Some(42));
        handle.join().unwrap();
    }

    #[test]
    fn test_concurrent_deliveries_are_never_duplicated() {
        let sink = ResultSink::new();
        let producer = sink.clone();

        let handle = thread::spawn(move || {
            for i in 0..1000u32 {
                producer.deliver(i);
            }
        });

        let mut received = Vec::new();
        while received.last() != Some(&999) {
            if let Some(item) = sink.wait_take(Duration::from_secs(5)) {
                received.push(item);
            } else {
                break;
            }
        }
        handle.join().unwrap();

        assert_eq!(received.last(), Some(&999));
        assert!(received.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            received.len() as u64 + sink.overwritten_count(),
            sink.delivered_count()
        );
    }
}
