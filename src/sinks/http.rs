//! Sink shipping log lines to the collector through the async queue

use crate::core::{
    AsyncQueue, ErrorHandler, LogEntry, LogLevel, LogdashError, Logger, OverflowPolicy,
    QueueStats, Result,
};
use crate::transport::{HttpMethod, Transport, LOGS_ENDPOINT};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sequence numbers wrap at 2^32
const SEQUENCE_MODULUS: u64 = 1 << 32;

pub struct HttpLogSink {
    queue: AsyncQueue<LogEntry>,
    /// Last assigned sequence number. Held across the enqueue so entries
    /// reach the queue in numbering order.
    sequence: Mutex<u64>,
    internal: Arc<Logger>,
}

impl HttpLogSink {
    /// Start the background sender
    ///
    /// Overflow and delivery failures are reported to `internal` and then to
    /// `on_error`, if given.
    pub fn new(
        transport: Arc<dyn Transport>,
        buffer_size: usize,
        policy: OverflowPolicy,
        internal: Arc<Logger>,
        on_error: Option<ErrorHandler>,
    ) -> Result<Self> {
        let reporter = Arc::clone(&internal);
        let handler: ErrorHandler = Arc::new(move |err: &LogdashError| {
            if err.is_overflow() {
                reporter.error("Log dropped due to channel overflow");
            } else {
                reporter.error(format!("Failed to send log: {}", err));
            }
            if let Some(on_error) = &on_error {
                on_error(err);
            }
        });

        let queue = AsyncQueue::bounded(
            buffer_size,
            policy,
            move |entry: LogEntry| {
                let payload = serde_json::to_value(&entry)?;
                transport.send_data(LOGS_ENDPOINT, HttpMethod::Post, &payload)
            },
            handler,
        )?;

        Ok(Self {
            queue,
            sequence: Mutex::new(0),
            internal,
        })
    }

    pub fn log(&self, timestamp: DateTime<Utc>, level: LogLevel, message: &str) {
        let result = {
            let mut sequence = self.sequence.lock();
            *sequence = next_sequence(*sequence);
            self.queue.send(LogEntry::new(timestamp, level, message, *sequence))
        };
        if let Err(err) = result {
            self.internal.verbose(format!("Log not sent: {}", err));
        }
    }

    pub(crate) fn shutdown_by(&self, deadline: Instant, timeout: Duration) -> Result<()> {
        self.queue.shutdown_by(deadline, timeout)
    }

    pub fn close(&self) -> Result<()> {
        self.queue.close()
    }

    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        self.queue.set_overflow_policy(policy);
    }

    pub fn stats(&self) -> &QueueStats {
        self.queue.stats()
    }
}

fn next_sequence(current: u64) -> u64 {
    (current + 1) % SEQUENCE_MODULUS
}
