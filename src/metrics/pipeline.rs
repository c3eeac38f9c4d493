//! Metrics delivery pipeline
//!
//! ```text
//! send -> input queue (unbounded) -> dispatcher -> accumulator per name
//!      -> sender queue (bounded) -> transport
//! ```
//!
//! Updates pass straight through while the sender queue has room. Once it is
//! full the accumulators start coalescing, one pending entry per name, until
//! room frees up.

use super::dispatcher::Dispatcher;
use crate::core::{AsyncQueue, ErrorHandler, MetricEntry, Result};
use crate::transport::{HttpMethod, Transport, METRICS_ENDPOINT};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct MetricsPipeline {
    input: AsyncQueue<MetricEntry>,
    sender: AsyncQueue<MetricEntry>,
}

impl MetricsPipeline {
    /// Start the pipeline with room for `capacity` updates awaiting delivery
    ///
    /// # Errors
    ///
    /// [`crate::LogdashError::IoError`] if a worker thread cannot be spawned.
    pub fn new(
        transport: Arc<dyn Transport>,
        capacity: usize,
        on_error: ErrorHandler,
    ) -> Result<Self> {
        let (sender, producer) = AsyncQueue::with_producer(
            capacity,
            move |entry: MetricEntry| {
                let payload = serde_json::to_value(&entry)?;
                transport.send_data(METRICS_ENDPOINT, HttpMethod::Put, &payload)
            },
            Arc::clone(&on_error),
        )?;

        let mut dispatcher = Dispatcher::new(producer, sender.stop_signal());
        let input = AsyncQueue::unbounded(
            move |entry: MetricEntry| dispatcher.dispatch(entry),
            on_error,
        )?;

        Ok(Self { input, sender })
    }

    /// Accept an update; never blocks
    ///
    /// # Errors
    ///
    /// [`crate::LogdashError::AlreadyClosed`] after close or shutdown
    pub fn send(&self, entry: MetricEntry) -> Result<()> {
        self.input.send(entry)
    }

    /// Deliver every accepted update, then stop
    ///
    /// The input side drains first: once every accumulator has handed over
    /// its last value, the sender drains and stops. Both stages share one
    /// deadline.
    ///
    /// # Errors
    ///
    /// - [`crate::LogdashError::AlreadyClosed`] if already closed or shut down.
    /// - [`crate::LogdashError::DeadlineExceeded`] if draining took too long.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.shutdown_by(Instant::now() + timeout, timeout)
    }

    pub(crate) fn shutdown_by(&self, deadline: Instant, timeout: Duration) -> Result<()> {
        self.input.shutdown_by(deadline, timeout)?;
        self.sender.shutdown_by(deadline, timeout)
    }

    /// Stop both stages at once, discarding pending updates
    ///
    /// # Errors
    ///
    /// [`crate::LogdashError::AlreadyClosed`] if already closed or fully shut down.
    pub fn close(&self) -> Result<()> {
        let result = self.input.close();
        // Also abandons a sender left draining by a timed-out shutdown
        let _ = self.sender.close();
        result
    }
}
