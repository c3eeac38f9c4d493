//! Metrics facade
//!
//! Updates go through a coalescing pipeline when a collector is configured,
//! and nowhere otherwise. Either way each operation is echoed to the internal
//! logger at verbose level.

mod accumulator;
mod dispatcher;
pub mod pipeline;

pub use pipeline::MetricsPipeline;

use crate::core::{ErrorHandler, LogdashError, Logger, MetricEntry, Result};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::{Duration, Instant};

enum Backend {
    Http(MetricsPipeline),
    Noop,
}

pub struct Metrics {
    backend: Backend,
    internal: Arc<Logger>,
}

impl Metrics {
    /// Metrics delivered through `transport`, with room for `buffer_size`
    /// updates awaiting delivery before coalescing starts
    ///
    /// Delivery failures are reported to `internal` and then to `on_error`,
    /// if given.
    ///
    /// # Errors
    ///
    /// [`LogdashError::IoError`] if a worker thread cannot be spawned.
    pub fn http(
        transport: Arc<dyn Transport>,
        buffer_size: usize,
        internal: Arc<Logger>,
        on_error: Option<ErrorHandler>,
    ) -> Result<Self> {
        let reporter = Arc::clone(&internal);
        let handler: ErrorHandler = Arc::new(move |err: &LogdashError| {
            reporter.error(format!("Failed to send metric: {}", err));
            if let Some(on_error) = &on_error {
                on_error(err);
            }
        });

        Ok(Self {
            backend: Backend::Http(MetricsPipeline::new(transport, buffer_size, handler)?),
            internal,
        })
    }

    /// Metrics that are only echoed to the internal logger
    pub fn noop(internal: Arc<Logger>) -> Self {
        Self {
            backend: Backend::Noop,
            internal,
        }
    }

    /// Set a metric to an absolute value
    pub fn set(&self, name: impl Into<String>, value: f64) {
        let name = name.into();
        self.internal
            .verbose(format!("Setting metric {} to {}", name, value));
        self.submit(MetricEntry::set(name, value));
    }

    /// Change a metric by a relative value
    pub fn mutate(&self, name: impl Into<String>, value: f64) {
        let name = name.into();
        self.internal
            .verbose(format!("Mutating metric {} by {}", name, value));
        self.submit(MetricEntry::mutate(name, value));
    }

    fn submit(&self, entry: MetricEntry) {
        if let Backend::Http(pipeline) = &self.backend {
            if let Err(err) = pipeline.send(entry) {
                self.internal.verbose(format!("Metric not sent: {}", err));
            }
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.backend, Backend::Noop)
    }

    /// Deliver every accepted update, waiting up to `timeout`
    ///
    /// # Errors
    ///
    /// See [`MetricsPipeline::shutdown`]
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.shutdown_by(Instant::now() + timeout, timeout)
    }

    pub(crate) fn shutdown_by(&self, deadline: Instant, timeout: Duration) -> Result<()> {
        match &self.backend {
            Backend::Http(pipeline) => pipeline.shutdown_by(deadline, timeout),
            Backend::Noop => Ok(()),
        }
    }

    /// Stop at once, discarding pending updates
    ///
    /// # Errors
    ///
    /// See [`MetricsPipeline::close`]
    pub fn close(&self) -> Result<()> {
        match &self.backend {
            Backend::Http(pipeline) => pipeline.close(),
            Backend::Noop => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics() {
        let metrics = Metrics::noop(Arc::new(Logger::noop()));
        assert!(metrics.is_noop());

        metrics.set("users", 1.0);
        metrics.mutate("users", -1.0);
        assert!(metrics.shutdown(Duration::from_millis(10)).is_ok());
        assert!(metrics.close().is_ok());
    }
}
