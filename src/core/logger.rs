//! Logger fanning each line out to its sinks

use super::{
    error::{LogdashError, Result},
    log_level::LogLevel,
    overflow_policy::OverflowPolicy,
    queue_stats::QueueStats,
};
use crate::sinks::{ConsoleSink, Sink};
use chrono::{DateTime, Utc};
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for cleanup (5 seconds)
///
/// This timeout is used when [`crate::Logdash`] is dropped without an explicit
/// shutdown. For custom timeout control, use the `shutdown()` method instead.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes every line to each of its sinks, in order
///
/// # Example
///
/// ```
/// use logdash::Logger;
///
/// let logger = Logger::console();
/// logger.info("Server started");
/// logger.warn(format!("Retry attempt {} of {}", 1, 3));
/// ```
pub struct Logger {
    sinks: Vec<Sink>,
}

impl Logger {
    #[must_use]
    pub fn new(sinks: Vec<Sink>) -> Self {
        Self { sinks }
    }

    /// Logger writing to stdout only
    #[must_use]
    pub fn console() -> Self {
        Self::new(vec![Sink::Console(ConsoleSink::new())])
    }

    /// Logger discarding everything
    #[must_use]
    pub fn noop() -> Self {
        Self::new(vec![Sink::Noop])
    }

    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    /// Log at an explicit level; [`Logger::info`] is the plain shortcut
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_at(Utc::now(), level, &message.into());
    }

    /// Log prebuilt attribute strings, joined by a single space
    ///
    /// Entry point for adapters that render their own records.
    pub fn log_with_attrs(&self, timestamp: DateTime<Utc>, level: LogLevel, attrs: &[String]) {
        self.log_at(timestamp, level, &attrs.join(" "));
    }

    fn log_at(&self, timestamp: DateTime<Utc>, level: LogLevel, message: &str) {
        for sink in &self.sinks {
            sink.log(timestamp, level, message);
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn http(&self, message: impl Into<String>) {
        self.log(LogLevel::Http, message);
    }

    pub fn verbose(&self, message: impl Into<String>) {
        self.log(LogLevel::Verbose, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn silly(&self, message: impl Into<String>) {
        self.log(LogLevel::Silly, message);
    }

    /// Change the overflow policy of every queued sink
    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        for sink in &self.sinks {
            sink.set_overflow_policy(policy);
        }
    }

    /// Counters of the first sink that has a queue
    ///
    /// # Example
    ///
    /// ```
    /// use logdash::Logger;
    ///
    /// // Console output is synchronous, so there is nothing to count
    /// assert!(Logger::console().queue_stats().is_none());
    /// ```
    pub fn queue_stats(&self) -> Option<&QueueStats> {
        self.sinks.iter().find_map(Sink::stats)
    }

    /// Drain every sink in parallel, waiting up to `timeout`
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a sink, typically
    /// [`LogdashError::DeadlineExceeded`]. Sinks that missed the deadline keep
    /// draining in the background.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.shutdown_by(Instant::now() + timeout, timeout)
    }

    pub(crate) fn shutdown_by(&self, deadline: Instant, timeout: Duration) -> Result<()> {
        let results: Vec<Result<()>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .sinks
                .iter()
                .map(|sink| scope.spawn(move || sink.shutdown_by(deadline, timeout)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(LogdashError::other("sink shutdown panicked")))
                })
                .collect()
        });

        results.into_iter().collect()
    }

    /// Stop every sink at once, discarding lines not yet sent
    ///
    /// # Errors
    ///
    /// Returns the errors of all failing sinks combined with
    /// [`LogdashError::join`].
    pub fn close(&self) -> Result<()> {
        let errors = self
            .sinks
            .iter()
            .filter_map(|sink| sink.close().err())
            .collect();
        LogdashError::join(errors)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::console()
    }
}
