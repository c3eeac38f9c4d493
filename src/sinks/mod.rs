//! Log sinks
//!
//! A [`Logger`](crate::Logger) fans every line out to an ordered list of
//! sinks. The set is closed: console, HTTP, or no-op.

pub mod console;
pub mod http;

pub use console::ConsoleSink;
pub use http::HttpLogSink;

use crate::core::{LogLevel, OverflowPolicy, QueueStats, Result};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Accepts a timestamped line, can be drained and can be closed
pub enum Sink {
    Console(ConsoleSink),
    Http(HttpLogSink),
    Noop,
}

impl Sink {
    pub fn log(&self, timestamp: DateTime<Utc>, level: LogLevel, message: &str) {
        match self {
            Sink::Console(sink) => sink.log(timestamp, level, message),
            Sink::Http(sink) => sink.log(timestamp, level, message),
            Sink::Noop => {}
        }
    }

    /// Drain pending lines, waiting until `deadline` at most
    pub(crate) fn shutdown_by(&self, deadline: Instant, timeout: Duration) -> Result<()> {
        match self {
            Sink::Console(sink) => sink.flush(),
            Sink::Http(sink) => sink.shutdown_by(deadline, timeout),
            Sink::Noop => Ok(()),
        }
    }

    pub fn close(&self) -> Result<()> {
        match self {
            Sink::Console(sink) => sink.flush(),
            Sink::Http(sink) => sink.close(),
            Sink::Noop => Ok(()),
        }
    }

    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        if let Sink::Http(sink) = self {
            sink.set_overflow_policy(policy);
        }
    }

    /// Counters of the sink's queue, if it has one
    pub fn stats(&self) -> Option<&QueueStats> {
        match self {
            Sink::Http(sink) => Some(sink.stats()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Sink::Console(_) => "console",
            Sink::Http(_) => "http",
            Sink::Noop => "noop",
        }
    }
}

impl From<ConsoleSink> for Sink {
    fn from(sink: ConsoleSink) -> Self {
        Sink::Console(sink)
    }
}

impl From<HttpLogSink> for Sink {
    fn from(sink: HttpLogSink) -> Self {
        Sink::Http(sink)
    }
}
