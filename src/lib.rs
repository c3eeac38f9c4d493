//! # Logdash
//!
//! Client SDK shipping logs and metrics to a remote collector over HTTP.
//!
//! ## Features
//!
//! - **Non-blocking**: log lines go through a bounded queue with a
//!   configurable overflow policy (drop or block)
//! - **Coalescing Metrics**: bursts of updates to one metric are merged while
//!   a request is in flight, preserving the net effect
//! - **Explicit Shutdown**: drain with a deadline, or stop at once
//! - **Console Output**: colored lines on stdout, with or without a collector

pub mod core;
pub mod logdash;
pub mod macros;
pub mod metrics;
pub mod sinks;
pub mod transport;

pub mod prelude {
    pub use crate::core::{
        ErrorHandler, HttpConfig, LogLevel, LogdashConfig, LogdashError, Logger, OverflowPolicy,
        QueueStats, Result, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::logdash::{Logdash, LogdashBuilder};
    pub use crate::metrics::Metrics;
    pub use crate::transport::{HttpMethod, Transport};
}

pub use crate::core::{
    AsyncQueue, ErrorHandler, HttpConfig, LogEntry, LogLevel, LogdashConfig, LogdashError, Logger,
    MetricEntry, MetricOperation, OverflowPolicy, QueueStats, Result, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::logdash::{Logdash, LogdashBuilder};
pub use crate::metrics::Metrics;
pub use crate::transport::{HttpMethod, HttpTransport, Transport};
