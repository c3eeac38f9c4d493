//! Core types: entries, levels, errors, the async queue and the logger

pub mod async_queue;
pub mod config;
pub mod error;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metric_entry;
pub mod overflow_policy;
pub mod queue_stats;
pub mod timestamp;

pub use async_queue::AsyncQueue;
pub use config::{HttpConfig, LogdashConfig};
pub use error::{LogdashError, Result};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metric_entry::{MetricEntry, MetricOperation};
pub use overflow_policy::{ErrorHandler, OverflowPolicy};
pub use queue_stats::QueueStats;
