//! Metric updates and their coalescing rule

use super::timestamp::serialize_rfc3339_nanos;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// How a metric update applies to the value held by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricOperation {
    /// Overwrite with an absolute value
    #[serde(rename = "set")]
    Set,
    /// Add a relative value
    #[serde(rename = "change")]
    Mutate,
}

impl MetricOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricOperation::Set => "set",
            MetricOperation::Mutate => "change",
        }
    }
}

impl fmt::Display for MetricOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of one `PUT /metrics` request.
///
/// The same type carries an accumulated entry: several updates for one name
/// merged with [`MetricEntry::merge`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    #[serde(serialize_with = "serialize_rfc3339_nanos")]
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub value: f64,
    pub operation: MetricOperation,
}

impl MetricEntry {
    pub fn new(name: impl Into<String>, value: f64, operation: MetricOperation) -> Self {
        Self {
            timestamp: Utc::now(),
            name: name.into(),
            value,
            operation,
        }
    }

    pub fn set(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricOperation::Set)
    }

    pub fn mutate(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricOperation::Mutate)
    }

    /// Fold a later update for the same name into this one.
    ///
    /// A `Set` replaces the value and makes the result a `Set`. A `Mutate` adds
    /// to the value and keeps the current operation, so a `Set` earlier in the
    /// window stays a `Set`. The newest timestamp wins.
    pub fn merge(&mut self, next: MetricEntry) {
        debug_assert_eq!(self.name, next.name, "merging entries of different metrics");

        match next.operation {
            MetricOperation::Set => {
                self.value = next.value;
                self.operation = MetricOperation::Set;
            }
            MetricOperation::Mutate => {
                self.value += next.value;
            }
        }
        self.timestamp = next.timestamp;
    }
}
