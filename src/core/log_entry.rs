//! Log entry as shipped to the collector

use super::log_level::LogLevel;
use super::timestamp::serialize_rfc3339_nanos;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of one `POST /logs` request.
///
/// Built once per call and consumed exactly once by the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(serialize_with = "serialize_rfc3339_nanos")]
    pub created_at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub sequence_number: u64,
}

impl LogEntry {
    pub fn new(
        created_at: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        sequence_number: u64,
    ) -> Self {
        Self {
            created_at,
            level,
            message: message.into(),
            sequence_number,
        }
    }
}
