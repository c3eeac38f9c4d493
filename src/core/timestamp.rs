//! Timestamp formatting shared by the wire payloads and the console sink

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::Serializer;

/// Console layout up to whole seconds; seven fractional digits follow
pub const CONSOLE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format as RFC 3339 with nanosecond precision: `2025-01-08T10:30:45.123456789Z`
#[must_use]
pub fn rfc3339_nanos(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Format for the console sink: local time, 100ns precision, no zone suffix
#[must_use]
pub fn console(datetime: &DateTime<Utc>) -> String {
    let local = datetime.with_timezone(&chrono::Local);
    // Leap seconds report nanoseconds past 1e9
    let ticks = local.nanosecond() % 1_000_000_000 / 100;
    format!("{}.{:07}", local.format(CONSOLE_FORMAT), ticks)
}

/// `serialize_with` adapter producing [`rfc3339_nanos`] strings
pub fn serialize_rfc3339_nanos<S>(datetime: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&rfc3339_nanos(datetime))
}
