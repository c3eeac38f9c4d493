//! Transport capability consumed by the async queues
//!
//! A transport performs one blocking call per payload, retrying internally,
//! and reports success or a terminal error. Queuing and buffering belong to
//! the caller.

pub mod http;

pub use http::{HttpTransport, RetryPolicy};

use crate::core::Result;
use std::fmt;

/// Endpoint receiving log entries
pub const LOGS_ENDPOINT: &str = "/logs";

/// Endpoint receiving metric updates
pub const METRICS_ENDPOINT: &str = "/metrics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// Blocking call/response boundary to the collector
///
/// # Example
///
/// ```
/// use logdash::transport::{HttpMethod, Transport};
/// use logdash::Result;
///
/// struct StdoutTransport;
///
/// impl Transport for StdoutTransport {
///     fn send_data(
///         &self,
///         endpoint: &str,
///         method: HttpMethod,
///         payload: &serde_json::Value,
///     ) -> Result<()> {
///         println!("{} {} {}", method, endpoint, payload);
///         Ok(())
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Deliver one payload, returning only after success or a terminal error
    fn send_data(&self, endpoint: &str, method: HttpMethod, payload: &serde_json::Value)
        -> Result<()>;
}
