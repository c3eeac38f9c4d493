//! HTTP transport for the remote collector
//!
//! Sends each payload as one JSON request with the project API key.
//! Responses are classified for retry decisions:
//!
//! - **2xx**: delivered.
//! - **429 (Too Many Requests)** and **5xx**: retried with backoff.
//! - **Other statuses**: permanent failure, no retry.
//! - **Network errors and timeouts**: retried with backoff.

use super::{HttpMethod, Transport};
use crate::core::{HttpConfig, LogdashError, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::thread;
use std::time::Duration;

/// Header carrying the project API key
pub const API_KEY_HEADER: &str = "project-api-key";

/// Exponential backoff bounds for retried requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `min * 2^retry`, capped at `max`
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.min_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min_backoff: config.retry_min,
            max_backoff: config.retry_max,
        }
    }
}

/// Blocking HTTP client with retry
///
/// # Example
///
/// ```no_run
/// use logdash::transport::{HttpMethod, HttpTransport, Transport};
/// use logdash::HttpConfig;
///
/// let transport = HttpTransport::new("https://api.logdash.io", "api-key", &HttpConfig::default())
///     .expect("valid client configuration");
///
/// let payload = serde_json::json!({"name": "users", "value": 1.0, "operation": "change"});
/// transport.send_data("/metrics", HttpMethod::Put, &payload).ok();
/// ```
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport for `host`
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built
    pub fn new(host: &str, api_key: impl Into<String>, config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LogdashError::config("HttpTransport", e.to_string()))?;

        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::from(config),
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

impl Transport for HttpTransport {
    fn send_data(
        &self,
        endpoint: &str,
        method: HttpMethod,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let response = self
                .client
                .request(method.into(), &url)
                .header(API_KEY_HEADER, &self.api_key)
                .json(payload)
                .send();

            let err = match response {
                Ok(response) => {
                    let status = response.status();
                    // Read the body so the connection can be reused
                    let _ = response.bytes();

                    if status.is_success() {
                        return Ok(());
                    }

                    let err = LogdashError::HttpStatus {
                        endpoint: endpoint.to_string(),
                        status: status.as_u16(),
                        attempts,
                    };
                    if !Self::is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(source) => LogdashError::Transport {
                    endpoint: endpoint.to_string(),
                    attempts,
                    source,
                },
            };

            if attempts > self.retry.max_retries {
                return Err(err);
            }
            thread::sleep(self.retry.backoff(attempts - 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(min_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            min_backoff: Duration::from_millis(min_ms),
            max_backoff: Duration::from_millis(max_ms),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = policy(10, 10_000);
        assert_eq!(retry.backoff(0), Duration::from_millis(10));
        assert_eq!(retry.backoff(1), Duration::from_millis(20));
        assert_eq!(retry.backoff(3), Duration::from_millis(80));
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = policy(1_000, 30_000);
        assert_eq!(retry.backoff(5), Duration::from_secs(30));
        assert_eq!(retry.backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(HttpTransport::is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(HttpTransport::is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!HttpTransport::is_retryable(StatusCode::BAD_REQUEST));
        assert!(!HttpTransport::is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let transport =
            HttpTransport::new("http://localhost:8080/", "key", &HttpConfig::default()).unwrap();
        assert_eq!(transport.base_url, "http://localhost:8080");
    }
}
