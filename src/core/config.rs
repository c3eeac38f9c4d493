//! SDK configuration
//!
//! Every value has a default, so a config can be deserialized from a partial
//! document. Durations are given in milliseconds.

use super::{
    error::{LogdashError, Result},
    overflow_policy::OverflowPolicy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "https://api.logdash.io";
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Top-level settings for [`crate::Logdash`]
///
/// # Example
///
/// ```
/// use logdash::{LogdashConfig, OverflowPolicy};
///
/// let config: LogdashConfig = serde_json::from_str(
///     r#"{"api_key": "secret", "buffer_size": 512, "overflow_policy": "block"}"#,
/// ).unwrap();
///
/// assert_eq!(config.host, "https://api.logdash.io");
/// assert_eq!(config.overflow_policy, OverflowPolicy::Block);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogdashConfig {
    /// Base URL of the collector
    pub host: String,
    /// Without a key the SDK logs to the console only
    pub api_key: Option<String>,
    /// Print the SDK's own diagnostics to the console
    pub verbose: bool,
    /// Capacity of the log queue
    pub buffer_size: usize,
    pub overflow_policy: OverflowPolicy,
    pub http: HttpConfig,
}

impl Default for LogdashConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: None,
            verbose: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            overflow_policy: OverflowPolicy::default(),
            http: HttpConfig::default(),
        }
    }
}

impl LogdashConfig {
    /// An API key that is present and not blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// Check the configuration before any worker is started
    ///
    /// # Errors
    ///
    /// Returns [`LogdashError::InvalidConfiguration`] naming the bad field
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(LogdashError::config(
                "LogdashConfig",
                "buffer_size must be positive",
            ));
        }

        match reqwest::Url::parse(&self.host) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(LogdashError::config(
                    "LogdashConfig",
                    format!("unsupported scheme '{}' in host", url.scheme()),
                ))
            }
            Err(e) => {
                return Err(LogdashError::config(
                    "LogdashConfig",
                    format!("invalid host '{}': {}", self.host, e),
                ))
            }
        }

        self.http.validate()
    }
}

/// Transport timeout and retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    #[serde(rename = "retry_min_ms", with = "millis")]
    pub retry_min: Duration,
    #[serde(rename = "retry_max_ms", with = "millis")]
    pub retry_max: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_min: Duration::from_secs(1),
            retry_max: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(LogdashError::config("HttpConfig", "timeout must be positive"));
        }
        if self.retry_min > self.retry_max {
            return Err(LogdashError::config(
                "HttpConfig",
                format!(
                    "retry_min ({:?}) exceeds retry_max ({:?})",
                    self.retry_min, self.retry_max
                ),
            ));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogdashConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.buffer_size, 128);
        assert_eq!(config.overflow_policy, OverflowPolicy::Drop);
        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert_eq!(config.http.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = LogdashConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let config = LogdashConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LogdashError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_bad_host_rejected() {
        for host in ["not a url", "ftp://example.com"] {
            let config = LogdashConfig {
                host: host.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} should be rejected", host);
        }
    }

    #[test]
    fn test_retry_bounds_checked() {
        let http = HttpConfig {
            retry_min: Duration::from_secs(10),
            retry_max: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(http.validate().is_err());

        let http = HttpConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(http.validate().is_err());
    }

    #[test]
    fn test_deserialize_durations_in_millis() {
        let http: HttpConfig =
            serde_json::from_str(r#"{"timeout_ms": 250, "retry_min_ms": 10}"#).unwrap();
        assert_eq!(http.timeout, Duration::from_millis(250));
        assert_eq!(http.retry_min, Duration::from_millis(10));
        assert_eq!(http.retry_max, Duration::from_secs(30));
    }
}
