//! Error types for the telemetry pipeline

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LogdashError>;

#[derive(Debug, thiserror::Error)]
pub enum LogdashError {
    /// Queue full under the drop policy; the entry was discarded
    #[error("Queue overflow: entry dropped")]
    Overflow,

    /// Send, close or shutdown observed after a prior close transition
    #[error("Already closed or shutting down")]
    AlreadyClosed,

    /// Graceful shutdown did not finish draining in time
    #[error("Shutdown deadline of {timeout:?} exceeded before the queue drained")]
    DeadlineExceeded { timeout: Duration },

    /// Collector answered with a non-success status
    #[error("Server returned error status {status} for {endpoint} after {attempts} attempt(s)")]
    HttpStatus {
        endpoint: String,
        status: u16,
        attempts: u32,
    },

    /// Network failure with retries exhausted
    #[error("Failed to send to {endpoint} after {attempts} attempt(s): {source}")]
    Transport {
        endpoint: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Several sinks failed at once
    #[error("{}", join_messages(.0))]
    Multiple(Vec<LogdashError>),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn join_messages(errors: &[LogdashError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl LogdashError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LogdashError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn deadline_exceeded(timeout: Duration) -> Self {
        LogdashError::DeadlineExceeded { timeout }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LogdashError::Other(msg.into())
    }

    /// Combine errors collected from several sinks
    ///
    /// Returns `Ok(())` when nothing failed, the error itself when exactly one
    /// failed, and [`LogdashError::Multiple`] otherwise.
    pub fn join(mut errors: Vec<LogdashError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(LogdashError::Multiple(errors)),
        }
    }

    /// Whether this error means the entry was lost to a full queue
    pub fn is_overflow(&self) -> bool {
        matches!(self, LogdashError::Overflow)
    }

    pub fn is_already_closed(&self) -> bool {
        matches!(self, LogdashError::AlreadyClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LogdashError::config("HttpConfig", "retry_min exceeds retry_max");
        assert!(matches!(err, LogdashError::InvalidConfiguration { .. }));

        let err = LogdashError::deadline_exceeded(Duration::from_millis(10));
        assert!(matches!(err, LogdashError::DeadlineExceeded { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LogdashError::HttpStatus {
            endpoint: "/logs".to_string(),
            status: 503,
            attempts: 4,
        };
        assert_eq!(
            err.to_string(),
            "Server returned error status 503 for /logs after 4 attempt(s)"
        );

        let err = LogdashError::config("LogdashConfig", "buffer_size must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for LogdashConfig: buffer_size must be positive"
        );
    }

    #[test]
    fn test_join() {
        assert!(LogdashError::join(Vec::new()).is_ok());

        let single = LogdashError::join(vec![LogdashError::AlreadyClosed]).unwrap_err();
        assert!(single.is_already_closed());

        let multiple =
            LogdashError::join(vec![LogdashError::AlreadyClosed, LogdashError::Overflow])
                .unwrap_err();
        assert!(matches!(multiple, LogdashError::Multiple(ref errs) if errs.len() == 2));
        assert_eq!(
            multiple.to_string(),
            "Already closed or shutting down\nQueue overflow: entry dropped"
        );
    }
}
