//! Entry point owning the logger and the metrics
//!
//! Coordinates the two halves on the way out: `shutdown` drains both in
//! parallel under one deadline, `close` stops both at once.

use crate::core::{
    ErrorHandler, HttpConfig, LogdashConfig, LogdashError, Logger, OverflowPolicy, Result,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
use crate::metrics::Metrics;
use crate::sinks::{ConsoleSink, HttpLogSink, Sink};
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Client for the collector
///
/// Without an API key (and without an injected transport) logs go to the
/// console only and metrics are discarded.
///
/// # Example
///
/// ```no_run
/// use logdash::{Logdash, OverflowPolicy};
/// use std::time::Duration;
///
/// let logdash = Logdash::builder()
///     .api_key("my-project-key")
///     .overflow_policy(OverflowPolicy::Block)
///     .build()?;
///
/// logdash.logger().info("Application started");
/// logdash.metrics().set("active_users", 42.0);
/// logdash.metrics().mutate("requests", 1.0);
///
/// logdash.shutdown(Duration::from_secs(10))?;
/// # Ok::<(), logdash::LogdashError>(())
/// ```
pub struct Logdash {
    logger: Logger,
    metrics: Metrics,
    internal: Arc<Logger>,
}

impl Logdash {
    pub fn builder() -> LogdashBuilder {
        LogdashBuilder::new()
    }

    /// Create a client from a configuration
    ///
    /// # Errors
    ///
    /// Returns [`LogdashError::InvalidConfiguration`] if the configuration is
    /// invalid or the HTTP client cannot be created
    pub fn new(config: LogdashConfig) -> Result<Self> {
        Self::with_parts(config, None, None)
    }

    fn with_parts(
        config: LogdashConfig,
        transport: Option<Arc<dyn Transport>>,
        on_error: Option<ErrorHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let internal = Arc::new(if config.verbose {
            Logger::console()
        } else {
            Logger::noop()
        });

        let transport = match (transport, config.api_key()) {
            (Some(transport), _) => Some(transport),
            (None, Some(api_key)) => Some(
                Arc::new(HttpTransport::new(&config.host, api_key, &config.http)?)
                    as Arc<dyn Transport>,
            ),
            (None, None) => None,
        };

        let (logger, metrics) = match transport {
            Some(transport) => {
                internal.verbose(format!("Creating Logger with host {}", config.host));
                let http = HttpLogSink::new(
                    Arc::clone(&transport),
                    config.buffer_size,
                    config.overflow_policy,
                    Arc::clone(&internal),
                    on_error.clone(),
                )?;
                let logger = Logger::new(vec![Sink::Console(ConsoleSink::new()), Sink::Http(http)]);

                internal.verbose(format!("Creating Metrics with host {}", config.host));
                let metrics = Metrics::http(
                    transport,
                    config.buffer_size,
                    Arc::clone(&internal),
                    on_error,
                )?;
                (logger, metrics)
            }
            None => {
                internal.warn("No API key provided, using local logger only");
                internal.warn("No API key provided, using noop metrics");
                (Logger::console(), Metrics::noop(Arc::clone(&internal)))
            }
        };

        Ok(Self {
            logger,
            metrics,
            internal,
        })
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Drain logs and metrics in parallel, waiting up to `timeout`
    ///
    /// # Errors
    ///
    /// Returns the first error from either half. On
    /// [`LogdashError::DeadlineExceeded`] draining continues in the background;
    /// call [`Logdash::close`] for a hard stop.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        let (logs, metrics) = thread::scope(|scope| {
            let logs = scope.spawn(|| self.logger.shutdown_by(deadline, timeout));
            let metrics = self.metrics.shutdown_by(deadline, timeout);
            let logs = logs
                .join()
                .unwrap_or_else(|_| Err(LogdashError::other("log shutdown panicked")));
            (logs, metrics)
        });

        logs.and(metrics)
    }

    /// Stop logs and metrics at once, discarding anything not yet sent
    ///
    /// # Errors
    ///
    /// Returns the errors of both halves combined with [`LogdashError::join`]
    pub fn close(&self) -> Result<()> {
        let errors = [self.logger.close(), self.metrics.close()]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        LogdashError::join(errors)
    }

    /// Change how a full log queue is handled; applies from the next overflow
    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        self.logger.set_overflow_policy(policy);
    }
}

impl Drop for Logdash {
    fn drop(&mut self) {
        match self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
            Ok(()) | Err(LogdashError::AlreadyClosed) => {}
            Err(err) => {
                self.internal
                    .error(format!("Shutdown on drop failed: {}", err));
                // Abandon whatever is still draining
                let _ = self.close();
            }
        }
    }
}

/// Builder for constructing [`Logdash`] with a fluent API
///
/// # Example
/// ```
/// use logdash::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let logdash = Logdash::builder()
///     .verbose(true)
///     .buffer_size(1024)
///     .overflow_policy(OverflowPolicy::Drop)
///     .http_timeout(Duration::from_secs(2))
///     .on_error(Arc::new(|err| eprintln!("telemetry: {}", err)))
///     .build()
///     .unwrap();
///
/// // No API key: console only
/// assert!(logdash.metrics().is_noop());
/// ```
pub struct LogdashBuilder {
    config: LogdashConfig,
    transport: Option<Arc<dyn Transport>>,
    on_error: Option<ErrorHandler>,
}

impl LogdashBuilder {
    pub fn new() -> Self {
        Self::from_config(LogdashConfig::default())
    }

    /// Start from an existing configuration
    pub fn from_config(config: LogdashConfig) -> Self {
        Self {
            config,
            transport: None,
            on_error: None,
        }
    }

    /// Base URL of the collector
    #[must_use = "builder methods return a new value"]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Print the SDK's own diagnostics, including every metric operation
    #[must_use = "builder methods return a new value"]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Capacity of the log queue
    #[must_use = "builder methods return a new value"]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set the overflow policy for the log queue
    ///
    /// Default is `Drop`, which never blocks the calling thread.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = timeout;
        self
    }

    /// Retries after the first attempt
    #[must_use = "builder methods return a new value"]
    pub fn http_retries(mut self, retries: u32) -> Self {
        self.config.http.max_retries = retries;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn http_retry_min(mut self, min: Duration) -> Self {
        self.config.http.retry_min = min;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn http_retry_max(mut self, max: Duration) -> Self {
        self.config.http.retry_max = max;
        self
    }

    /// Replace all HTTP settings at once
    #[must_use = "builder methods return a new value"]
    pub fn http(mut self, http: HttpConfig) -> Self {
        self.config.http = http;
        self
    }

    /// Called for dropped log lines and failed deliveries
    ///
    /// Invoked on a background thread, after the internal logger has
    /// reported the failure.
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    /// Deliver through `transport` instead of the built-in HTTP client
    ///
    /// Enables the remote sinks even without an API key.
    #[must_use = "builder methods return a new value"]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and start the background workers
    ///
    /// # Errors
    ///
    /// Returns [`LogdashError::InvalidConfiguration`] if any setting is invalid
    pub fn build(self) -> Result<Logdash> {
        Logdash::with_parts(self.config, self.transport, self.on_error)
    }
}

impl Default for LogdashBuilder {
    fn default() -> Self {
        Self::new()
    }
}
