//! Runtime configuration for a worker process.

use core_config::{env_or_default, env_parse_or, ConfigError};
use std::time::Duration;

/// Default NATS endpoint.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// Default JetStream stream shared by all jobs.
pub const DEFAULT_STREAM: &str = "keda-jobs-events";

/// Default handler wall-clock budget.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(300);

/// Default redelivery delay after a failure.
pub const DEFAULT_NAK_DELAY: Duration = Duration::from_secs(30);

/// Default bounded wait for a fetch.
pub const DEFAULT_FETCH_WAIT: Duration = Duration::from_secs(5);

/// Default liveness port.
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Worker configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Job name (one job type per process)
    pub job_name: String,

    /// NATS server URL
    pub nats_url: String,

    /// JetStream stream name
    pub stream_name: String,

    /// Durable consumer name
    pub consumer_name: String,

    /// Subject filter for the durable consumer
    pub subject_filter: String,

    /// Messages per fetch; also the in-batch concurrency bound
    pub batch_size: usize,

    /// How long a fetch waits for messages
    pub fetch_wait: Duration,

    /// Wall-clock budget per handler invocation
    pub handler_timeout: Duration,

    /// Redelivery delay on failure
    pub nak_delay: Duration,

    /// Health server port
    pub health_port: u16,
}

impl RuntimeConfig {
    /// Defaults for `job_name`: consumer `<job>-consumer`, filter `<job>`.
    pub fn new(job_name: impl Into<String>) -> Self {
        let job_name = job_name.into();
        Self {
            nats_url: DEFAULT_NATS_URL.to_string(),
            stream_name: DEFAULT_STREAM.to_string(),
            consumer_name: format!("{}-consumer", job_name),
            subject_filter: job_name.clone(),
            batch_size: 1,
            fetch_wait: DEFAULT_FETCH_WAIT,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            nak_delay: DEFAULT_NAK_DELAY,
            health_port: DEFAULT_HEALTH_PORT,
            job_name,
        }
    }

    /// Load from environment variables, falling back to [`RuntimeConfig::new`].
    ///
    /// - `NATS_URL`, `NATS_STREAM`, `NATS_CONSUMER`, `NATS_SUBJECT_FILTER`
    /// - `FETCH_BATCH_SIZE`, `FETCH_WAIT_SECS`
    /// - `HANDLER_TIMEOUT_SECS`, `NAK_DELAY_SECS`
    /// - `HEALTH_PORT`
    pub fn from_env(job_name: impl Into<String>) -> Result<Self, ConfigError> {
        let defaults = Self::new(job_name);

        let batch_size: usize = env_parse_or("FETCH_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FETCH_BATCH_SIZE".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        let handler_timeout_secs =
            env_parse_or("HANDLER_TIMEOUT_SECS", defaults.handler_timeout.as_secs())?;
        if handler_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HANDLER_TIMEOUT_SECS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            nats_url: env_or_default("NATS_URL", &defaults.nats_url),
            stream_name: env_or_default("NATS_STREAM", &defaults.stream_name),
            consumer_name: env_or_default("NATS_CONSUMER", &defaults.consumer_name),
            subject_filter: env_or_default("NATS_SUBJECT_FILTER", &defaults.subject_filter),
            batch_size,
            fetch_wait: Duration::from_secs(env_parse_or(
                "FETCH_WAIT_SECS",
                defaults.fetch_wait.as_secs(),
            )?),
            handler_timeout: Duration::from_secs(handler_timeout_secs),
            nak_delay: Duration::from_secs(env_parse_or(
                "NAK_DELAY_SECS",
                defaults.nak_delay.as_secs(),
            )?),
            health_port: env_parse_or("HEALTH_PORT", defaults.health_port)?,
            job_name: defaults.job_name,
        })
    }

    /// Set the stream name.
    pub fn with_stream_name(mut self, name: impl Into<String>) -> Self {
        self.stream_name = name.into();
        self
    }

    /// Set the durable consumer name.
    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    /// Set the subject filter.
    pub fn with_subject_filter(mut self, subject: impl Into<String>) -> Self {
        self.subject_filter = subject.into();
        self
    }

    /// Set the batch size (clamped to at least 1).
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the fetch wait.
    pub fn with_fetch_wait(mut self, wait: Duration) -> Self {
        self.fetch_wait = wait;
        self
    }

    /// Set the handler timeout.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Set the negative-acknowledgement delay.
    pub fn with_nak_delay(mut self, delay: Duration) -> Self {
        self.nak_delay = delay;
        self
    }

    /// Set the health server port.
    pub fn with_health_port(mut self, port: u16) -> Self {
        self.health_port = port;
        self
    }

    /// Set the NATS URL.
    pub fn with_nats_url(mut self, url: impl Into<String>) -> Self {
        self.nats_url = url.into();
        self
    }
}
