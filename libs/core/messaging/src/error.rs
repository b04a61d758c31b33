//! Error types for job handling and queue transport.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error categories used for logging and metric labels.
///
/// Every category maps to the same disposition (negative acknowledgement with
/// the configured delay); retry limits are owned by the queue server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Payload is malformed or a required field is missing
    Validation,

    /// A downstream dependency (HTTP origin, object storage) failed
    Downstream,

    /// The publish capability failed to emit an event
    Publish,

    /// The handler exceeded its wall-clock budget
    Timeout,

    /// The handler task panicked
    Panic,
}

impl ErrorCategory {
    /// Stable label for logs and Prometheus.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Downstream => "downstream",
            ErrorCategory::Publish => "publish",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Panic => "panic",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a job handler (or raised on its behalf by the runtime).
#[derive(Debug, Error)]
pub enum JobError {
    /// Payload failed to decode or is missing a required field
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Network or storage failure while the handler was running
    #[error("downstream error: {message}")]
    Downstream {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Publishing a downstream event failed
    #[error("publish error: {0}")]
    Publish(String),

    /// Handler did not finish within its budget
    #[error("handler timed out after {0:?}")]
    Timeout(Duration),

    /// Handler task panicked or was cancelled
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a validation error for a required field that is absent or empty.
    pub fn missing_field(field: &str) -> Self {
        Self::Validation {
            message: format!("missing '{}' in event data", field),
        }
    }

    /// Create a downstream error.
    pub fn downstream(message: impl Into<String>) -> Self {
        Self::Downstream {
            message: message.into(),
            source: None,
        }
    }

    /// Create a downstream error with a source.
    pub fn downstream_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Downstream {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            JobError::Validation { .. } => ErrorCategory::Validation,
            JobError::Downstream { .. } => ErrorCategory::Downstream,
            JobError::Publish(_) => ErrorCategory::Publish,
            JobError::Timeout(_) => ErrorCategory::Timeout,
            JobError::Panicked(_) => ErrorCategory::Panic,
        }
    }
}

/// Error raised by the queue transport (fetch, ack, publish).
#[derive(Debug, Error)]
pub enum QueueError {
    /// Pulling a batch from the durable consumer failed
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Recording a disposition failed
    #[error("{operation} failed: {message}")]
    Ack {
        operation: &'static str,
        message: String,
    },

    /// Emitting a message failed
    #[error("publish to '{subject}' failed: {message}")]
    Publish { subject: String, message: String },
}

impl QueueError {
    /// Create a fetch error.
    pub fn fetch(error: impl fmt::Display) -> Self {
        Self::Fetch(error.to_string())
    }

    /// Create an ack-family error for the named operation.
    pub fn ack(operation: &'static str, error: impl fmt::Display) -> Self {
        Self::Ack {
            operation,
            message: error.to_string(),
        }
    }

    /// Create a publish error.
    pub fn publish(subject: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::Publish {
            subject: subject.into(),
            message: error.to_string(),
        }
    }
}
