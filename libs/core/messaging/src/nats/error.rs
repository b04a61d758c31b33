//! Error types for the NATS backend.

use thiserror::Error;

/// Error that can occur while wiring a worker to NATS JetStream.
///
/// These surface during startup and are fatal for the process; errors on the
/// hot path are reported as [`crate::QueueError`].
#[derive(Debug, Error)]
pub enum NatsError {
    /// Stream not found
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// Consumer error
    #[error("Consumer error: {0}")]
    Consumer(String),
}

impl NatsError {
    /// Create a consumer error.
    pub fn consumer_error(msg: impl Into<String>) -> Self {
        Self::Consumer(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = NatsError::StreamNotFound("keda-jobs-events".to_string());
        assert_eq!(err.to_string(), "Stream not found: keda-jobs-events");

        let err = NatsError::consumer_error("filter subject mismatch");
        assert!(err.to_string().starts_with("Consumer error"));
    }
}
