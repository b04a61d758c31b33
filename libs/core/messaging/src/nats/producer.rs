//! JetStream publisher behind the handler publish capability.

use crate::error::QueueError;
use crate::publish::Publisher;
use async_nats::jetstream::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Publishes to JetStream and waits for the server ack.
#[derive(Clone)]
pub struct NatsPublisher {
    jetstream: Context,
}

impl NatsPublisher {
    /// Create a new NATS publisher.
    pub fn new(jetstream: Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl Publisher for NatsPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), QueueError> {
        let ack = self
            .jetstream
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| QueueError::publish(subject, e))?
            .await
            .map_err(|e| QueueError::publish(subject, e))?;

        debug!(
            subject = %subject,
            stream = %ack.stream,
            sequence = ack.sequence,
            "Publish acknowledged"
        );

        Ok(())
    }
}
