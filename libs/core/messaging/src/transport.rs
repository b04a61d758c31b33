//! Queue transport seams used by the consumer runtime.
//!
//! The runtime only needs two things from a queue backend: a way to pull a
//! bounded batch from a durable consumer, and a handle per fetched message to
//! record its disposition. `nats` implements both on JetStream; tests use
//! in-memory doubles.

use crate::error::QueueError;
use async_trait::async_trait;
use std::time::Duration;

/// A fetched message leased from the queue.
///
/// The queue server owns the canonical message state; this is only the lease
/// the runtime holds while processing.
#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    /// Routing key the message was published on.
    fn subject(&self) -> &str;

    /// Raw message body (JSON expected).
    fn payload(&self) -> &[u8];

    /// Identifier used to correlate log lines for this message
    /// (e.g. the stream sequence).
    fn correlation_id(&self) -> String;

    /// Delivery attempt number as tracked by the server (1 on first delivery).
    fn delivery_count(&self) -> u64;

    /// Mark the message as fully processed.
    async fn ack(&self) -> Result<(), QueueError>;

    /// Request redelivery no sooner than `delay`.
    async fn nak(&self, delay: Duration) -> Result<(), QueueError>;

    /// Extend the redelivery deadline without finalizing.
    async fn in_progress(&self) -> Result<(), QueueError>;
}

/// Pull-based source of deliveries (a durable consumer).
#[async_trait]
pub trait MessageSource: Send + Sync {
    type Delivery: Delivery;

    /// Fetch up to `max_messages`, waiting at most `wait`.
    ///
    /// An empty batch means nothing arrived within the wait and is not an error.
    async fn fetch(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<Self::Delivery>, QueueError>;
}
