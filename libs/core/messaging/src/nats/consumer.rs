//! Durable pull consumer on JetStream.

use crate::config::RuntimeConfig;
use crate::error::QueueError;
use crate::nats::error::NatsError;
use crate::transport::{Delivery, MessageSource};
use async_nats::jetstream::consumer::pull::Config as ConsumerConfig;
use async_nats::jetstream::consumer::{AckPolicy, Consumer};
use async_nats::jetstream::{AckKind, Context};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tracing::{info, warn};

/// Batch source backed by a durable JetStream pull consumer.
pub struct NatsSource {
    consumer: Consumer<ConsumerConfig>,
}

impl NatsSource {
    /// Look up the stream and get or create the durable consumer.
    ///
    /// The stream must already exist. An existing consumer is reused as is, so
    /// settings like `max_deliver` stay under the operator's control.
    pub async fn bind(jetstream: &Context, config: &RuntimeConfig) -> Result<Self, NatsError> {
        let stream = jetstream
            .get_stream(&config.stream_name)
            .await
            .map_err(|e| {
                warn!(stream = %config.stream_name, error = %e, "Stream lookup failed");
                NatsError::StreamNotFound(config.stream_name.clone())
            })?;

        let consumer = stream
            .get_or_create_consumer(
                &config.consumer_name,
                ConsumerConfig {
                    durable_name: Some(config.consumer_name.clone()),
                    filter_subject: config.subject_filter.clone(),
                    ack_policy: AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| NatsError::consumer_error(e.to_string()))?;

        info!(
            stream = %config.stream_name,
            consumer = %config.consumer_name,
            filter = %config.subject_filter,
            "Bound durable consumer"
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for NatsSource {
    type Delivery = NatsDelivery;

    async fn fetch(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<NatsDelivery>, QueueError> {
        let messages = self
            .consumer
            .fetch()
            .max_messages(max_messages)
            .expires(wait)
            .messages()
            .await
            .map_err(QueueError::fetch)?;

        let batch = collect_batch(messages, max_messages).await?;
        Ok(batch.into_iter().map(NatsDelivery::new).collect())
    }
}

/// Drain one fetch response.
///
/// The server reports failures (consumer deleted, no responders, too many
/// waiting pulls) as an error item that ends the batch. With nothing
/// received that is a failed fetch; otherwise the messages already leased
/// are kept so they still get a disposition.
async fn collect_batch<T, E, S>(mut messages: S, max_messages: usize) -> Result<Vec<T>, QueueError>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: Display,
{
    let mut batch = Vec::with_capacity(max_messages);
    let mut failure = None;

    while let Some(message) = messages.next().await {
        match message {
            Ok(message) => batch.push(message),
            Err(e) => {
                warn!(error = %e, received = batch.len(), "Fetch ended with error");
                failure = Some(e);
            }
        }
    }

    match failure {
        Some(e) if batch.is_empty() => Err(QueueError::fetch(e)),
        _ => Ok(batch),
    }
}

/// A message leased from JetStream.
pub struct NatsDelivery {
    message: async_nats::jetstream::Message,
    sequence: u64,
    delivery_count: u64,
}

impl NatsDelivery {
    fn new(message: async_nats::jetstream::Message) -> Self {
        let (sequence, delivery_count) = match message.info() {
            Ok(info) => (info.stream_sequence, info.delivered.max(1) as u64),
            Err(e) => {
                warn!(error = %e, "Failed to get message info, using defaults");
                (0, 1)
            }
        };

        Self {
            message,
            sequence,
            delivery_count,
        }
    }
}

#[async_trait]
impl Delivery for NatsDelivery {
    fn subject(&self) -> &str {
        self.message.subject.as_str()
    }

    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    fn correlation_id(&self) -> String {
        self.sequence.to_string()
    }

    fn delivery_count(&self) -> u64 {
        self.delivery_count
    }

    async fn ack(&self) -> Result<(), QueueError> {
        self.message
            .ack()
            .await
            .map_err(|e| QueueError::ack("ack", e))
    }

    async fn nak(&self, delay: Duration) -> Result<(), QueueError> {
        self.message
            .ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(|e| QueueError::ack("nak", e))
    }

    async fn in_progress(&self) -> Result<(), QueueError> {
        self.message
            .ack_with(AckKind::Progress)
            .await
            .map_err(|e| QueueError::ack("in_progress", e))
    }
}
