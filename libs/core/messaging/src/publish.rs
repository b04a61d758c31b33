//! The publish capability handed to job handlers.

use crate::error::{JobError, QueueError};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Backend that emits raw messages onto the queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Emit `payload` under `subject`, returning once the queue accepted it.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), QueueError>;
}

/// Capability to emit downstream events, bound to the runtime's publisher.
///
/// Cheap to clone. Handlers receive it by reference and call [`Publish::publish`]
/// with any serializable record; failures surface as [`JobError::Publish`].
#[derive(Clone)]
pub struct Publish {
    publisher: Arc<dyn Publisher>,
}

impl Publish {
    /// Bind the capability to a publisher.
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    /// Serialize `event` as JSON and emit it under `subject`.
    pub async fn publish<T>(&self, subject: &str, event: &T) -> Result<(), JobError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let payload = serde_json::to_vec(event)
            .map_err(|e| JobError::Publish(format!("failed to serialize event: {}", e)))?;

        self.publisher
            .publish(subject, Bytes::from(payload))
            .await
            .map_err(|e| JobError::Publish(e.to_string()))?;

        info!(subject = %subject, "Published event");
        Ok(())
    }
}

/// Publisher that records every message instead of sending it.
///
/// Useful for handler tests that assert on emitted events.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<(String, Bytes)>>>,
}

impl RecordingPublisher {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded `(subject, payload)` pairs in publish order.
    pub async fn published(&self) -> Vec<(String, Bytes)> {
        self.published.lock().await.clone()
    }

    /// Recorded payloads for a subject decoded as JSON.
    pub async fn events_on(&self, subject: &str) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(s, _)| s == subject)
            .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
            .collect()
    }

    /// Number of recorded messages.
    pub async fn count(&self) -> usize {
        self.published.lock().await.len()
    }

    /// Wrap this recorder in a [`Publish`] capability.
    pub fn capability(&self) -> Publish {
        Publish::new(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), QueueError> {
        self.published
            .lock()
            .await
            .push((subject.to_string(), payload));
        Ok(())
    }
}

/// Publisher that always fails.
pub struct FailingPublisher {
    message: String,
}

impl FailingPublisher {
    /// Create a publisher failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, subject: &str, _payload: Bytes) -> Result<(), QueueError> {
        Err(QueueError::publish(subject, &self.message))
    }
}
