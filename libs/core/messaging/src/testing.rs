//! In-memory transport doubles for unit tests.

use crate::error::QueueError;
use crate::shutdown::ShutdownCoordinator;
use crate::transport::{Delivery, MessageSource};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    InProgress,
    Ack,
    Nak(Duration),
}

/// Shared log of calls made against one delivery.
#[derive(Clone, Default)]
pub struct DispositionLog {
    entries: Arc<Mutex<Vec<Recorded>>>,
}

impl DispositionLog {
    pub fn entries(&self) -> Vec<Recorded> {
        self.entries.lock().unwrap().clone()
    }

    pub fn terminal_count(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| !matches!(e, Recorded::InProgress))
            .count()
    }

    pub fn terminal(&self) -> Option<Recorded> {
        self.entries()
            .into_iter()
            .find(|e| !matches!(e, Recorded::InProgress))
    }

    fn push(&self, entry: Recorded) {
        self.entries.lock().unwrap().push(entry);
    }
}

pub struct FakeDelivery {
    subject: String,
    payload: Vec<u8>,
    sequence: u64,
    log: DispositionLog,
    fail_acks: bool,
}

impl FakeDelivery {
    pub fn new(subject: &str, payload: &[u8]) -> Self {
        Self {
            subject: subject.to_string(),
            payload: payload.to_vec(),
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            log: DispositionLog::default(),
            fail_acks: false,
        }
    }

    pub fn failing_acks(mut self) -> Self {
        self.fail_acks = true;
        self
    }

    pub fn log(&self) -> DispositionLog {
        self.log.clone()
    }

    fn record(&self, operation: &'static str, entry: Recorded) -> Result<(), QueueError> {
        if self.fail_acks {
            return Err(QueueError::ack(operation, "connection closed"));
        }
        self.log.push(entry);
        Ok(())
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn correlation_id(&self) -> String {
        self.sequence.to_string()
    }

    fn delivery_count(&self) -> u64 {
        1
    }

    async fn ack(&self) -> Result<(), QueueError> {
        self.record("ack", Recorded::Ack)
    }

    async fn nak(&self, delay: Duration) -> Result<(), QueueError> {
        self.record("nak", Recorded::Nak(delay))
    }

    async fn in_progress(&self) -> Result<(), QueueError> {
        self.record("in_progress", Recorded::InProgress)
    }
}

/// Scripted source: replays batches (or errors) in order, then returns empty
/// batches. Optionally begins shutdown once the script is exhausted.
pub struct FakeSource {
    script: Mutex<VecDeque<Result<Vec<FakeDelivery>, QueueError>>>,
    fetches: AtomicUsize,
    shutdown_when_drained: Option<ShutdownCoordinator>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fetches: AtomicUsize::new(0),
            shutdown_when_drained: None,
        }
    }

    pub fn batch(self, batch: Vec<FakeDelivery>) -> Self {
        self.script.lock().unwrap().push_back(Ok(batch));
        self
    }

    pub fn error(self, error: QueueError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn shutdown_when_drained(mut self, coordinator: ShutdownCoordinator) -> Self {
        self.shutdown_when_drained = Some(coordinator);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for FakeSource {
    type Delivery = FakeDelivery;

    async fn fetch(
        &self,
        max_messages: usize,
        _wait: Duration,
    ) -> Result<Vec<FakeDelivery>, QueueError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(mut batch)) => {
                batch.truncate(max_messages);
                Ok(batch)
            }
            Some(Err(e)) => Err(e),
            None => {
                if let Some(coordinator) = &self.shutdown_when_drained {
                    coordinator.begin_drain();
                }
                tokio::task::yield_now().await;
                Ok(Vec::new())
            }
        }
    }
}
