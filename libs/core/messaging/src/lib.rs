//! Queue-consumer runtime for keda-jobs workers.
//!
//! A worker process binds exactly one [`JobHandler`] to one durable consumer.
//! The runtime pulls bounded batches, marks each message in progress, decodes
//! its payload, runs the handler under a hard timeout, and records exactly one
//! terminal disposition per message:
//!
//! - handler `Ok` → acknowledge
//! - any error, or timeout → negative-acknowledge with a fixed delay
//!
//! Retries happen only through redelivery by the queue server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   fetch(N, wait)   ┌──────────────────────┐
//! │  MessageSource   │◀───────────────────│   ConsumerRuntime    │◀── ShutdownToken
//! │ (durable cursor) │───────────────────▶│  (buffer_unordered)  │
//! └──────────────────┘   Vec<Delivery>    └──────────┬───────────┘
//!                                                    │ payload
//!                                         ┌──────────▼───────────┐
//!                                         │  HandlerDispatcher   │── Publish
//!                                         │ (select! + timeout)  │
//!                                         └──────────┬───────────┘
//!                                                    │ Disposition
//!                                         ┌──────────▼───────────┐
//!                                         │    AckController     │
//!                                         └──────────────────────┘
//! ```
//!
//! The `nats` feature provides the JetStream backend and the
//! [`nats::run_consumer`] process entry point.

mod ack;
mod config;
mod dispatcher;
mod disposition;
mod error;
mod handler;
mod health;
pub mod metrics;
mod publish;
mod runtime;
mod shutdown;
mod transport;

#[cfg(test)]
mod testing;

#[cfg(feature = "nats")]
pub mod nats;

pub use ack::AckController;
pub use config::{
    RuntimeConfig, DEFAULT_FETCH_WAIT, DEFAULT_HANDLER_TIMEOUT, DEFAULT_HEALTH_PORT,
    DEFAULT_NAK_DELAY, DEFAULT_NATS_URL, DEFAULT_STREAM,
};
pub use dispatcher::{HandlerDispatcher, MessageContext};
pub use disposition::Disposition;
pub use error::{ErrorCategory, JobError, QueueError};
pub use handler::{decode_payload, require_non_empty, JobHandler, JobPayload};
pub use health::{HealthProbe, RunningProbe};
pub use self::metrics::{init_metrics, RuntimeMetrics};
pub use publish::{FailingPublisher, Publish, Publisher, RecordingPublisher};
pub use runtime::ConsumerRuntime;
pub use shutdown::{ShutdownCoordinator, ShutdownState, ShutdownToken};
pub use transport::{Delivery, MessageSource};
