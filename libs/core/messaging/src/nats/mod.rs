//! NATS JetStream backend for the consumer runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐     ┌─────────────────────┐     ┌─────────────────┐
//! │   Producer     │────▶│   NATS JetStream    │────▶│ ConsumerRuntime │
//! │ (any service)  │     │  (keda-jobs-events) │     │  (NatsSource)   │
//! └────────────────┘     └─────────────────────┘     └─────────────────┘
//!                                  ▲                          │
//!                                  │                          ▼
//!                        ┌─────────────────┐         ┌─────────────────┐
//!                        │  NatsPublisher  │◀────────│   JobHandler    │
//!                        │ (next job event)│         │  (your logic)   │
//!                        └─────────────────┘         └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging::nats::run_consumer;
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     run_consumer(ThumbnailHandler::new(store), "thumbnail").await
//! }
//! ```

mod consumer;
mod error;
mod producer;
mod worker;

pub use consumer::{NatsDelivery, NatsSource};
pub use error::NatsError;
pub use producer::NatsPublisher;
pub use worker::{run_consumer, run_with_shutdown};
