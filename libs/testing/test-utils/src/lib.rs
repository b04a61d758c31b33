//! Shared test utilities for worker testing
//!
//! - `TestNats`: NATS container with JetStream and automatic cleanup (feature: "nats")
//! - `create_stream`: provisions a work stream the way the cluster does
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::TestNats;
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_nats_test() {
//!     let nats = TestNats::new().await;
//!     nats.create_stream("keda-jobs-events", &["image-download"]).await;
//! }
//! ```

#[cfg(feature = "nats")]
mod nats;

#[cfg(feature = "nats")]
pub use nats::TestNats;
