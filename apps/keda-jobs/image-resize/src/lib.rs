//! image-resize worker (NATS JetStream)
//!
//! Pulls `image-downloaded` events, fetches the original from R2, shrinks it
//! to fit within 200×200 and stores the result under `images_resized/`.
//!
//! The consumer's subject filter comes from `NATS_SUBJECT_FILTER` and defaults
//! to the job name, so deployments set it to `image-downloaded`.
//!
//! ```text
//! NATS JetStream (keda-jobs-events)
//!   ↓ (Pull Consumer: image-resize-consumer, filter: $NATS_SUBJECT_FILTER)
//! ResizeHandler
//!   ↓ (R2 get images/<name>)
//! resize_image (spawn_blocking)
//!   ↓
//! R2 (images_resized/<name>)
//! ```

mod handler;

pub use handler::{
    build_resized_key, content_type_for, resize_image, ResizeHandler, ResizeRequest, ResizedImage,
    MAX_DIMENSION,
};

use core_config::{Environment, FromEnv};
use eyre::{Result, WrapErr};
use object_storage::{R2Config, R2Store};
use std::sync::Arc;
use tracing::info;

/// Job name; consumer defaults derive from it.
pub const JOB_NAME: &str = "image-resize";

/// Run the worker until SIGTERM/SIGINT.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        job = JOB_NAME,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?environment,
        "Starting image-resize worker"
    );

    let store = R2Store::new(R2Config::from_env().wrap_err("Invalid R2 configuration")?);
    let handler = ResizeHandler::new(Arc::new(store));

    messaging::nats::run_consumer(handler, JOB_NAME).await
}
