//! image-download worker (NATS JetStream)
//!
//! Pulls `image-download` messages carrying an image URL and optional HTTP
//! headers, downloads the image, stores it in R2 under `images/`, and
//! publishes an `image-downloaded` event with the object key.
//!
//! ```text
//! NATS JetStream (keda-jobs-events)
//!   ↓ (Pull Consumer: image-download-consumer)
//! DownloadHandler
//!   ↓ (HTTP GET, 60s timeout)
//! R2 (images/<uuid><ext>)
//!   ↓
//! publish image-downloaded {"r2_key": ...}
//! ```

mod handler;

pub use handler::{
    build_object_key, download_image, DownloadHandler, DownloadRequest, ImageDownloaded,
    DOWNLOADED_SUBJECT,
};

use core_config::{Environment, FromEnv};
use eyre::{Result, WrapErr};
use object_storage::{R2Config, R2Store};
use std::sync::Arc;
use tracing::info;

/// Job name; also the default subject filter.
pub const JOB_NAME: &str = "image-download";

/// Run the worker until SIGTERM/SIGINT.
///
/// Sets up error reporting and env-aware logging, then hands off to the
/// shared consumer runtime.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        job = JOB_NAME,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?environment,
        "Starting image-download worker"
    );

    let store = R2Store::new(R2Config::from_env().wrap_err("Invalid R2 configuration")?);
    let handler = DownloadHandler::new(Arc::new(store)).wrap_err("Failed to build HTTP client")?;

    messaging::nats::run_consumer(handler, JOB_NAME).await
}
