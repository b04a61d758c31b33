//! Object storage for keda-jobs workers.
//!
//! Handlers depend on the [`ObjectStore`] trait; production wires in
//! [`R2Store`] (Cloudflare R2 over the S3 API) and tests use
//! [`InMemoryStore`].
//!
//! ```rust,ignore
//! use object_storage::{ObjectStore, R2Config, R2Store};
//!
//! let store = R2Store::new(R2Config::from_env()?);
//! store.put("images/a.png", bytes, "image/png").await?;
//! let body = store.get("images/a.png").await?;
//! ```

mod config;
mod error;
mod memory;
mod r2;

pub use config::{R2Config, DEFAULT_BUCKET};
pub use error::StorageError;
pub use memory::{InMemoryStore, StoredObject};
pub use r2::R2Store;

use async_trait::async_trait;
use bytes::Bytes;

/// Key-addressed binary store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` with the given content type, replacing any
    /// existing object.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Fetch the full body stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;
}
