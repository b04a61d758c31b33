//! Cloudflare R2 store over the S3 API.

use crate::config::R2Config;
use crate::error::StorageError;
use crate::ObjectStore;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// R2-backed [`ObjectStore`].
///
/// The S3 client is built on first use and shared by every call after that.
/// A build failure is returned to the caller and retried on the next call.
pub struct R2Store {
    config: R2Config,
    client: OnceCell<Client>,
}

impl R2Store {
    /// Create a store; no client is built yet.
    pub fn new(config: R2Config) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Bucket objects are written to.
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Whether the S3 client has been built.
    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> Result<&Client, StorageError> {
        self.client
            .get_or_try_init(|| async { build_client(&self.config) })
            .await
    }
}

fn build_client(config: &R2Config) -> Result<Client, StorageError> {
    let endpoint = config
        .endpoint_url()
        .ok_or_else(|| StorageError::Config("R2_ACCOUNT_ID is not set".to_string()))?;
    let access_key_id = config
        .access_key_id
        .clone()
        .ok_or_else(|| StorageError::Config("R2_ACCESS_KEY_ID is not set".to_string()))?;
    let secret_access_key = config
        .secret_access_key
        .clone()
        .ok_or_else(|| StorageError::Config("R2_SECRET_ACCESS_KEY is not set".to_string()))?;

    let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "r2");

    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .endpoint_url(&endpoint)
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .build();

    info!(endpoint = %endpoint, bucket = %config.bucket, "R2 client initialized");
    Ok(Client::from_conf(s3_config))
}

#[async_trait]
impl ObjectStore for R2Store {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        let size = body.len();

        self.client()
            .await?
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(key = %key, error = %DisplayErrorContext(&e), "R2 upload failed");
                StorageError::request("put", key, DisplayErrorContext(&e))
            })?;

        debug!(key = %key, size, content_type = %content_type, "Uploaded object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client()
            .await?
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return StorageError::NotFound(key.to_string());
                }
                error!(key = %key, error = %DisplayErrorContext(&e), "R2 download failed");
                StorageError::request("get", key, DisplayErrorContext(&e))
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::request("get", key, e))?
            .into_bytes();

        debug!(key = %key, size = body.len(), "Downloaded object");
        Ok(body)
    }
}
