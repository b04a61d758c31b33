//! Download an image and store it in R2.

use async_trait::async_trait;
use bytes::Bytes;
use messaging::{require_non_empty, JobError, JobHandler, JobPayload, Publish};
use object_storage::ObjectStore;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Subject the completion event is published on.
pub const DOWNLOADED_SUBJECT: &str = "image-downloaded";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `image-download` message.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,

    /// Extra request headers (e.g. auth or referer for the origin)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl JobPayload for DownloadRequest {
    fn validate(&self) -> Result<(), JobError> {
        require_non_empty("url", &self.url)
    }
}

/// `image-downloaded` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDownloaded {
    pub r2_key: String,
}

/// Handler for `image-download` messages.
pub struct DownloadHandler {
    http: reqwest::Client,
    store: Arc<dyn ObjectStore>,
}

impl DownloadHandler {
    /// Create a handler with a 60s-timeout HTTP client.
    pub fn new(store: Arc<dyn ObjectStore>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self::with_client(http, store))
    }

    /// Create a handler with an existing HTTP client.
    pub fn with_client(http: reqwest::Client, store: Arc<dyn ObjectStore>) -> Self {
        Self { http, store }
    }
}

#[async_trait]
impl JobHandler for DownloadHandler {
    type Payload = DownloadRequest;

    async fn handle(&self, job: DownloadRequest, publish: &Publish) -> Result<(), JobError> {
        let (body, content_type) = download_image(&self.http, &job.url, &job.headers).await?;
        info!(
            url = %job.url,
            size = body.len(),
            content_type = %content_type,
            "Downloaded image"
        );

        let key = build_object_key(&job.url);
        self.store
            .put(&key, body, &content_type)
            .await
            .map_err(|e| JobError::downstream_with_source("failed to upload to R2", e))?;
        info!(r2_key = %key, "Upload complete");

        publish
            .publish(DOWNLOADED_SUBJECT, &ImageDownloaded { r2_key: key })
            .await
    }

    fn name(&self) -> &'static str {
        "image_download"
    }
}

/// GET `url` with `headers`, returning the body and its content type.
///
/// Non-2xx responses are errors. A missing `Content-Type` falls back to
/// `application/octet-stream`.
pub async fn download_image(
    http: &reqwest::Client,
    url: &str,
    headers: &HashMap<String, String>,
) -> Result<(Bytes, String), JobError> {
    let mut request = http.get(url);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| JobError::downstream_with_source(format!("failed to download {}", url), e))?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let body = response
        .bytes()
        .await
        .map_err(|e| JobError::downstream_with_source(format!("failed to read {}", url), e))?;

    Ok((body, content_type))
}

/// Object key `images/<uuid-v4><ext>`, keeping the URL path's extension.
///
/// A path ending in `/` names a directory and contributes no extension.
pub fn build_object_key(url: &str) -> String {
    let extension = reqwest::Url::parse(url)
        .ok()
        .filter(|parsed| !parsed.path().ends_with('/'))
        .and_then(|parsed| {
            Path::new(parsed.path())
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
        })
        .unwrap_or_default();

    format!("images/{}{}", Uuid::new_v4(), extension)
}
