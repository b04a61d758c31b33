//! Shrink a stored image to thumbnail size.

use async_trait::async_trait;
use bytes::Bytes;
use image::ImageFormat;
use messaging::{require_non_empty, JobError, JobHandler, JobPayload, Publish};
use object_storage::ObjectStore;
use serde::Deserialize;
use std::io::Cursor;
use std::sync::Arc;
use tracing::info;

/// Largest width or height of a resized image.
pub const MAX_DIMENSION: u32 = 200;

const ORIGINAL_PREFIX: &str = "images/";
const RESIZED_PREFIX: &str = "images_resized/";

/// `image-downloaded` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ResizeRequest {
    #[serde(default)]
    pub r2_key: String,
}

impl JobPayload for ResizeRequest {
    fn validate(&self) -> Result<(), JobError> {
        require_non_empty("r2_key", &self.r2_key)
    }
}

/// Output of [`resize_image`].
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Handler for `image-downloaded` events. Publishes nothing.
pub struct ResizeHandler {
    store: Arc<dyn ObjectStore>,
}

impl ResizeHandler {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for ResizeHandler {
    type Payload = ResizeRequest;

    async fn handle(&self, job: ResizeRequest, _publish: &Publish) -> Result<(), JobError> {
        let original = self
            .store
            .get(&job.r2_key)
            .await
            .map_err(|e| JobError::downstream_with_source("failed to download from R2", e))?;
        info!(r2_key = %job.r2_key, size = original.len(), "Downloaded original");

        // Decoding and resampling are CPU-bound.
        let resized = tokio::task::spawn_blocking(move || resize_image(original, MAX_DIMENSION))
            .await
            .map_err(|e| JobError::downstream_with_source("resize task failed", e))??;
        info!(
            width = resized.width,
            height = resized.height,
            size = resized.bytes.len(),
            "Resized image"
        );

        let key = build_resized_key(&job.r2_key);
        self.store
            .put(&key, resized.bytes, content_type_for(resized.format))
            .await
            .map_err(|e| JobError::downstream_with_source("failed to upload to R2", e))?;
        info!(r2_key = %key, "Upload complete");

        Ok(())
    }

    fn name(&self) -> &'static str {
        "image_resize"
    }
}

/// Fit the image within `max_dim` × `max_dim`, keeping its aspect ratio and
/// format.
///
/// Only shrinks: an image already within bounds is returned byte-for-byte.
pub fn resize_image(bytes: Bytes, max_dim: u32) -> Result<ResizedImage, JobError> {
    let format = image::guess_format(&bytes)
        .map_err(|e| JobError::validation(format!("unrecognized image format: {}", e)))?;
    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| JobError::validation(format!("failed to decode image: {}", e)))?;

    let (width, height) = (img.width(), img.height());
    if width <= max_dim && height <= max_dim {
        return Ok(ResizedImage {
            bytes,
            width,
            height,
            format,
        });
    }

    let thumbnail = img.thumbnail(max_dim, max_dim);
    let mut out = Cursor::new(Vec::new());
    thumbnail
        .write_to(&mut out, format)
        .map_err(|e| JobError::downstream(format!("failed to encode {:?}: {}", format, e)))?;

    Ok(ResizedImage {
        bytes: Bytes::from(out.into_inner()),
        width: thumbnail.width(),
        height: thumbnail.height(),
        format,
    })
}

/// `images/<name>` → `images_resized/<name>`; other keys get the prefix added.
pub fn build_resized_key(original_key: &str) -> String {
    let name = original_key
        .strip_prefix(ORIGINAL_PREFIX)
        .unwrap_or(original_key);
    format!("{}{}", RESIZED_PREFIX, name)
}

/// MIME type for a stored image format.
pub fn content_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}
