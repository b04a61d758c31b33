//! Job handler capability and payload decoding.

use crate::error::JobError;
use crate::publish::Publish;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Structured, validated message payload for a job.
///
/// Deserialization enforces the record's shape; `validate` adds checks serde
/// cannot express (e.g. a required string must not be empty).
pub trait JobPayload: DeserializeOwned + Send + 'static {
    /// Check required/optional field rules after decoding.
    fn validate(&self) -> Result<(), JobError> {
        Ok(())
    }
}

/// Job handler trait.
///
/// Exactly one handler is bound per worker process. The runtime decodes the
/// message into [`JobHandler::Payload`], calls [`JobHandler::handle`] under a
/// timeout, and acknowledges on `Ok` or negatively acknowledges on `Err`.
///
/// # Example
///
/// ```rust,ignore
/// use messaging::{JobError, JobHandler, JobPayload, Publish};
///
/// #[derive(Deserialize)]
/// struct Thumbnail { r2_key: String }
/// impl JobPayload for Thumbnail {}
///
/// struct ThumbnailHandler;
///
/// #[async_trait]
/// impl JobHandler for ThumbnailHandler {
///     type Payload = Thumbnail;
///
///     async fn handle(&self, job: Thumbnail, publish: &Publish) -> Result<(), JobError> {
///         publish.publish("thumbnail-created", &json!({"r2_key": job.r2_key})).await
///     }
///
///     fn name(&self) -> &'static str { "thumbnail" }
/// }
/// ```
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Payload record this handler consumes.
    type Payload: JobPayload;

    /// Process one decoded payload.
    async fn handle(&self, payload: Self::Payload, publish: &Publish) -> Result<(), JobError>;

    /// Handler name for logging and metrics.
    fn name(&self) -> &'static str;
}

/// Decode and validate a raw message body.
///
/// The body must be a JSON object. Malformed JSON, any other JSON value, a
/// wrong shape, or a missing required field all become
/// [`JobError::Validation`].
pub fn decode_payload<P: JobPayload>(bytes: &[u8]) -> Result<P, JobError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| JobError::validation(format!("invalid payload: {}", e)))?;
    if !value.is_object() {
        return Err(JobError::validation("invalid payload: expected a JSON object"));
    }

    let payload: P = serde_json::from_value(value)
        .map_err(|e| JobError::validation(format!("invalid payload: {}", e)))?;
    payload.validate()?;
    Ok(payload)
}

/// Require a string field to be present and non-blank.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), JobError> {
    if value.trim().is_empty() {
        return Err(JobError::missing_field(field));
    }
    Ok(())
}
