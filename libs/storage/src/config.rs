//! R2 connection settings.

use core_config::{env_optional, env_or_default, ConfigError, FromEnv};

/// Bucket used when `R2_BUCKET` is not set.
pub const DEFAULT_BUCKET: &str = "keda-jobs-prod";

/// Cloudflare R2 settings.
///
/// Credentials are optional here; a missing value is only reported when the
/// client is first built, so a misconfigured worker still starts and fails
/// messages instead of crash-looping.
#[derive(Debug, Clone, Default)]
pub struct R2Config {
    pub account_id: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: String,
}

impl R2Config {
    /// S3 endpoint for the account.
    pub fn endpoint_url(&self) -> Option<String> {
        self.account_id
            .as_deref()
            .map(|id| format!("https://{}.r2.cloudflarestorage.com", id))
    }

    /// Set the bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }
}

impl FromEnv for R2Config {
    /// Reads `R2_ACCOUNT_ID`, `R2_ACCESS_KEY_ID`, `R2_SECRET_ACCESS_KEY` and
    /// `R2_BUCKET`.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            account_id: env_optional("R2_ACCOUNT_ID"),
            access_key_id: env_optional("R2_ACCESS_KEY_ID"),
            secret_access_key: env_optional("R2_SECRET_ACCESS_KEY"),
            bucket: env_or_default("R2_BUCKET", DEFAULT_BUCKET),
        })
    }
}
