//! Prometheus metrics for the consumer runtime.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Metrics for one worker process (one stream, one job).
#[derive(Clone)]
pub struct RuntimeMetrics {
    stream_name: String,
    job_name: String,
}

impl RuntimeMetrics {
    /// Create new metrics.
    pub fn new(stream_name: &str, job_name: &str) -> Self {
        Self {
            stream_name: stream_name.to_string(),
            job_name: job_name.to_string(),
        }
    }

    /// Record a batch returned by the consumer.
    pub fn batch_fetched(&self, size: usize) {
        counter!(
            "keda_jobs_messages_fetched_total",
            "stream" => self.stream_name.clone(),
            "job" => self.job_name.clone()
        )
        .increment(size as u64);
    }

    /// Record a failed fetch.
    pub fn fetch_failed(&self) {
        counter!(
            "keda_jobs_fetch_failures_total",
            "stream" => self.stream_name.clone(),
            "job" => self.job_name.clone()
        )
        .increment(1);
    }

    /// Record a message acknowledged after a successful handler run.
    pub fn message_acked(&self, duration: Duration) {
        counter!(
            "keda_jobs_messages_acked_total",
            "stream" => self.stream_name.clone(),
            "job" => self.job_name.clone()
        )
        .increment(1);

        histogram!(
            "keda_jobs_handler_duration_seconds",
            "stream" => self.stream_name.clone(),
            "job" => self.job_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a message negatively acknowledged.
    pub fn message_nacked(&self, category: &str) {
        counter!(
            "keda_jobs_messages_nacked_total",
            "stream" => self.stream_name.clone(),
            "job" => self.job_name.clone(),
            "category" => category.to_string()
        )
        .increment(1);
    }

    /// Record a transport failure while recording a disposition.
    pub fn disposition_failed(&self, operation: &'static str) {
        counter!(
            "keda_jobs_disposition_failures_total",
            "stream" => self.stream_name.clone(),
            "job" => self.job_name.clone(),
            "operation" => operation
        )
        .increment(1);
    }
}

/// Install the Prometheus recorder and return a handle for `/metrics`.
///
/// Fails if a recorder is already installed in this process.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
