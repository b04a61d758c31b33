//! The fetch → dispatch → acknowledge loop.

use crate::ack::AckController;
use crate::config::RuntimeConfig;
use crate::dispatcher::{HandlerDispatcher, MessageContext};
use crate::handler::{decode_payload, JobHandler};
use crate::metrics::RuntimeMetrics;
use crate::publish::Publish;
use crate::shutdown::ShutdownToken;
use crate::transport::{Delivery, MessageSource};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause before retrying after a failed fetch.
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Drives one durable consumer until shutdown.
///
/// Each cycle pulls up to `batch_size` messages, waiting at most `fetch_wait`.
/// Messages in a batch are processed concurrently (bounded by `batch_size`),
/// each getting exactly one terminal disposition. Cancellation is observed
/// between cycles, so the in-flight batch always completes.
pub struct ConsumerRuntime<S: MessageSource, H: JobHandler> {
    source: S,
    dispatcher: HandlerDispatcher<H>,
    acks: AckController,
    metrics: RuntimeMetrics,
    batch_size: usize,
    fetch_wait: Duration,
}

impl<S, H> ConsumerRuntime<S, H>
where
    S: MessageSource,
    H: JobHandler,
{
    /// Wire a runtime from its parts.
    pub fn new(source: S, handler: Arc<H>, publish: Publish, config: &RuntimeConfig) -> Self {
        let metrics = RuntimeMetrics::new(&config.stream_name, &config.job_name);
        let dispatcher = HandlerDispatcher::new(
            handler,
            publish,
            config.handler_timeout,
            config.nak_delay,
            metrics.clone(),
        );

        Self {
            source,
            dispatcher,
            acks: AckController::new(metrics.clone()),
            metrics,
            batch_size: config.batch_size.max(1),
            fetch_wait: config.fetch_wait,
        }
    }

    /// The underlying message source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: ShutdownToken) {
        info!(
            batch_size = self.batch_size,
            fetch_wait_secs = self.fetch_wait.as_secs(),
            "Consumer loop started"
        );

        while !shutdown.is_cancelled() {
            let batch = match self.source.fetch(self.batch_size, self.fetch_wait).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Fetch failed, retrying");
                    self.metrics.fetch_failed();
                    tokio::select! {
                        _ = tokio::time::sleep(FETCH_RETRY_DELAY) => {}
                        _ = shutdown.cancelled() => {}
                    }
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }

            debug!(count = batch.len(), "Fetched batch");
            self.metrics.batch_fetched(batch.len());

            futures::stream::iter(batch)
                .map(|delivery| self.process(delivery))
                .buffer_unordered(self.batch_size)
                .collect::<Vec<()>>()
                .await;
        }

        info!("Consumer loop stopped");
    }

    async fn process(&self, delivery: S::Delivery) {
        let ctx = MessageContext {
            subject: delivery.subject().to_string(),
            correlation_id: delivery.correlation_id(),
            delivery_count: delivery.delivery_count(),
        };

        if let Err(e) = self.acks.extend(&delivery).await {
            warn!(
                subject = %ctx.subject,
                correlation_id = %ctx.correlation_id,
                error = %e,
                "Failed to mark message in progress"
            );
        }

        let disposition = match decode_payload::<H::Payload>(delivery.payload()) {
            Ok(payload) => self.dispatcher.dispatch(payload, &ctx).await,
            Err(e) => self.dispatcher.failed(e, &ctx),
        };

        if let Err(e) = self.acks.apply(delivery, disposition).await {
            error!(
                subject = %ctx.subject,
                correlation_id = %ctx.correlation_id,
                delivery_count = ctx.delivery_count,
                disposition = %disposition,
                error = %e,
                "Failed to record disposition, message will be redelivered"
            );
        }
    }
}
