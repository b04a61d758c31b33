//! Bounded handler execution.

use crate::disposition::Disposition;
use crate::error::JobError;
use crate::handler::JobHandler;
use crate::metrics::RuntimeMetrics;
use crate::publish::Publish;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Log context for one message.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub subject: String,
    pub correlation_id: String,
    pub delivery_count: u64,
}

/// Invokes the bound handler under a wall-clock timeout and maps the outcome
/// to a [`Disposition`].
///
/// The dispatcher never touches the queue itself: it returns the disposition
/// and the runtime hands it to the `AckController`.
pub struct HandlerDispatcher<H: JobHandler> {
    handler: Arc<H>,
    publish: Publish,
    timeout: Duration,
    nak_delay: Duration,
    metrics: RuntimeMetrics,
}

impl<H: JobHandler> HandlerDispatcher<H> {
    pub fn new(
        handler: Arc<H>,
        publish: Publish,
        timeout: Duration,
        nak_delay: Duration,
        metrics: RuntimeMetrics,
    ) -> Self {
        Self {
            handler,
            publish,
            timeout,
            nak_delay,
            metrics,
        }
    }

    /// Run the handler on a decoded payload.
    ///
    /// `Ok` → Acknowledge. Any error, a panic, or running past the timeout →
    /// NegativeAcknowledge with the configured delay. On timeout the handler
    /// task is aborted, so its eventual result is never observed.
    pub async fn dispatch(&self, payload: H::Payload, ctx: &MessageContext) -> Disposition {
        debug!(
            subject = %ctx.subject,
            correlation_id = %ctx.correlation_id,
            handler = self.handler.name(),
            "Dispatching message"
        );

        let start = Instant::now();
        let handler = self.handler.clone();
        let publish = self.publish.clone();
        // Own task, so a panic stays with this message.
        let mut work = tokio::spawn(async move { handler.handle(payload, &publish).await });
        let deadline = tokio::time::sleep(self.timeout);

        let result = tokio::select! {
            // Deadline first: when both are ready, the timeout wins.
            biased;
            _ = deadline => {
                work.abort();
                Err(JobError::Timeout(self.timeout))
            }
            joined = &mut work => match joined {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(JobError::Panicked(panic_message(e.into_panic()))),
                Err(e) => Err(JobError::Panicked(e.to_string())),
            },
        };

        match result {
            Ok(()) => {
                let elapsed = start.elapsed();
                self.metrics.message_acked(elapsed);
                debug!(
                    subject = %ctx.subject,
                    correlation_id = %ctx.correlation_id,
                    duration_ms = elapsed.as_millis() as u64,
                    "Message processed"
                );
                Disposition::Acknowledge
            }
            Err(e) => self.failed(e, ctx),
        }
    }

    /// Disposition for a message that failed before or during handling.
    pub fn failed(&self, error: JobError, ctx: &MessageContext) -> Disposition {
        let category = error.category();
        self.metrics.message_nacked(category.as_str());

        match &error {
            JobError::Timeout(after) => {
                error!(
                    subject = %ctx.subject,
                    correlation_id = %ctx.correlation_id,
                    delivery_count = ctx.delivery_count,
                    timeout_secs = after.as_secs_f64(),
                    delay_secs = self.nak_delay.as_secs(),
                    "Handler timed out, nacking"
                );
            }
            JobError::Panicked(reason) => {
                error!(
                    subject = %ctx.subject,
                    correlation_id = %ctx.correlation_id,
                    delivery_count = ctx.delivery_count,
                    panic = %reason,
                    delay_secs = self.nak_delay.as_secs(),
                    "Handler panicked, nacking"
                );
            }
            JobError::Validation { .. } => {
                warn!(
                    subject = %ctx.subject,
                    correlation_id = %ctx.correlation_id,
                    delivery_count = ctx.delivery_count,
                    error = %error,
                    delay_secs = self.nak_delay.as_secs(),
                    "Invalid payload, nacking"
                );
            }
            _ => {
                error!(
                    subject = %ctx.subject,
                    correlation_id = %ctx.correlation_id,
                    delivery_count = ctx.delivery_count,
                    category = %category,
                    error = %error,
                    delay_secs = self.nak_delay.as_secs(),
                    "Handler failed, nacking"
                );
            }
        }

        Disposition::nak(self.nak_delay)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::JobPayload;
    use crate::publish::{FailingPublisher, RecordingPublisher};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Deserialize)]
    struct Echo {
        value: String,
        #[serde(default)]
        sleep_ms: u64,
        #[serde(default)]
        fail: bool,
        #[serde(default)]
        panic: bool,
    }

    impl JobPayload for Echo {}

    /// Publishes `{"value": ..}` on `echoed` after an optional sleep.
    #[derive(Default)]
    struct EchoHandler {
        finished: AtomicBool,
    }

    #[async_trait]
    impl JobHandler for EchoHandler {
        type Payload = Echo;

        async fn handle(&self, job: Echo, publish: &Publish) -> Result<(), JobError> {
            if job.sleep_ms > 0 {
                tokio::time::sleep(Duration::from_millis(job.sleep_ms)).await;
            }
            if job.panic {
                panic!("corrupt state for {}", job.value);
            }
            if job.fail {
                return Err(JobError::downstream("origin returned 503"));
            }
            publish.publish("echoed", &json!({"value": job.value})).await?;
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn ctx() -> MessageContext {
        MessageContext {
            subject: "echo".to_string(),
            correlation_id: "1".to_string(),
            delivery_count: 1,
        }
    }

    fn dispatcher(
        handler: Arc<EchoHandler>,
        publish: Publish,
        timeout: Duration,
    ) -> HandlerDispatcher<EchoHandler> {
        HandlerDispatcher::new(
            handler,
            publish,
            timeout,
            Duration::from_secs(30),
            RuntimeMetrics::new("TEST", "echo"),
        )
    }

    fn echo(value: &str, sleep_ms: u64, fail: bool) -> Echo {
        Echo {
            value: value.to_string(),
            sleep_ms,
            fail,
            panic: false,
        }
    }

    #[tokio::test]
    async fn test_success_acknowledges_after_publish() {
        let recorder = RecordingPublisher::new();
        let d = dispatcher(
            Arc::new(EchoHandler::default()),
            recorder.capability(),
            Duration::from_secs(5),
        );

        let disposition = d.dispatch(echo("hello", 0, false), &ctx()).await;

        assert_eq!(disposition, Disposition::Acknowledge);
        assert_eq!(
            recorder.events_on("echoed").await,
            vec![json!({"value": "hello"})]
        );
    }

    #[tokio::test]
    async fn test_handler_error_nacks_with_delay() {
        let recorder = RecordingPublisher::new();
        let d = dispatcher(
            Arc::new(EchoHandler::default()),
            recorder.capability(),
            Duration::from_secs(5),
        );

        let disposition = d.dispatch(echo("hello", 0, true), &ctx()).await;

        assert_eq!(disposition, Disposition::nak(Duration::from_secs(30)));
        assert_eq!(recorder.count().await, 0);
    }

    #[tokio::test]
    async fn test_publish_failure_nacks() {
        let d = dispatcher(
            Arc::new(EchoHandler::default()),
            Publish::new(Arc::new(FailingPublisher::new("no responders"))),
            Duration::from_secs(5),
        );

        let disposition = d.dispatch(echo("hello", 0, false), &ctx()).await;

        assert_eq!(disposition, Disposition::nak(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_nacks_and_drops_handler() {
        let handler = Arc::new(EchoHandler::default());
        let recorder = RecordingPublisher::new();
        let d = dispatcher(
            handler.clone(),
            recorder.capability(),
            Duration::from_secs(300),
        );

        let disposition = d.dispatch(echo("slow", 600_000, false), &ctx()).await;

        assert_eq!(disposition, Disposition::nak(Duration::from_secs(30)));

        // Even well past the handler's own sleep nothing completes.
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert!(!handler.finished.load(Ordering::SeqCst));
        assert_eq!(recorder.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_wins_tie() {
        let recorder = RecordingPublisher::new();
        let d = dispatcher(
            Arc::new(EchoHandler::default()),
            recorder.capability(),
            Duration::from_secs(1),
        );

        // The handler task may still finish in the same tick; its result is ignored.
        let disposition = d.dispatch(echo("tie", 1_000, false), &ctx()).await;

        assert_eq!(disposition, Disposition::nak(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_failed_maps_validation_to_nak() {
        let d = dispatcher(
            Arc::new(EchoHandler::default()),
            RecordingPublisher::new().capability(),
            Duration::from_secs(5),
        );

        let disposition = d.failed(JobError::missing_field("value"), &ctx());

        assert_eq!(disposition, Disposition::nak(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_panic_nacks_with_delay() {
        let recorder = RecordingPublisher::new();
        let d = dispatcher(
            Arc::new(EchoHandler::default()),
            recorder.capability(),
            Duration::from_secs(5),
        );
        let job = Echo {
            panic: true,
            ..echo("boom", 0, false)
        };

        let disposition = d.dispatch(job, &ctx()).await;

        assert_eq!(disposition, Disposition::nak(Duration::from_secs(30)));
        assert_eq!(recorder.count().await, 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic");
    }
}
