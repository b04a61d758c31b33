//! Applies dispositions to the queue transport.

use crate::disposition::Disposition;
use crate::error::QueueError;
use crate::metrics::RuntimeMetrics;
use crate::transport::Delivery;
use tracing::{debug, warn};

/// Records dispositions for fetched messages.
///
/// Terminal dispositions consume the delivery, so a message cannot be
/// finalized twice. Lease renewal borrows it.
#[derive(Clone)]
pub struct AckController {
    metrics: RuntimeMetrics,
}

impl AckController {
    /// Create a controller reporting to `metrics`.
    pub fn new(metrics: RuntimeMetrics) -> Self {
        Self { metrics }
    }

    /// Extend the message's redelivery deadline.
    pub async fn extend<D: Delivery>(&self, delivery: &D) -> Result<(), QueueError> {
        match delivery.in_progress().await {
            Ok(()) => {
                debug!(
                    subject = %delivery.subject(),
                    correlation_id = %delivery.correlation_id(),
                    "Marked message in progress"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.disposition_failed("in_progress");
                Err(e)
            }
        }
    }

    /// Record `disposition` for `delivery`.
    ///
    /// `InProgressExtend` only renews the lease; the dropped delivery is then
    /// redelivered by the server once its ack-wait elapses.
    pub async fn apply<D: Delivery>(
        &self,
        delivery: D,
        disposition: Disposition,
    ) -> Result<(), QueueError> {
        let result = match disposition {
            Disposition::Acknowledge => delivery.ack().await,
            Disposition::NegativeAcknowledge { delay } => delivery.nak(delay).await,
            Disposition::InProgressExtend => {
                warn!(
                    subject = %delivery.subject(),
                    correlation_id = %delivery.correlation_id(),
                    "Non-terminal disposition applied, message left for ack-wait redelivery"
                );
                return self.extend(&delivery).await;
            }
        };

        match result {
            Ok(()) => {
                debug!(
                    subject = %delivery.subject(),
                    correlation_id = %delivery.correlation_id(),
                    disposition = %disposition,
                    "Disposition recorded"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.disposition_failed(disposition.as_str());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDelivery, Recorded};
    use std::time::Duration;

    fn controller() -> AckController {
        AckController::new(RuntimeMetrics::new("TEST", "test-job"))
    }

    #[tokio::test]
    async fn test_acknowledge() {
        let delivery = FakeDelivery::new("jobs", b"{}");
        let log = delivery.log();

        controller()
            .apply(delivery, Disposition::Acknowledge)
            .await
            .unwrap();

        assert_eq!(log.entries(), vec![Recorded::Ack]);
    }

    #[tokio::test]
    async fn test_negative_acknowledge_passes_delay() {
        let delivery = FakeDelivery::new("jobs", b"{}");
        let log = delivery.log();

        controller()
            .apply(delivery, Disposition::nak(Duration::from_secs(30)))
            .await
            .unwrap();

        assert_eq!(log.entries(), vec![Recorded::Nak(Duration::from_secs(30))]);
    }

    #[tokio::test]
    async fn test_extend_then_acknowledge() {
        let delivery = FakeDelivery::new("jobs", b"{}");
        let log = delivery.log();
        let acks = controller();

        acks.extend(&delivery).await.unwrap();
        acks.apply(delivery, Disposition::Acknowledge).await.unwrap();

        assert_eq!(log.entries(), vec![Recorded::InProgress, Recorded::Ack]);
        assert_eq!(log.terminal_count(), 1);
    }

    #[tokio::test]
    async fn test_in_progress_extend_is_not_terminal() {
        let delivery = FakeDelivery::new("jobs", b"{}");
        let log = delivery.log();

        controller()
            .apply(delivery, Disposition::InProgressExtend)
            .await
            .unwrap();

        assert_eq!(log.entries(), vec![Recorded::InProgress]);
        assert_eq!(log.terminal_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let delivery = FakeDelivery::new("jobs", b"{}").failing_acks();

        let err = controller()
            .apply(delivery, Disposition::Acknowledge)
            .await
            .unwrap_err();

        assert!(matches!(err, QueueError::Ack { operation: "ack", .. }));
    }
}
