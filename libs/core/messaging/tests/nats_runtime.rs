//! End-to-end tests against a real JetStream server.
//!
//! Run with `cargo test -p messaging --features nats -- --ignored`.

use async_trait::async_trait;
use futures::StreamExt;
use messaging::nats::run_with_shutdown;
use messaging::{
    require_non_empty, JobError, JobHandler, JobPayload, Publish, RuntimeConfig,
    ShutdownCoordinator, ShutdownState,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use test_utils::TestNats;

const STREAM: &str = "keda-jobs-events";

#[derive(Debug, Deserialize)]
struct Greeting {
    #[serde(default)]
    name: String,
}

impl JobPayload for Greeting {
    fn validate(&self) -> Result<(), JobError> {
        require_non_empty("name", &self.name)
    }
}

struct GreetHandler;

#[async_trait]
impl JobHandler for GreetHandler {
    type Payload = Greeting;

    async fn handle(&self, job: Greeting, publish: &Publish) -> Result<(), JobError> {
        publish
            .publish("greeted", &json!({"greeting": format!("hello {}", job.name)}))
            .await
    }

    fn name(&self) -> &'static str {
        "greet"
    }
}

fn config(nats: &TestNats) -> RuntimeConfig {
    RuntimeConfig::new("greet")
        .with_nats_url(nats.connection_string())
        .with_health_port(0)
        .with_fetch_wait(Duration::from_secs(1))
        .with_nak_delay(Duration::from_secs(1))
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_worker_handles_message_and_publishes() {
    let nats = TestNats::new().await;
    nats.create_stream(STREAM, &["greet", "greeted"]).await;

    let mut greeted = nats.client().subscribe("greeted").await.unwrap();
    nats.publish("greet", r#"{"name": "ada"}"#).await;

    let coordinator = ShutdownCoordinator::new();
    let worker = tokio::spawn(run_with_shutdown(
        GreetHandler,
        config(&nats),
        coordinator.clone(),
    ));

    let event = tokio::time::timeout(Duration::from_secs(15), greeted.next())
        .await
        .expect("Timeout waiting for published event")
        .expect("No event received");
    let body: serde_json::Value = serde_json::from_slice(&event.payload).unwrap();
    assert_eq!(body, json!({"greeting": "hello ada"}));

    coordinator.begin_drain();
    tokio::time::timeout(Duration::from_secs(15), worker)
        .await
        .expect("Worker should stop after drain")
        .unwrap()
        .unwrap();
    assert_eq!(coordinator.state(), ShutdownState::Stopped);

    // Acked: nothing left pending on the durable consumer.
    let stream = nats.jetstream().get_stream(STREAM).await.unwrap();
    let mut consumer = stream
        .get_consumer::<async_nats::jetstream::consumer::pull::Config>("greet-consumer")
        .await
        .unwrap();
    let info = consumer.info().await.unwrap();
    assert_eq!(info.num_pending, 0);
    assert_eq!(info.num_ack_pending, 0);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_invalid_payload_is_redelivered() {
    let nats = TestNats::new().await;
    nats.create_stream(STREAM, &["greet", "greeted"]).await;
    nats.publish("greet", r#"{"nickname": "ada"}"#).await;

    let coordinator = ShutdownCoordinator::new();
    let worker = tokio::spawn(run_with_shutdown(
        GreetHandler,
        config(&nats),
        coordinator.clone(),
    ));

    // Nak delay is 1s, so within a few seconds the message is delivered again.
    tokio::time::sleep(Duration::from_secs(4)).await;
    coordinator.begin_drain();
    worker.await.unwrap().unwrap();

    let stream = nats.jetstream().get_stream(STREAM).await.unwrap();
    let mut consumer = stream
        .get_consumer::<async_nats::jetstream::consumer::pull::Config>("greet-consumer")
        .await
        .unwrap();
    let info = consumer.info().await.unwrap();
    assert!(info.num_redelivered >= 1);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_missing_stream_is_fatal() {
    let nats = TestNats::new().await;

    let result = run_with_shutdown(GreetHandler, config(&nats), ShutdownCoordinator::new()).await;

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Stream not found"));
}
