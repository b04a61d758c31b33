//! Process entry point shared by all job binaries.

use crate::config::RuntimeConfig;
use crate::handler::JobHandler;
use crate::health::HealthProbe;
use crate::metrics::init_metrics;
use crate::nats::consumer::NatsSource;
use crate::nats::producer::NatsPublisher;
use crate::publish::Publish;
use crate::runtime::ConsumerRuntime;
use crate::shutdown::ShutdownCoordinator;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::{info, warn};

/// Run `handler` as a JetStream worker until SIGTERM/SIGINT.
///
/// Configuration comes from the environment (see [`RuntimeConfig::from_env`]).
/// Returns an error only for fatal startup failures: bad configuration, the
/// health port already in use, NATS unreachable, or the stream missing.
pub async fn run_consumer<H: JobHandler>(handler: H, job_name: &str) -> Result<()> {
    let config = RuntimeConfig::from_env(job_name)
        .wrap_err_with(|| format!("Invalid configuration for job '{}'", job_name))?;

    run_with_shutdown(handler, config, ShutdownCoordinator::new()).await
}

/// Run `handler` with an explicit config and shutdown coordinator.
///
/// Besides OS signals, calling [`ShutdownCoordinator::begin_drain`] on
/// `coordinator` stops the worker after the in-flight batch.
pub async fn run_with_shutdown<H: JobHandler>(
    handler: H,
    config: RuntimeConfig,
    coordinator: ShutdownCoordinator,
) -> Result<()> {
    info!(
        job = %config.job_name,
        stream = %config.stream_name,
        consumer = %config.consumer_name,
        handler = handler.name(),
        "Starting worker"
    );

    let mut probe = HealthProbe::new(config.health_port);
    match init_metrics() {
        Ok(handle) => probe = probe.with_metrics(handle),
        Err(e) => warn!(error = %e, "Metrics recorder not installed, /metrics disabled"),
    }
    let probe = probe
        .bind()
        .await
        .wrap_err_with(|| format!("Failed to bind health port {}", config.health_port))?;

    info!(url = %config.nats_url, "Connecting to NATS...");
    let client = async_nats::connect(&config.nats_url)
        .await
        .wrap_err_with(|| format!("Failed to connect to NATS at {}", config.nats_url))?;
    info!("Connected to NATS successfully");

    let jetstream = async_nats::jetstream::new(client.clone());
    let source = NatsSource::bind(&jetstream, &config)
        .await
        .wrap_err("Failed to bind durable consumer")?;
    let publish = Publish::new(Arc::new(NatsPublisher::new(jetstream)));

    let runtime = ConsumerRuntime::new(source, Arc::new(handler), publish, &config);

    let listener = coordinator.listen();
    runtime.run(coordinator.token()).await;
    let _ = listener.await;

    info!("Draining NATS connection");
    if let Err(e) = client.drain().await {
        warn!(error = %e, "Failed to drain NATS connection");
    }

    probe.stop().await;
    coordinator.mark_stopped();

    info!("Shutdown complete");
    Ok(())
}
