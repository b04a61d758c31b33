//! Liveness endpoint for K8s probes.

use axum::{http::StatusCode, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Health server for K8s probes.
///
/// `/health` answers `200 OK` for as long as the process serves HTTP; it does
/// not reflect message processing or queue connectivity.
pub struct HealthProbe {
    port: u16,
    metrics_handle: Option<PrometheusHandle>,
}

impl HealthProbe {
    /// Create a probe for `port` (0 picks an ephemeral port).
    pub fn new(port: u16) -> Self {
        Self {
            port,
            metrics_handle: None,
        }
    }

    /// Set the metrics handle for the /metrics endpoint.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(health_handler));

        if let Some(handle) = self.metrics_handle.clone() {
            router = router.route(
                "/metrics",
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        router
    }

    /// Bind the port and start serving in the background.
    ///
    /// Bind errors are returned to the caller; a worker treats them as fatal.
    pub async fn bind(self) -> Result<RunningProbe, std::io::Error> {
        let router = self.router();
        let addr = format!("0.0.0.0:{}", self.port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Health server listening");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        Ok(RunningProbe {
            local_addr,
            stop_tx,
            task,
        })
    }
}

/// A bound, serving health probe.
pub struct RunningProbe {
    local_addr: SocketAddr,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningProbe {
    /// Address the probe is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the server to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());

        match self.task.await {
            Ok(Ok(())) => info!("Health server stopped"),
            Ok(Err(e)) => error!(error = %e, "Health server exited with error"),
            Err(e) => error!(error = %e, "Health server task failed"),
        }
    }
}

/// Liveness probe handler.
async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
