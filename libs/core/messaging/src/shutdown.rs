use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Lifecycle of a worker process.
///
/// Transitions are monotonic: `Running → Draining → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Fetching and processing normally.
    Running,
    /// Termination requested; the in-flight batch finishes, nothing new is fetched.
    Draining,
    /// Fetch loop exited and resources are released.
    Stopped,
}

/// Shutdown coordinator that manages graceful worker shutdown.
///
/// This handles:
/// - Signal reception (SIGTERM, SIGINT)
/// - Handing out cancellation tokens to the fetch loop
/// - Shutdown state tracking
#[derive(Clone)]
pub struct ShutdownCoordinator {
    tx: Arc<watch::Sender<ShutdownState>>,
}

impl ShutdownCoordinator {
    /// Create a coordinator in the `Running` state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ShutdownState::Running);
        Self { tx: Arc::new(tx) }
    }

    /// Token observed by the fetch loop.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ShutdownState {
        *self.tx.borrow()
    }

    /// Check if shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.state() != ShutdownState::Running
    }

    /// Move from `Running` to `Draining`.
    ///
    /// Returns `true` if this call initiated the drain; later calls are no-ops.
    pub fn begin_drain(&self) -> bool {
        let initiated = self.tx.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        });

        if initiated {
            info!("Initiating graceful shutdown, draining in-flight batch");
        }
        initiated
    }

    /// Record that the fetch loop exited and resources were released.
    pub fn mark_stopped(&self) {
        self.tx.send_if_modified(|state| {
            if *state == ShutdownState::Stopped {
                false
            } else {
                *state = ShutdownState::Stopped;
                true
            }
        });
    }

    /// Wait for SIGTERM or SIGINT, then begin draining.
    ///
    /// Also returns if shutdown was initiated some other way.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let token = self.token();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C)");
            },
            _ = terminate => {
                info!("Received SIGTERM");
            },
            _ = token.cancelled() => {
                return;
            },
        }

        self.begin_drain();
    }

    /// Spawn the signal listener.
    pub fn listen(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.wait_for_signal().await })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation token consulted between fetch cycles.
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<ShutdownState>,
}

impl ShutdownToken {
    /// Whether draining has begun.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() != ShutdownState::Running
    }

    /// Resolve once draining has begun (or the coordinator is gone).
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|state| *state != ShutdownState::Running).await;
    }
}
