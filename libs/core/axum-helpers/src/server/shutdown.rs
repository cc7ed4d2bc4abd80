//! Graceful shutdown coordination.
//!
//! The server and its cleanup task both need to observe the shutdown
//! signal: the server stops accepting connections, the cleanup task closes
//! database pools. [`ShutdownCoordinator`] broadcasts that signal to every
//! interested party.

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

/// Broadcasts the shutdown signal to the server and cleanup tasks.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, receiver)
    }

    /// Mark shutdown as requested, waking all waiters.
    pub fn signal(&self) {
        let _ = self.sender.send(true);
    }

    /// Wait until shutdown has been requested.
    pub async fn wait_for_signal(&self) {
        let mut receiver = self.sender.subscribe();
        while !*receiver.borrow() {
            if receiver.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Resolve when the process receives SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Wait for the OS shutdown signal, then notify the coordinator.
///
/// Pass this future to `axum::serve(...).with_graceful_shutdown(...)` so
/// the cleanup task spawned on the same coordinator runs exactly when the
/// server starts draining.
pub async fn coordinated_shutdown(coordinator: ShutdownCoordinator) {
    shutdown_signal().await;
    coordinator.signal();
}
