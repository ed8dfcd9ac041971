//! Shutdown coordination for the long-running watch loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinates graceful shutdown across the application
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let coordinator = Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        };
        (coordinator, shutdown_rx)
    }

    /// Subscribe to shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger shutdown
    pub fn trigger_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Install a Ctrl-C handler that triggers shutdown.
    ///
    /// A second Ctrl-C exits the process immediately, even in the middle of a
    /// poll wait.
    pub fn listen_for_ctrl_c(&self) {
        let tx = self.shutdown_tx.clone();
        let requested = self.shutdown_requested.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            log::info!("Interrupt received; finishing after the current cycle");
            requested.store(true, Ordering::Release);
            let _ = tx.send(());

            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Second interrupt received; exiting");
                std::process::exit(130);
            }
        });
    }
}
