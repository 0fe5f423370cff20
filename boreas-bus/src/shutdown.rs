//! Cooperative shutdown coordination for dispatch tasks.
//!
//! Workers observe the signal at their suspension points; in-flight handler
//! invocations are never forcibly interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

/// Shutdown controller for coordinating cooperative task shutdown.
#[derive(Debug, Clone)]
pub(crate) struct ShutdownController {
    initiated: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownController {
    /// Creates a new shutdown controller.
    pub(crate) fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            initiated: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Initiates shutdown, notifying all subscribed tasks. Idempotent.
    pub(crate) fn initiate(&self) {
        if self
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Shutdown initiated");
            let _ = self.shutdown_tx.send(());
        }
    }

    /// Returns whether shutdown has been initiated.
    pub(crate) fn is_initiated(&self) -> bool {
        self.initiated.load(Ordering::SeqCst)
    }

    /// Returns a receiver for the shutdown signal.
    ///
    /// Only signals sent after subscribing are observed; tasks pair this with
    /// an [`is_initiated`](Self::is_initiated) check at loop boundaries.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_initiate_is_idempotent() {
        let controller = ShutdownController::new();
        assert!(!controller.is_initiated());

        controller.initiate();
        controller.initiate();
        assert!(controller.is_initiated());
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();

        let ctrl = controller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            ctrl.initiate();
        });

        let result = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(result.is_ok());
    }
}
