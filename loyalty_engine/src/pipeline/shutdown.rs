use std::sync::Arc;

use log::*;
use tokio::sync::watch;

/// A process-wide cancellation signal.
///
/// Every clone observes the same signal. Once triggered it stays triggered.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender: Arc::new(sender), receiver }
    }

    pub fn trigger(&self) {
        if !self.sender.send_replace(true) {
            info!("🔄️ Shutdown signal triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal has been triggered. Resolves immediately if it already has been.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so this can only return once the value is true
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}
