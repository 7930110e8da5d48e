// src/crawl/cancel.rs
// =============================================================================
// Cancellation token for the per-seed timeout.
//
// When a crawl hits its wall-clock limit we cannot simply close the output
// channel - producers might still be mid-write. Instead every producer
// holds a clone of this token and checks it before writing to any sink,
// and the traversal loop selects on cancelled() to stop dispatching work.
// =============================================================================

use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable cancellation signal. Cancelling is one-way and idempotent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for returns immediately if the token is already cancelled
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
