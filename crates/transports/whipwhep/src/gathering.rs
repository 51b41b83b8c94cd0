//! ICE gathering synchronization
//!
//! Engines report gathering progress through callbacks that may fire more
//! than once and on their own tasks. Answers here are non-trickle, so the
//! negotiation must not continue until the candidate set is final. This module
//! turns the callback into a one-shot handle that exactly one task awaits.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Create a connected signal/wait pair for one session
pub fn gathering_channel() -> (GatheringSignal, GatheringWait) {
    let (tx, rx) = oneshot::channel();
    (
        GatheringSignal {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        GatheringWait { rx },
    )
}

/// Engine side of the pair; fired when gathering completes
///
/// Clones share the same underlying slot, so only the first `complete()`
/// across all clones has an effect.
#[derive(Debug, Clone)]
pub struct GatheringSignal {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl GatheringSignal {
    /// Mark gathering as complete
    ///
    /// Returns `true` if this call fulfilled the wait, `false` if it had
    /// already been fulfilled.
    pub fn complete(&self) -> bool {
        match self.tx.lock().take() {
            // Receiver may already be gone (request cancelled); still counts as fired
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }
}

/// Single-use handle resolved once gathering completes
#[derive(Debug)]
pub struct GatheringWait {
    rx: oneshot::Receiver<()>,
}

impl GatheringWait {
    /// Block until gathering completes
    ///
    /// Resolves immediately if the signal fired before this call.
    ///
    /// # Errors
    ///
    /// - `GatheringTimeout` if `timeout` elapses first
    /// - `GatheringAborted` if every signal was dropped without firing
    pub async fn wait(self, timeout: Option<Duration>) -> Result<()> {
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.rx)
                .await
                .map_err(|_| Error::GatheringTimeout(limit))?,
            None => self.rx.await,
        };

        outcome.map_err(|_| Error::GatheringAborted)
    }
}
