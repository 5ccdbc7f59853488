//! Correlation-id-indexed response buffer: blocking wakeups via
//! `tokio::sync::oneshot`, never a busy-poll loop (spec §9, design note 1).

use agora_core::ids::CorrelationId;
use agora_fabric::ShutdownSignal;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("response buffer dropped before the reply arrived")]
    Cancelled,
    #[error("simulation shut down while awaiting a reply")]
    ShutDown,
}

/// Holds one pending `oneshot::Sender` per outstanding correlation id. An
/// agent registers before sending its `*_TRANSFER`/`*_REQ` packet, then
/// awaits the matching receiver; [`ResponseBuffer::fulfill`] is called from
/// the packet-dispatch loop when the ACK with that correlation id arrives.
#[derive(Debug)]
pub struct ResponseBuffer {
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<serde_json::Value>>>,
    shutdown: ShutdownSignal,
}

impl ResponseBuffer {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Register a wait for `correlation_id`'s reply, and race it against a
    /// global shutdown so a `KILL_ALL_BROADCAST` unblocks every outstanding
    /// waiter instead of hanging them forever.
    pub async fn wait(&self, correlation_id: CorrelationId) -> Result<serde_json::Value, WaitError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);

        tokio::select! {
            result = rx => result.map_err(|_| WaitError::Cancelled),
            _ = self.shutdown.wait() => {
                self.pending.lock().await.remove(&correlation_id);
                Err(WaitError::ShutDown)
            }
        }
    }

    /// Deliver `payload` to whoever is waiting on `correlation_id`, if
    /// anyone still is. Silently drops the payload if nobody is waiting
    /// (a duplicate or late ACK).
    pub async fn fulfill(&self, correlation_id: CorrelationId, payload: serde_json::Value) {
        if let Some(tx) = self.pending.lock().await.remove(&correlation_id) {
            let _ = tx.send(payload);
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fulfill_wakes_the_matching_waiter() {
        let buffer = ResponseBuffer::new(ShutdownSignal::new());
        let correlation_id = CorrelationId::new();
        let wait_fut = buffer.wait(correlation_id);
        let fulfill_fut = buffer.fulfill(correlation_id, serde_json::json!({"success": true}));
        let (result, _) = tokio::join!(wait_fut, fulfill_fut);
        assert_eq!(result.unwrap()["success"], true);
    }

    #[tokio::test]
    async fn shutdown_cancels_outstanding_waiters() {
        let shutdown = ShutdownSignal::new();
        let buffer = ResponseBuffer::new(shutdown.clone());
        let correlation_id = CorrelationId::new();

        let wait_fut = buffer.wait(correlation_id);
        shutdown.fire();
        let result = wait_fut.await;
        assert!(matches!(result, Err(WaitError::ShutDown)));
    }
}
