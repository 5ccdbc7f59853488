//! A fire-once shutdown signal shared across every task rooted at the
//! fabric, raised by the idempotent `KILL_ALL_BROADCAST` handler
//! (design §8, invariant 7).

use tokio::sync::watch;

/// Cheaply cloneable handle onto a single shutdown flag. `wait` resolves as
/// soon as `fire` is called, from any clone, any number of times.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Raise the signal. Safe to call more than once; only the first call
    /// has any effect.
    pub fn fire(&self) {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        });
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`ShutdownSignal::fire`] has been called. Returns
    /// immediately if it already has been.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
