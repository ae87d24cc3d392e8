use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Creates a single-slot reset latch.
///
/// At most one reset is ever pending: triggers while one is already waiting
/// are dropped, and triggering never blocks.
pub fn reset_channel() -> (ResetSignal, ResetListener) {
    let (tx, rx) = mpsc::channel(1);
    (ResetSignal { tx }, ResetListener { rx, closed: false })
}

/// Write side, handed to whoever changes settings or targets.
#[derive(Debug, Clone)]
pub struct ResetSignal {
    tx: mpsc::Sender<()>,
}

impl ResetSignal {
    /// Returns `false` when the reset was dropped because one is already
    /// pending or the loop is gone.
    pub fn trigger(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("Reset already pending, dropping duplicate.");
                false
            }
            Err(TrySendError::Closed(())) => {
                debug!("Monitor loop is not listening for resets.");
                false
            }
        }
    }
}

/// Read side, owned by the monitor loop.
#[derive(Debug)]
pub struct ResetListener {
    rx: mpsc::Receiver<()>,
    closed: bool,
}

impl ResetListener {
    /// Sleeps for `interval` or until a reset arrives, whichever is first.
    /// A reset latched before the call returns immediately.
    ///
    /// Returns `true` when woken by a reset.
    pub async fn sleep(&mut self, interval: Duration) -> bool {
        if self.closed {
            tokio::time::sleep(interval).await;
            return false;
        }

        tokio::select! {
            biased;
            received = self.rx.recv() => match received {
                Some(()) => true,
                None => {
                    self.closed = true;
                    tokio::time::sleep(interval).await;
                    false
                }
            },
            _ = tokio::time::sleep(interval) => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn take_pending(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}
