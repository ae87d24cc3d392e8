use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::reset::ResetSignal;
use super::scheduler::MonitorLoop;

/// Owns the monitor loop task. The loop can be started once per process;
/// later calls to `start` are no-ops.
pub struct MonitorSupervisor {
    reset: ResetSignal,
    pending: Mutex<Option<MonitorLoop>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorSupervisor {
    pub fn new(monitor: MonitorLoop) -> Self {
        Self {
            reset: monitor.reset_signal(),
            pending: Mutex::new(Some(monitor)),
            handle: Mutex::new(None),
        }
    }

    /// Spawns the loop. Returns `false` if it was already started.
    pub async fn start(&self) -> bool {
        let Some(monitor) = self.pending.lock().await.take() else {
            warn!("Monitor loop already started, ignoring start request.");
            return false;
        };
        *self.handle.lock().await = Some(tokio::spawn(monitor.run()));
        true
    }

    pub fn reset_signal(&self) -> ResetSignal {
        self.reset.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Aborts the loop and waits for the task to wind down.
    pub async fn shutdown(&self) {
        let Some(handle) = self.handle.lock().await.take() else {
            return;
        };
        handle.abort();
        let _ = handle.await;
        info!("Monitor loop stopped.");
    }
}
