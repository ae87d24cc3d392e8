//! The monitor loop and the collaborator contracts it runs against.
//!
//! Each cycle fetches the target list, probes every target in order,
//! persists each result as soon as it exists and, for subscribed targets,
//! turns up/down transitions into notifications. Between cycles the loop
//! sleeps for the configured interval or until a reset arrives.
use async_trait::async_trait;

use crate::db::StorageError;
use crate::probes::CheckResult;
use crate::targets::Target;

pub mod reset;
pub mod scheduler;
pub mod status;
pub mod supervisor;

pub use reset::{ResetListener, ResetSignal, reset_channel};
pub use scheduler::{CycleReport, MonitorLoop};
pub use status::{StatusTracker, Transition};
pub use supervisor::MonitorSupervisor;

/// Source of the configured targets, in the order they are probed.
#[async_trait]
pub trait TargetRegistry: Send + Sync {
    async fn get_targets(&self) -> Result<Vec<Target>, StorageError>;
}

/// Destination for check results.
#[async_trait]
pub trait CheckSink: Send + Sync {
    async fn save_check(&self, result: &CheckResult) -> Result<(), StorageError>;
}

/// Receives transition events for subscribed targets.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify_down(&self, target_name: &str);
    async fn notify_up(&self, target_name: &str);
}
