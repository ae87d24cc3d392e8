use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const DEFAULT_FREQUENCY_SECONDS: u64 = 60;
pub const DEFAULT_TIMEFRAME_HOURS: u32 = 24;
pub const MAX_FREQUENCY_SECONDS: u64 = 24 * 60 * 60;
pub const MAX_TIMEFRAME_HOURS: u32 = 366 * 24;

/// Runtime settings editable through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Polling interval in seconds.
    pub frequency: u64,
    /// Width of the history window returned by `/checks`.
    pub timeframe_hours: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY_SECONDS,
            timeframe_hours: DEFAULT_TIMEFRAME_HOURS,
        }
    }
}

impl Settings {
    /// Clamped to `1..=MAX_FREQUENCY_SECONDS`, so a zero frequency cannot
    /// spin the loop.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.frequency.clamp(1, MAX_FREQUENCY_SECONDS))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_FREQUENCY_SECONDS).contains(&self.frequency) {
            return Err(format!(
                "frequency must be between 1 and {MAX_FREQUENCY_SECONDS} seconds"
            ));
        }
        if !(1..=MAX_TIMEFRAME_HOURS).contains(&self.timeframe_hours) {
            return Err(format!(
                "timeframeHours must be between 1 and {MAX_TIMEFRAME_HOURS} hours"
            ));
        }
        Ok(())
    }
}

/// Process-wide settings shared by the API (writer) and the monitor loop
/// (reader).
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub async fn snapshot(&self) -> Settings {
        *self.inner.read().await
    }

    pub async fn replace(&self, settings: Settings) {
        *self.inner.write().await = settings;
    }

    pub async fn polling_interval(&self) -> Duration {
        self.inner.read().await.polling_interval()
    }
}
