use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::senders::{MessageTransport, SenderError};
use crate::monitor::StatusNotifier;

pub const TEST_MESSAGE: &str = "Test notification from Uptime Monitor";

/// Turns transition events into messages, at most one down alert per target
/// per day.
pub struct Notifier {
    transport: Arc<dyn MessageTransport>,
    last_down: Mutex<HashMap<String, DateTime<Utc>>>,
}

/// A repeated down alert is suppressed only while both hold: the previous
/// one is less than 24 hours old and was sent on the same local calendar day.
fn is_suppressed(last_sent: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let recent = now - last_sent < Duration::hours(24);
    let same_day =
        last_sent.with_timezone(&Local).date_naive() == now.with_timezone(&Local).date_naive();
    recent && same_day
}

impl Notifier {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            transport,
            last_down: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_configured()
    }

    /// Returns `true` if a message was dispatched.
    pub async fn notify_down_at(&self, target_name: &str, now: DateTime<Utc>) -> bool {
        let last_sent = self.last_down.lock().await.get(target_name).copied();
        if let Some(last_sent) = last_sent {
            if is_suppressed(last_sent, now) {
                debug!(target_name, %last_sent, "Down alert suppressed.");
                return false;
            }
        }

        match self.transport.send(&format!("Resource down: {target_name}")).await {
            Ok(()) => {
                self.last_down
                    .lock()
                    .await
                    .insert(target_name.to_string(), now);
                info!(target_name, "Down alert sent.");
                true
            }
            Err(e) => {
                warn!(target_name, error = %e, "Failed to send down alert.");
                false
            }
        }
    }

    /// Returns `true` if a message was dispatched.
    pub async fn send_up_alert(&self, target_name: &str) -> bool {
        match self.transport.send(&format!("Resource up: {target_name}")).await {
            Ok(()) => {
                self.last_down.lock().await.remove(target_name);
                info!(target_name, "Up alert sent.");
                true
            }
            Err(e) => {
                warn!(target_name, error = %e, "Failed to send up alert.");
                false
            }
        }
    }

    pub async fn send_test_message(&self) -> Result<(), SenderError> {
        self.transport.send(TEST_MESSAGE).await
    }
}

#[async_trait]
impl StatusNotifier for Notifier {
    async fn notify_down(&self, target_name: &str) {
        self.notify_down_at(target_name, Utc::now()).await;
    }

    async fn notify_up(&self, target_name: &str) {
        self.send_up_alert(target_name).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingTransport {
        sent: StdMutex<Vec<String>>,
        failures_left: AtomicUsize,
    }

    impl RecordingTransport {
        fn failing_first(times: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(times),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageTransport for RecordingTransport {
        async fn send(&self, message: &str) -> Result<(), SenderError> {
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(SenderError::SendFailed("transport down".to_string()));
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn local(day: u32, hour: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2026, 6, day, hour, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn notifier(transport: &Arc<RecordingTransport>) -> Notifier {
        Notifier::new(transport.clone())
    }

    #[test]
    fn test_suppression_needs_both_conditions() {
        assert!(is_suppressed(local(10, 9), local(10, 20)));
        // Under 24 hours but across midnight.
        assert!(!is_suppressed(local(10, 23), local(11, 1)));
        // Over 24 hours.
        assert!(!is_suppressed(local(10, 12), local(11, 13)));
    }

    #[tokio::test]
    async fn test_repeat_down_same_day_sends_once() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        assert!(notifier.notify_down_at("API", local(10, 12)).await);
        assert!(!notifier.notify_down_at("API", local(10, 13)).await);
        assert_eq!(transport.sent(), ["Resource down: API"]);
    }

    #[tokio::test]
    async fn test_down_on_later_day_sends_again() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        assert!(notifier.notify_down_at("API", local(10, 12)).await);
        assert!(notifier.notify_down_at("API", local(11, 13)).await);
        assert!(!notifier.notify_down_at("API", local(11, 23)).await);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_targets_are_tracked_separately() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        assert!(notifier.notify_down_at("API", local(10, 12)).await);
        assert!(notifier.notify_down_at("DB", local(10, 12)).await);
        assert_eq!(transport.sent(), ["Resource down: API", "Resource down: DB"]);
    }

    #[tokio::test]
    async fn test_up_clears_suppression() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        assert!(notifier.notify_down_at("API", local(10, 12)).await);
        assert!(notifier.send_up_alert("API").await);
        assert!(notifier.notify_down_at("API", local(10, 13)).await);
        assert_eq!(
            transport.sent(),
            ["Resource down: API", "Resource up: API", "Resource down: API"]
        );
    }

    #[tokio::test]
    async fn test_failed_down_is_retried_next_time() {
        let transport = Arc::new(RecordingTransport::failing_first(1));
        let notifier = notifier(&transport);

        assert!(!notifier.notify_down_at("API", local(10, 12)).await);
        assert!(notifier.notify_down_at("API", local(10, 12)).await);
        assert_eq!(transport.sent(), ["Resource down: API"]);
    }

    #[tokio::test]
    async fn test_failed_up_keeps_suppression() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        assert!(notifier.notify_down_at("API", local(10, 12)).await);
        transport.failures_left.store(1, Ordering::SeqCst);
        assert!(!notifier.send_up_alert("API").await);
        assert!(!notifier.notify_down_at("API", local(10, 13)).await);
    }

    #[tokio::test]
    async fn test_send_test_message() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        notifier.send_test_message().await.unwrap();
        assert_eq!(transport.sent(), [TEST_MESSAGE]);
        assert!(notifier.is_configured());
    }
}
