use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::reset::{ResetListener, ResetSignal, reset_channel};
use super::status::{StatusTracker, Transition};
use super::{CheckSink, StatusNotifier, TargetRegistry};
use crate::db::StorageError;
use crate::probes::{DefaultProbeFactory, ProbeFactory};
use crate::settings::SettingsHandle;

/// Counters for one completed cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub probed: usize,
    pub failed: usize,
    pub persist_errors: usize,
    pub transitions: usize,
}

/// The long-running scheduler.
///
/// One cycle is FETCHING (read targets), then for every target in order
/// PROBING, PERSISTING and, for subscribed targets, EVALUATING. The loop then
/// SLEEPS until the interval elapses or a reset arrives. A failed fetch skips
/// probing and backs off for the full interval.
pub struct MonitorLoop {
    registry: Arc<dyn TargetRegistry>,
    sink: Arc<dyn CheckSink>,
    notifier: Arc<dyn StatusNotifier>,
    probes: Arc<dyn ProbeFactory>,
    settings: SettingsHandle,
    reset_signal: ResetSignal,
    reset: ResetListener,
    statuses: StatusTracker,
}

impl MonitorLoop {
    pub fn new(
        registry: Arc<dyn TargetRegistry>,
        sink: Arc<dyn CheckSink>,
        notifier: Arc<dyn StatusNotifier>,
        settings: SettingsHandle,
    ) -> Self {
        let (reset_signal, reset) = reset_channel();
        Self {
            registry,
            sink,
            notifier,
            probes: Arc::new(DefaultProbeFactory),
            settings,
            reset_signal,
            reset,
            statuses: StatusTracker::new(),
        }
    }

    pub fn with_probe_factory(mut self, probes: Arc<dyn ProbeFactory>) -> Self {
        self.probes = probes;
        self
    }

    /// A handle that shortens the loop's current (or next) sleep.
    pub fn reset_signal(&self) -> ResetSignal {
        self.reset_signal.clone()
    }

    pub async fn run(mut self) {
        info!("Monitor loop started.");
        loop {
            // Re-read every iteration so API changes apply on the next cycle.
            let interval = self.settings.polling_interval().await;

            match self.run_cycle().await {
                Ok(report) => {
                    debug!(
                        probed = report.probed,
                        failed = report.failed,
                        persist_errors = report.persist_errors,
                        transitions = report.transitions,
                        "Monitor cycle finished."
                    );
                }
                Err(e) => {
                    error!(
                        error = %e,
                        retry_in_seconds = interval.as_secs(),
                        "Failed to fetch targets. Backing off."
                    );
                    tokio::time::sleep(interval).await;
                    continue;
                }
            }

            if self.reset.sleep(interval).await {
                debug!("Monitor sleep cut short by reset.");
            }
        }
    }

    /// Runs one fetch/probe/persist/evaluate pass. Only a registry failure is
    /// returned; probe and persistence failures are counted and logged.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, StorageError> {
        let targets = self.registry.get_targets().await?;
        let mut report = CycleReport::default();

        // Forget targets that were unsubscribed, renamed or deleted so a
        // later subscription starts from the assumed-up state again.
        let subscribed: HashSet<&str> = targets
            .iter()
            .filter(|t| t.subscribed)
            .map(|t| t.name.as_str())
            .collect();
        self.statuses.retain(&subscribed);

        for target in &targets {
            let probe = self.probes.probe_for(target);
            let result = probe.check().await;
            report.probed += 1;
            if !result.success {
                report.failed += 1;
                debug!(
                    target_name = %target.name,
                    kind = %result.kind,
                    message = result.message.as_deref().unwrap_or_default(),
                    "Check failed."
                );
            }

            if let Err(e) = self.sink.save_check(&result).await {
                report.persist_errors += 1;
                error!(target_name = %target.name, error = %e, "Failed to save check result.");
            }

            if !target.subscribed {
                continue;
            }

            match self.statuses.observe(&target.name, result.success) {
                Some(Transition::Down) => {
                    warn!(target_name = %target.name, "Target went down.");
                    self.notifier.notify_down(&target.name).await;
                    report.transitions += 1;
                }
                Some(Transition::Up) => {
                    info!(target_name = %target.name, "Target recovered.");
                    self.notifier.notify_up(&target.name).await;
                    report.transitions += 1;
                }
                None => {}
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::CheckResult;
    use crate::probes::testing::ScriptedProbes;
    use crate::settings::Settings;
    use crate::targets::{Target, TargetKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    struct FakeRegistry {
        targets: Mutex<Vec<Target>>,
        failures_left: AtomicUsize,
        fetches: Option<mpsc::UnboundedSender<Instant>>,
    }

    impl FakeRegistry {
        fn new(targets: Vec<Target>) -> Self {
            Self {
                targets: Mutex::new(targets),
                failures_left: AtomicUsize::new(0),
                fetches: None,
            }
        }

        fn failing_first(mut self, times: usize) -> Self {
            self.failures_left = AtomicUsize::new(times);
            self
        }

        fn recording(mut self, tx: mpsc::UnboundedSender<Instant>) -> Self {
            self.fetches = Some(tx);
            self
        }

        fn set_subscribed(&self, name: &str, subscribed: bool) {
            for target in self.targets.lock().unwrap().iter_mut() {
                if target.name == name {
                    target.subscribed = subscribed;
                }
            }
        }
    }

    #[async_trait]
    impl TargetRegistry for FakeRegistry {
        async fn get_targets(&self) -> Result<Vec<Target>, StorageError> {
            if let Some(tx) = &self.fetches {
                let _ = tx.send(Instant::now());
            }
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(self.targets.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        failing_label: Option<String>,
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CheckSink for FakeSink {
        async fn save_check(&self, result: &CheckResult) -> Result<(), StorageError> {
            if self.failing_label.as_deref() == Some(result.target.as_str()) {
                return Err(StorageError::Database(sqlx::Error::PoolClosed));
            }
            self.saved.lock().unwrap().push(result.target.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<(Transition, String)>>,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<(Transition, String)> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusNotifier for RecordingNotifier {
        async fn notify_down(&self, target_name: &str) {
            self.events
                .lock()
                .unwrap()
                .push((Transition::Down, target_name.to_string()));
        }

        async fn notify_up(&self, target_name: &str) {
            self.events
                .lock()
                .unwrap()
                .push((Transition::Up, target_name.to_string()));
        }
    }

    fn target(id: i64, name: &str, subscribed: bool) -> Target {
        Target {
            id,
            name: name.to_string(),
            address: format!("https://{name}.example.com"),
            kind: TargetKind::Http,
            username: None,
            password: None,
            subscribed,
        }
    }

    struct Harness {
        monitor: MonitorLoop,
        registry: Arc<FakeRegistry>,
        probes: Arc<ScriptedProbes>,
        sink: Arc<FakeSink>,
        notifier: Arc<RecordingNotifier>,
        settings: SettingsHandle,
    }

    fn harness(registry: FakeRegistry, sink: FakeSink) -> Harness {
        let registry = Arc::new(registry);
        let probes = Arc::new(ScriptedProbes::default());
        let sink = Arc::new(sink);
        let notifier = Arc::new(RecordingNotifier::default());
        let settings = SettingsHandle::new(Settings {
            frequency: 60,
            timeframe_hours: 24,
        });
        let monitor = MonitorLoop::new(
            registry.clone(),
            sink.clone(),
            notifier.clone(),
            settings.clone(),
        )
        .with_probe_factory(probes.clone());
        Harness {
            monitor,
            registry,
            probes,
            sink,
            notifier,
            settings,
        }
    }

    #[tokio::test]
    async fn test_first_failure_notifies_down_for_subscribed_only() {
        let registry = FakeRegistry::new(vec![
            target(1, "watched", true),
            target(2, "ignored", false),
            target(3, "healthy", true),
        ]);
        let mut h = harness(registry, FakeSink::default());
        h.probes.script("watched", &[false]);
        h.probes.script("ignored", &[false]);

        let report = h.monitor.run_cycle().await.unwrap();

        assert_eq!(report.probed, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.transitions, 1);
        assert_eq!(
            h.notifier.events(),
            [(Transition::Down, "watched".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failure_streak_notifies_once_then_recovers() {
        let registry = FakeRegistry::new(vec![target(1, "db", true)]);
        let mut h = harness(registry, FakeSink::default());
        h.probes.script("db", &[false, false, false, false, true, true]);

        for _ in 0..6 {
            h.monitor.run_cycle().await.unwrap();
        }

        assert_eq!(
            h.notifier.events(),
            [
                (Transition::Down, "db".to_string()),
                (Transition::Up, "db".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_resubscribed_target_alerts_on_next_failure() {
        let registry = FakeRegistry::new(vec![target(1, "db", true)]);
        let mut h = harness(registry, FakeSink::default());
        h.probes.script("db", &[false, true, false, false]);

        h.monitor.run_cycle().await.unwrap();

        h.registry.set_subscribed("db", false);
        h.monitor.run_cycle().await.unwrap();
        h.monitor.run_cycle().await.unwrap();
        assert_eq!(h.monitor.statuses.last_status("db"), None);

        h.registry.set_subscribed("db", true);
        h.monitor.run_cycle().await.unwrap();

        assert_eq!(
            h.notifier.events(),
            [
                (Transition::Down, "db".to_string()),
                (Transition::Down, "db".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_persist_failure_does_not_block_later_targets() {
        let registry = FakeRegistry::new(vec![target(1, "a", false), target(2, "b", false)]);
        let sink = FakeSink {
            failing_label: Some("https://a.example.com".to_string()),
            ..Default::default()
        };
        let mut h = harness(registry, sink);

        let report = h.monitor.run_cycle().await.unwrap();

        assert_eq!(report.persist_errors, 1);
        assert_eq!(h.probes.probed(), ["a", "b"]);
        assert_eq!(
            *h.sink.saved.lock().unwrap(),
            ["https://b.example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_registry_failure_probes_nothing() {
        let registry = FakeRegistry::new(vec![target(1, "a", true)]).failing_first(1);
        let mut h = harness(registry, FakeSink::default());

        assert!(h.monitor.run_cycle().await.is_err());
        assert_eq!(h.probes.invocations(), 0);
        assert!(h.sink.saved.lock().unwrap().is_empty());

        assert_eq!(h.monitor.run_cycle().await.unwrap().probed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_sleep_starts_next_cycle_early() {
        let (tx, mut fetches) = mpsc::unbounded_channel();
        let registry = FakeRegistry::new(vec![target(1, "a", false)]).recording(tx);
        let h = harness(registry, FakeSink::default());
        let reset = h.monitor.reset_signal();

        let start = Instant::now();
        let handle = tokio::spawn(h.monitor.run());

        assert_eq!(fetches.recv().await.unwrap() - start, Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(reset.trigger());
        assert_eq!(fetches.recv().await.unwrap() - start, Duration::from_secs(10));
        assert_eq!(fetches.recv().await.unwrap() - start, Duration::from_secs(70));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_before_sleep_is_latched() {
        let (tx, mut fetches) = mpsc::unbounded_channel();
        let registry = FakeRegistry::new(vec![target(1, "a", false)]).recording(tx);
        let h = harness(registry, FakeSink::default());
        let reset = h.monitor.reset_signal();
        assert!(reset.trigger());
        assert!(!reset.trigger());

        let start = Instant::now();
        let handle = tokio::spawn(h.monitor.run());

        assert_eq!(fetches.recv().await.unwrap() - start, Duration::ZERO);
        assert_eq!(fetches.recv().await.unwrap() - start, Duration::ZERO);
        assert_eq!(fetches.recv().await.unwrap() - start, Duration::from_secs(60));
        assert_eq!(h.probes.invocations(), 3);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_failure_backs_off_full_interval() {
        let (tx, mut fetches) = mpsc::unbounded_channel();
        let registry = FakeRegistry::new(vec![target(1, "a", true)])
            .failing_first(1)
            .recording(tx);
        let h = harness(registry, FakeSink::default());
        let reset = h.monitor.reset_signal();
        let probes = h.probes.clone();

        let start = Instant::now();
        let handle = tokio::spawn(h.monitor.run());

        assert_eq!(fetches.recv().await.unwrap() - start, Duration::ZERO);
        assert_eq!(probes.invocations(), 0);

        // A reset during the backoff does not shorten it; it stays latched
        // for the next regular sleep.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(reset.trigger());

        assert_eq!(fetches.recv().await.unwrap() - start, Duration::from_secs(60));
        assert_eq!(fetches.recv().await.unwrap() - start, Duration::from_secs(60));
        assert_eq!(probes.invocations(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_reread_every_iteration() {
        let (tx, mut fetches) = mpsc::unbounded_channel();
        let registry = FakeRegistry::new(vec![target(1, "a", false)]).recording(tx);
        let h = harness(registry, FakeSink::default());
        let settings = h.settings.clone();

        let start = Instant::now();
        let handle = tokio::spawn(h.monitor.run());

        assert_eq!(fetches.recv().await.unwrap() - start, Duration::ZERO);
        settings
            .replace(Settings {
                frequency: 5,
                timeframe_hours: 24,
            })
            .await;

        // The sleep already in progress keeps its interval.
        assert_eq!(fetches.recv().await.unwrap() - start, Duration::from_secs(60));
        assert_eq!(fetches.recv().await.unwrap() - start, Duration::from_secs(65));

        handle.abort();
    }
}
