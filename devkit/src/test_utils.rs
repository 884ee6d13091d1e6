/*!
Test Harness pour Symbion Sentinel

Assemble un store, un notifier enregistreur, un probe et un hôte scriptés,
et les moniteurs qui les utilisent. Fournit des assertions sur les alertes
envoyées et l'historique enregistré.
*/

use crate::host_stub::ScriptedHost;
use crate::notifier_stub::RecordingNotifier;
use crate::probe_stub::ScriptedProbe;
use crate::store_stub::FlakyStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use symbion_sentinel::classify::Thresholds;
use symbion_sentinel::models::{Outcome, SystemSample, TestResult, TestTarget};
use symbion_sentinel::report::{DigestReporter, Reporter};
use symbion_sentinel::sampler::Sampler;
use symbion_sentinel::{ScheduleSettings, Scheduler, SystemMonitor, TargetMonitor};

pub const HOST_LABEL: &str = "test-host";

pub struct TestHarness {
    pub store: Arc<FlakyStore>,
    pub notifier: RecordingNotifier,
    pub probe: Arc<ScriptedProbe>,
    pub host: Arc<ScriptedHost>,
    pub target_monitor: Arc<TargetMonitor>,
    pub system_monitor: Arc<SystemMonitor>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_probe(ScriptedProbe::new())
    }

    /// Probes qui prennent `delay` chacun
    pub fn with_probe_delay(delay: Duration) -> Self {
        Self::with_probe(ScriptedProbe::new().with_delay(delay))
    }

    fn with_probe(probe: ScriptedProbe) -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        let store = Arc::new(FlakyStore::new());
        let notifier = RecordingNotifier::new();
        let probe = Arc::new(probe);
        let host = Arc::new(ScriptedHost::new());

        let target_monitor = Arc::new(TargetMonitor::new(
            probe.clone(),
            store.clone(),
            Arc::new(notifier.clone()),
        ));
        let system_monitor = Arc::new(SystemMonitor::new(
            Sampler::new(host.clone(), Thresholds::default()),
            store.clone(),
            Arc::new(notifier.clone()),
            HOST_LABEL,
        ));

        Self {
            store,
            notifier,
            probe,
            host,
            target_monitor,
            system_monitor,
        }
    }

    /// Scheduler sur les moniteurs du harness; digest envoyé au même notifier
    pub fn scheduler(&self, settings: ScheduleSettings, targets: Vec<TestTarget>) -> Scheduler {
        let reporter = Arc::new(DigestReporter::new(
            self.store.clone(),
            Arc::new(self.notifier.clone()),
            HOST_LABEL,
        ));
        self.scheduler_with_reporter(settings, targets, reporter)
    }

    pub fn scheduler_with_reporter(
        &self,
        settings: ScheduleSettings,
        targets: Vec<TestTarget>,
        reporter: Arc<dyn Reporter>,
    ) -> Scheduler {
        Scheduler::new(
            settings,
            targets,
            self.target_monitor.clone(),
            self.system_monitor.clone(),
            reporter,
        )
    }

    pub async fn results(&self) -> Vec<TestResult> {
        self.store.inner().results().await
    }

    pub async fn samples(&self) -> Vec<SystemSample> {
        self.store.inner().samples().await
    }

    /// Résultats enregistrés pour une adresse, dans l'ordre
    pub async fn results_for(&self, address: &str) -> Vec<TestResult> {
        self.results()
            .await
            .into_iter()
            .filter(|r| r.address == address)
            .collect()
    }

    /// Assert que `count` notifications contiennent `needle`
    pub fn assert_alerts(&self, needle: &str, count: usize) -> Result<()> {
        let actual = self.notifier.count_containing(needle);
        if actual != count {
            anyhow::bail!(
                "Expected {} notifications containing '{}', got {}: {:?}",
                count,
                needle,
                actual,
                self.notifier.texts()
            );
        }
        log::info!("✅ {} notifications containing '{}'", count, needle);
        Ok(())
    }

    /// Assert la suite des flags `is_recovery` pour une adresse
    pub async fn assert_recovery_flags(&self, address: &str, expected: &[bool]) -> Result<()> {
        let flags: Vec<bool> = self
            .results_for(address)
            .await
            .iter()
            .map(|r| r.is_recovery)
            .collect();
        if flags != expected {
            anyhow::bail!("Recovery flags for {}: expected {:?}, got {:?}", address, expected, flags);
        }
        Ok(())
    }

    /// Assert la suite des résultats pour une adresse
    pub async fn assert_outcomes(&self, address: &str, expected: &[Outcome]) -> Result<()> {
        let outcomes: Vec<Outcome> = self
            .results_for(address)
            .await
            .iter()
            .map(|r| r.outcome)
            .collect();
        if outcomes != expected {
            anyhow::bail!("Outcomes for {}: expected {:?}, got {:?}", address, expected, outcomes);
        }
        Ok(())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
