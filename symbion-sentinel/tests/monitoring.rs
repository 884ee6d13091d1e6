//! End-to-end monitoring cycles against scripted probes and hosts

use std::sync::Arc;
use std::time::Duration;
use symbion_devkit::{FailingNotifier, ScriptedProbe, TestHarness};
use symbion_sentinel::models::{Outcome, ProbeKind, Severity, TestTarget};
use symbion_sentinel::notify::{MqttNotifier, Notifier, ALERT_TOPIC};
use symbion_sentinel::probe::Probe;
use symbion_sentinel::store::{JsonlStore, MemoryStore, Store};
use symbion_sentinel::TargetMonitor;

fn db() -> TestTarget {
    TestTarget::tcp("db", "db.internal:5432", Duration::from_secs(5))
}

#[tokio::test]
async fn target_failing_three_cycles_then_recovering() {
    let harness = TestHarness::new();
    let target = db();

    harness.probe.set_down(&target.address, true);
    for _ in 0..3 {
        harness.target_monitor.run_cycle(std::slice::from_ref(&target)).await;
    }
    harness.probe.set_down(&target.address, false);
    harness.target_monitor.run_cycle(std::slice::from_ref(&target)).await;

    harness.assert_alerts("is DOWN", 3).unwrap();
    harness.assert_alerts("back UP", 1).unwrap();
    harness
        .assert_recovery_flags(&target.address, &[false, false, false, true])
        .await
        .unwrap();
    harness
        .assert_outcomes(
            &target.address,
            &[Outcome::Failed, Outcome::Failed, Outcome::Failed, Outcome::Success],
        )
        .await
        .unwrap();
    assert!(harness.notifier.last().unwrap().starts_with("🟢"));
}

#[tokio::test]
async fn healthy_target_stays_quiet() {
    let harness = TestHarness::new();
    let target = db();

    for _ in 0..3 {
        harness.target_monitor.check(&target).await;
    }

    assert_eq!(harness.notifier.count(), 0);
    harness
        .assert_recovery_flags(&target.address, &[false, false, false])
        .await
        .unwrap();
}

#[tokio::test]
async fn targets_are_tracked_by_kind_and_address() {
    let harness = TestHarness::new();
    let tcp = TestTarget::tcp("svc tcp", "svc:80", Duration::from_secs(1));
    let http = TestTarget::http("svc http", "svc:80", Duration::from_secs(1));

    harness.probe.set_down("svc:80", true);
    harness.target_monitor.check(&tcp).await;
    harness.probe.set_down("svc:80", false);

    // same address, other kind: no failure on record, so no recovery
    let result = harness.target_monitor.check(&http).await;
    assert_eq!(result.kind, ProbeKind::Http);
    assert!(!result.is_recovery);

    let result = harness.target_monitor.check(&tcp).await;
    assert!(result.is_recovery);
}

#[tokio::test]
async fn identical_warning_samples_alert_once() {
    let harness = TestHarness::new();
    harness.host.set_ram_percent(90);

    harness.system_monitor.bootstrap().await;
    let first = harness.system_monitor.run_cycle().await.unwrap();
    let second = harness.system_monitor.run_cycle().await.unwrap();

    assert_eq!(first.severity, Severity::Warning);
    assert_eq!(second.severity, Severity::Warning);
    harness.assert_alerts("System WARNING", 1).unwrap();
    assert_eq!(harness.samples().await.len(), 2);
}

#[tokio::test]
async fn severity_changes_alert_and_recover() {
    let harness = TestHarness::new();
    harness.system_monitor.bootstrap().await;

    harness.host.set_ram_percent(90);
    harness.system_monitor.run_cycle().await;
    harness.host.set_ram_percent(96);
    harness.system_monitor.run_cycle().await;
    harness.host.set_ram_percent(50);
    harness.system_monitor.run_cycle().await;
    harness.system_monitor.run_cycle().await;

    harness.assert_alerts("System WARNING", 1).unwrap();
    harness.assert_alerts("System CRITICAL", 1).unwrap();
    harness.assert_alerts("back to HEALTHY", 1).unwrap();
    assert_eq!(harness.notifier.count(), 3);
}

#[tokio::test]
async fn first_cycle_after_start_only_seeds_the_baseline() {
    let harness = TestHarness::new();

    assert!(harness.system_monitor.run_cycle().await.is_none());
    assert!(harness.samples().await.is_empty());

    let sample = harness.system_monitor.run_cycle().await.unwrap();
    assert_eq!(sample.cpu_pct, 10.0);
}

#[tokio::test]
async fn missing_disk_still_produces_a_sample() {
    let harness = TestHarness::new();
    harness.host.set_disk_percent(None);
    harness.host.set_cpu_percent(85.0);

    harness.system_monitor.bootstrap().await;
    let sample = harness.system_monitor.run_cycle().await.unwrap();

    assert_eq!(sample.disk_pct, None);
    assert_eq!(sample.disk_total_gb, None);
    assert_eq!(sample.severity, Severity::Warning);
    assert_eq!(sample.message.as_deref(), Some("CPU 85% [WARNING]"));
}

#[tokio::test]
async fn cpu_failure_skips_the_cycle() {
    let harness = TestHarness::new();
    harness.system_monitor.bootstrap().await;

    harness.host.set_cpu_broken(true);
    assert!(harness.system_monitor.run_cycle().await.is_none());
    harness.host.set_cpu_broken(false);
    assert!(harness.system_monitor.run_cycle().await.is_some());
}

#[tokio::test]
async fn store_write_failure_keeps_alerting() {
    let harness = TestHarness::new();
    let target = db();
    harness.store.set_fail_writes(true);
    harness.probe.set_down(&target.address, true);

    let result = harness.target_monitor.check(&target).await;

    assert_eq!(result.outcome, Outcome::Failed);
    harness.assert_alerts("is DOWN", 1).unwrap();
    assert_eq!(harness.store.rejected_writes(), 1);
    assert!(harness.results().await.is_empty());
}

#[tokio::test]
async fn unreadable_history_means_no_previous_status() {
    let harness = TestHarness::new();
    let target = db();

    harness.probe.set_down(&target.address, true);
    harness.target_monitor.check(&target).await;

    harness.store.set_fail_reads(true);
    harness.probe.set_down(&target.address, false);
    let result = harness.target_monitor.check(&target).await;

    assert!(!result.is_recovery);
    harness.assert_alerts("back UP", 0).unwrap();
}

#[tokio::test]
async fn notifier_failure_does_not_stop_recording() {
    let store = Arc::new(MemoryStore::new());
    let probe = Arc::new(ScriptedProbe::new());
    let notifier: Arc<dyn Notifier> = Arc::new(FailingNotifier);
    let monitor = TargetMonitor::new(probe.clone() as Arc<dyn Probe>, store.clone(), notifier);

    let target = db();
    probe.set_down(&target.address, true);
    monitor.check(&target).await;
    probe.set_down(&target.address, false);
    let result = monitor.check(&target).await;

    assert!(result.is_recovery);
    assert_eq!(store.results().await.len(), 2);
}

#[tokio::test]
async fn recovery_is_detected_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    let target = db();
    let probe = Arc::new(ScriptedProbe::new());
    let notifier = symbion_devkit::RecordingNotifier::new();

    {
        let store: Arc<dyn Store> = Arc::new(JsonlStore::open(&path).await.unwrap());
        let monitor = TargetMonitor::new(probe.clone(), store, Arc::new(notifier.clone()));
        probe.set_down(&target.address, true);
        monitor.check(&target).await;
    }

    let store: Arc<dyn Store> = Arc::new(JsonlStore::open(&path).await.unwrap());
    let monitor = TargetMonitor::new(probe.clone(), store, Arc::new(notifier.clone()));
    probe.set_down(&target.address, false);
    let result = monitor.check(&target).await;

    assert!(result.is_recovery);
    assert_eq!(notifier.count_containing("back UP"), 1);
}

#[tokio::test]
async fn stalled_mqtt_broker_does_not_block_cycles() {
    // event loop never polled: the request queue fills up and stays full
    let options = rumqttc::MqttOptions::new("sentinel-test", "127.0.0.1", 1);
    let (client, _eventloop) = rumqttc::AsyncClient::new(options, 10);
    let notifier: Arc<dyn Notifier> = Arc::new(MqttNotifier::from_client(client, ALERT_TOPIC, "nas"));

    let store = Arc::new(MemoryStore::new());
    let probe = Arc::new(ScriptedProbe::new());
    let monitor = TargetMonitor::new(probe.clone(), store.clone(), notifier);

    let target = db();
    probe.set_down(&target.address, true);
    for cycle in 1..=15 {
        let checked = tokio::time::timeout(Duration::from_secs(3), monitor.check(&target)).await;
        assert!(checked.is_ok(), "cycle {} did not complete", cycle);
    }

    assert_eq!(store.results().await.len(), 15);
}
