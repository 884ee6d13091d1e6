//! Schedule driver
//!
//! Three independent streams, each a background loop with its own
//! cancellation token:
//! - tests: every target, immediately and then every `test_interval`
//! - system: baseline, grace period, first sample, then every `system_interval`
//! - report: once a day at `report_hour` local time
//!
//! Cancelling a stream stops its timers; a cycle already running is left to
//! finish.

use crate::config::SentinelConfig;
use crate::models::TestTarget;
use crate::monitor::{SystemMonitor, TargetMonitor};
use crate::report::Reporter;
use chrono::{DateTime, Local, LocalResult, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// What to do when a cycle is still running at the next tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Await each cycle; ticks missed meanwhile are skipped
    #[default]
    SingleFlight,
    /// Spawn each cycle; slow cycles may overlap
    Concurrent,
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub test_interval: Duration,
    pub system_interval: Duration,
    pub cpu_grace: Duration,
    /// `None` disables the daily report
    pub report_hour: Option<u32>,
    pub overlap: OverlapPolicy,
}

impl ScheduleSettings {
    pub fn from_config(config: &SentinelConfig) -> Self {
        Self {
            test_interval: config.test_interval(),
            system_interval: config.system_interval(),
            cpu_grace: config.cpu_grace(),
            report_hour: Some(config.schedule.report_hour),
            overlap: config.schedule.overlap,
        }
    }
}

/// Wall-clock source for the daily report
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

pub struct Scheduler {
    settings: ScheduleSettings,
    clock: Arc<dyn Clock>,
    targets: Arc<Vec<TestTarget>>,
    target_monitor: Arc<TargetMonitor>,
    system_monitor: Arc<SystemMonitor>,
    reporter: Arc<dyn Reporter>,
}

impl Scheduler {
    pub fn new(
        settings: ScheduleSettings,
        targets: Vec<TestTarget>,
        target_monitor: Arc<TargetMonitor>,
        system_monitor: Arc<SystemMonitor>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            settings,
            clock: Arc::new(SystemClock),
            targets: Arc::new(targets),
            target_monitor,
            system_monitor,
            reporter,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn all streams on the current runtime
    pub fn start(self) -> ScheduleHandle {
        let root = CancellationToken::new();
        let handle = ScheduleHandle {
            tests: root.child_token(),
            system: root.child_token(),
            report: root.child_token(),
            root,
            tracker: TaskTracker::new(),
        };

        info!(
            targets = self.targets.len(),
            test_interval_secs = self.settings.test_interval.as_secs(),
            system_interval_secs = self.settings.system_interval.as_secs(),
            report_hour = ?self.settings.report_hour,
            overlap = ?self.settings.overlap,
            "starting schedules"
        );

        handle.tracker.spawn(run_tests(
            self.target_monitor,
            self.targets,
            self.settings.test_interval,
            self.settings.overlap,
            handle.tracker.clone(),
            handle.tests.clone(),
        ));

        handle.tracker.spawn(run_system(
            self.system_monitor,
            self.settings.system_interval,
            self.settings.cpu_grace,
            self.settings.overlap,
            handle.tracker.clone(),
            handle.system.clone(),
        ));

        match self.settings.report_hour {
            Some(hour) => {
                handle
                    .tracker
                    .spawn(run_report(self.reporter, self.clock, hour, handle.report.clone()));
            }
            None => info!("daily report disabled"),
        }

        handle
    }
}

/// Control over running schedules
pub struct ScheduleHandle {
    root: CancellationToken,
    tests: CancellationToken,
    system: CancellationToken,
    report: CancellationToken,
    tracker: TaskTracker,
}

impl ScheduleHandle {
    pub fn cancel_tests(&self) {
        self.tests.cancel();
    }

    pub fn cancel_system(&self) {
        self.system.cancel();
    }

    pub fn cancel_report(&self) {
        self.report.cancel();
    }

    /// Stop every stream. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.root.is_cancelled() {
            info!("stopping all schedules");
        }
        self.root.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Wait for the loops and any in-flight cycle to finish
    pub async fn join(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

async fn run_tests(
    monitor: Arc<TargetMonitor>,
    targets: Arc<Vec<TestTarget>>,
    period: Duration,
    overlap: OverlapPolicy,
    tracker: TaskTracker,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("test schedule stopped");
                break;
            }
            _ = ticker.tick() => {}
        }

        match overlap {
            OverlapPolicy::SingleFlight => {
                monitor.run_cycle(&targets).await;
            }
            OverlapPolicy::Concurrent => {
                let monitor = monitor.clone();
                let targets = targets.clone();
                tracker.spawn(async move {
                    monitor.run_cycle(&targets).await;
                });
            }
        }
    }
}

async fn run_system(
    monitor: Arc<SystemMonitor>,
    period: Duration,
    grace: Duration,
    overlap: OverlapPolicy,
    tracker: TaskTracker,
    cancel: CancellationToken,
) {
    monitor.bootstrap().await;

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("system schedule stopped before first sample");
            return;
        }
        _ = sleep(grace) => {}
    }

    // first tick completes immediately: that is the first real sample
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("system schedule stopped");
                break;
            }
            _ = ticker.tick() => {}
        }

        match overlap {
            OverlapPolicy::SingleFlight => {
                monitor.run_cycle().await;
            }
            OverlapPolicy::Concurrent => {
                let monitor = monitor.clone();
                tracker.spawn(async move {
                    monitor.run_cycle().await;
                });
            }
        }
    }
}

async fn run_report(
    reporter: Arc<dyn Reporter>,
    clock: Arc<dyn Clock>,
    hour: u32,
    cancel: CancellationToken,
) {
    let mut last: Option<DateTime<Local>> = None;

    loop {
        let now = clock.now();
        // never before the last occurrence, even if the wall clock stepped back
        let from = last.map_or(now, |prev| prev.max(now));
        let Some(next) = next_daily_occurrence(&from, hour) else {
            error!(hour, "no valid report time, daily report disabled");
            return;
        };
        let wait = next
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        info!(next = %next, "next daily report scheduled");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("report schedule stopped");
                break;
            }
            _ = sleep(wait) => {}
        }
        last = Some(next);

        // the report covers the day that just ended
        let today = next.date_naive();
        let day = today.pred_opt().unwrap_or(today);
        if let Err(e) = reporter.report(day).await {
            warn!(date = %day, error = %e, "daily report failed");
        }
    }
}

/// Next instant strictly after `now` whose local time is `hour:00:00`.
///
/// Days where that hour does not exist (DST gap) are skipped; on an
/// ambiguous hour the earlier instant wins. `None` for `hour > 23`.
pub fn next_daily_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let mut date = now.date_naive();

    for _ in 0..3 {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        let candidate = match tz.from_local_datetime(&naive) {
            LocalResult::Single(at) => Some(at),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => None,
        };
        if let Some(at) = candidate {
            if at > *now {
                return Some(at);
            }
        }
        date = date.succ_opt()?;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Timelike, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn later_today_when_hour_not_reached() {
        let next = next_daily_occurrence(&utc(2024, 3, 10, 6, 30), 9).unwrap();
        assert_eq!(next, utc(2024, 3, 10, 9, 0));
    }

    #[test]
    fn tomorrow_when_hour_passed() {
        let next = next_daily_occurrence(&utc(2024, 3, 10, 9, 1), 9).unwrap();
        assert_eq!(next, utc(2024, 3, 11, 9, 0));
    }

    #[test]
    fn exactly_on_the_hour_is_not_now() {
        let next = next_daily_occurrence(&utc(2024, 3, 10, 9, 0), 9).unwrap();
        assert_eq!(next, utc(2024, 3, 11, 9, 0));
    }

    #[test]
    fn crosses_month_and_year_end() {
        let next = next_daily_occurrence(&utc(2024, 12, 31, 23, 30), 0).unwrap();
        assert_eq!(next, utc(2025, 1, 1, 0, 0));
    }

    #[test]
    fn respects_the_local_offset() {
        let paris = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = paris.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let next = next_daily_occurrence(&now, 9).unwrap();
        assert_eq!(next.hour(), 9);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(next.with_timezone(&Utc), utc(2024, 6, 1, 7, 0));
    }

    #[test]
    fn rejects_invalid_hour() {
        assert!(next_daily_occurrence(&utc(2024, 3, 10, 6, 30), 24).is_none());
    }

    #[test]
    fn overlap_policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&OverlapPolicy::SingleFlight).unwrap(),
            "\"single_flight\""
        );
        let parsed: OverlapPolicy = serde_json::from_str("\"concurrent\"").unwrap();
        assert_eq!(parsed, OverlapPolicy::Concurrent);
        assert_eq!(OverlapPolicy::default(), OverlapPolicy::SingleFlight);
    }

    #[test]
    fn settings_follow_config() {
        let settings = ScheduleSettings::from_config(&SentinelConfig::default());
        assert_eq!(settings.test_interval, Duration::from_secs(300));
        assert_eq!(settings.system_interval, Duration::from_secs(60));
        assert_eq!(settings.cpu_grace, Duration::from_secs(5));
        assert_eq!(settings.report_hour, Some(9));
        assert_eq!(settings.overlap, OverlapPolicy::SingleFlight);
    }
}
