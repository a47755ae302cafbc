use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use butler_core::choco::{ChocoSource, OutdatedOutput, SourceFuture};
use butler_core::engine::{StatusModel, UpdateCheckEngine};
use butler_core::execution::ProcessExitStatus;
use butler_core::models::{CoreError, CoreErrorKind};
use butler_core::scheduler::{SchedulerLoop, SchedulerState};
use butler_core::settings::{Settings, SettingsSource};

struct CountingSource {
    outdated_calls: AtomicUsize,
    check_gate: Mutex<Option<Arc<Notify>>>,
}

impl CountingSource {
    fn new() -> Self {
        Self {
            outdated_calls: AtomicUsize::new(0),
            check_gate: Mutex::new(None),
        }
    }

    fn check_count(&self) -> usize {
        self.outdated_calls.load(Ordering::SeqCst)
    }

    fn hold_checks(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.check_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn release_checks(&self) {
        *self.check_gate.lock().unwrap() = None;
    }
}

impl ChocoSource for CountingSource {
    fn detect(&self) -> SourceFuture<String> {
        Box::pin(async { Ok("1.4.0".to_string()) })
    }

    fn list_outdated(&self) -> SourceFuture<OutdatedOutput> {
        self.outdated_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.check_gate.lock().unwrap().clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(OutdatedOutput {
                status: ProcessExitStatus::ExitCode(0),
                stdout: String::new(),
            })
        })
    }

    fn package_info(&self, _name: &str, _version: &str) -> SourceFuture<String> {
        Box::pin(async {
            Err(CoreError::new(
                CoreErrorKind::ProcessFailure,
                "no info scripted",
            ))
        })
    }

    fn upgrade(&self, _names: &[String]) -> SourceFuture<ProcessExitStatus> {
        Box::pin(async { Ok(ProcessExitStatus::ExitCode(0)) })
    }
}

struct MutableSettings {
    inner: Mutex<Settings>,
}

impl MutableSettings {
    fn hourly() -> Self {
        Self {
            inner: Mutex::new(Settings::default()),
        }
    }

    fn set_interval_hours(&self, hours: u32) {
        self.inner.lock().unwrap().check_interval_hours = hours;
    }

    fn set_periodic_enabled(&self, enabled: bool) {
        self.inner.lock().unwrap().periodic_checks_enabled = enabled;
    }
}

impl SettingsSource for MutableSettings {
    fn current(&self) -> Settings {
        self.inner.lock().unwrap().clone()
    }
}

fn scheduler_with(
    source: &Arc<CountingSource>,
    settings: &Arc<MutableSettings>,
) -> SchedulerLoop<CountingSource> {
    let status = Arc::new(StatusModel::new());
    let engine = UpdateCheckEngine::new(source.clone(), status);
    SchedulerLoop::new(engine, settings.clone() as Arc<dyn SettingsSource>)
}

const HOUR: Duration = Duration::from_secs(60 * 60);

#[tokio::test(start_paused = true)]
async fn armed_scheduler_checks_on_every_interval() {
    let source = Arc::new(CountingSource::new());
    let settings = Arc::new(MutableSettings::hourly());
    let scheduler = scheduler_with(&source, &settings);

    scheduler.arm();
    assert_eq!(scheduler.state(), SchedulerState::Armed);
    assert_eq!(source.check_count(), 0);

    tokio::time::sleep(HOUR + Duration::from_secs(10)).await;
    assert_eq!(source.check_count(), 1);

    tokio::time::sleep(HOUR).await;
    assert_eq!(source.check_count(), 2);

    scheduler.disarm();
}

#[tokio::test(start_paused = true)]
async fn interval_changes_apply_after_the_next_completed_check() {
    let source = Arc::new(CountingSource::new());
    let settings = Arc::new(MutableSettings::hourly());
    let scheduler = scheduler_with(&source, &settings);

    scheduler.arm();
    tokio::time::sleep(HOUR + Duration::from_secs(10)).await;
    assert_eq!(source.check_count(), 1);

    // The pending one-hour trigger was armed before this edit; the two-hour
    // interval only governs the trigger armed after the next check.
    settings.set_interval_hours(2);

    tokio::time::sleep(HOUR).await;
    assert_eq!(source.check_count(), 2);

    tokio::time::sleep(HOUR).await;
    assert_eq!(source.check_count(), 2);

    tokio::time::sleep(HOUR).await;
    assert_eq!(source.check_count(), 3);

    scheduler.disarm();
}

#[tokio::test(start_paused = true)]
async fn disabling_periodic_checks_stops_the_loop() {
    let source = Arc::new(CountingSource::new());
    let settings = Arc::new(MutableSettings::hourly());
    let scheduler = scheduler_with(&source, &settings);

    scheduler.arm();
    tokio::time::sleep(HOUR + Duration::from_secs(10)).await;
    assert_eq!(source.check_count(), 1);

    settings.set_periodic_enabled(false);

    tokio::time::sleep(HOUR).await;
    assert_eq!(source.check_count(), 2);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    tokio::time::sleep(HOUR * 3).await;
    assert_eq!(source.check_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn arming_with_periodic_checks_disabled_is_a_noop() {
    let source = Arc::new(CountingSource::new());
    let settings = Arc::new(MutableSettings::hourly());
    settings.set_periodic_enabled(false);
    let scheduler = scheduler_with(&source, &settings);

    scheduler.arm();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    tokio::time::sleep(HOUR * 3).await;
    assert_eq!(source.check_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn disarm_is_idempotent() {
    let source = Arc::new(CountingSource::new());
    let settings = Arc::new(MutableSettings::hourly());
    let scheduler = scheduler_with(&source, &settings);

    scheduler.disarm();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    scheduler.arm();
    scheduler.disarm();
    scheduler.disarm();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    tokio::time::sleep(HOUR * 2).await;
    assert_eq!(source.check_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_check_pauses_and_restores_the_trigger() {
    let source = Arc::new(CountingSource::new());
    let settings = Arc::new(MutableSettings::hourly());
    let scheduler = scheduler_with(&source, &settings);

    scheduler.arm();
    let cycle = scheduler.check_now().await;
    assert!(cycle.is_complete());
    assert_eq!(source.check_count(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Armed);

    tokio::time::sleep(HOUR + Duration::from_secs(10)).await;
    assert_eq!(source.check_count(), 2);

    scheduler.disarm();
}

#[tokio::test(start_paused = true)]
async fn disarm_during_an_inflight_check_lets_it_finish() {
    let source = Arc::new(CountingSource::new());
    let gate = source.hold_checks();
    let settings = Arc::new(MutableSettings::hourly());
    let status = Arc::new(StatusModel::new());
    let engine = UpdateCheckEngine::new(source.clone(), status.clone());
    let scheduler = SchedulerLoop::new(engine, settings.clone() as Arc<dyn SettingsSource>);

    scheduler.arm();
    tokio::time::sleep(HOUR + Duration::from_secs(10)).await;
    assert_eq!(source.check_count(), 1);
    assert!(status.snapshot().is_checking);

    scheduler.disarm();
    gate.notify_one();
    while status.snapshot().is_checking {
        tokio::task::yield_now().await;
    }

    // The interrupted cycle published its outcome and released the guard; a
    // later manual check must run normally.
    source.release_checks();
    let cycle = scheduler.check_now().await;
    assert!(cycle.is_complete());
    assert_eq!(source.check_count(), 2);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn manual_check_during_an_inflight_check_is_a_guarded_noop() {
    let source = Arc::new(CountingSource::new());
    let gate = source.hold_checks();
    let settings = Arc::new(MutableSettings::hourly());
    let status = Arc::new(StatusModel::new());
    let engine = UpdateCheckEngine::new(source.clone(), status.clone());
    let scheduler = SchedulerLoop::new(engine, settings.clone() as Arc<dyn SettingsSource>);

    scheduler.arm();
    tokio::time::sleep(HOUR + Duration::from_secs(10)).await;
    assert!(status.snapshot().is_checking);

    let manual = scheduler.check_now().await;
    assert!(!manual.is_complete());
    assert_eq!(source.check_count(), 1);

    gate.notify_one();
    while status.snapshot().is_checking {
        tokio::task::yield_now().await;
    }

    source.release_checks();
    let cycle = scheduler.check_now().await;
    assert!(cycle.is_complete());
    assert_eq!(source.check_count(), 2);

    scheduler.disarm();
}

#[tokio::test(start_paused = true)]
async fn manual_check_while_stopped_leaves_the_scheduler_stopped() {
    let source = Arc::new(CountingSource::new());
    let settings = Arc::new(MutableSettings::hourly());
    let scheduler = scheduler_with(&source, &settings);

    let cycle = scheduler.check_now().await;
    assert!(cycle.is_complete());
    assert_eq!(source.check_count(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    tokio::time::sleep(HOUR * 2).await;
    assert_eq!(source.check_count(), 1);
}
