use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::choco::ChocoSource;
use crate::engine::UpdateCheckEngine;
use crate::models::CheckCycle;
use crate::settings::{Settings, SettingsSource};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchedulerState {
    Stopped,
    Armed,
}

struct Trigger {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives periodic check cycles.
///
/// The pending sleep is the only trigger, and it is created after a check
/// completes, so the interval is measured from completion and a slow check
/// can never overlap the next tick. The interval is re-read from the settings
/// source before every sleep, so configuration edits take effect on the next
/// tick rather than the pending one.
///
/// Stopping is cooperative. The stop signal interrupts the sleep, never a
/// check already handed to the engine: an in-flight cycle always runs to
/// completion and publishes its outcome, and the loop exits right after.
pub struct SchedulerLoop<S: ChocoSource + 'static> {
    engine: UpdateCheckEngine<S>,
    settings: Arc<dyn SettingsSource>,
    pending: Mutex<Option<Trigger>>,
}

impl<S: ChocoSource + 'static> SchedulerLoop<S> {
    pub fn new(engine: UpdateCheckEngine<S>, settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            engine,
            settings,
            pending: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.pending().as_ref() {
            Some(trigger) if !trigger.task.is_finished() => SchedulerState::Armed,
            _ => SchedulerState::Stopped,
        }
    }

    /// Arms the recurring trigger. Re-arming replaces any pending trigger, so
    /// at most one exists. A no-op (beyond clearing the trigger) when
    /// periodic checks are disabled in the current settings.
    pub fn arm(&self) {
        if !self.settings.current().periodic_checks_enabled {
            tracing::info!("periodic checks disabled; scheduler not armed");
            self.disarm();
            return;
        }

        let engine = self.engine.clone();
        let settings = self.settings.clone();
        let (stop, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                let current = settings.current();
                if !current.periodic_checks_enabled {
                    tracing::info!("periodic checks disabled; scheduler stopping");
                    break;
                }
                tracing::info!(
                    hours = current.check_interval_hours,
                    "next scheduled check armed"
                );
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = tokio::time::sleep(check_interval(&current)) => {}
                }
                engine.run_check().await;
                if *stopped.borrow() {
                    break;
                }
            }
        });

        if let Some(previous) = self.pending().replace(Trigger { stop, task }) {
            let _ = previous.stop.send(true);
        }
    }

    /// Signals the pending trigger to stop. Idempotent: calling it again when
    /// already stopped does nothing. A check the trigger already started
    /// finishes normally; only the sleep is cut short.
    pub fn disarm(&self) {
        if let Some(trigger) = self.pending().take() {
            let _ = trigger.stop.send(true);
        }
    }

    /// Runs a manual check with the trigger stopped, then re-arms if it was
    /// armed before. Stopping first is what keeps manual and scheduled checks
    /// from ever racing into concurrent execution. If a scheduled check is
    /// still in flight, the manual one is the engine's guarded no-op and the
    /// prior cycle comes back unchanged.
    pub async fn check_now(&self) -> CheckCycle {
        let was_armed = self.state() == SchedulerState::Armed;
        self.disarm();
        let cycle = self.engine.run_check().await;
        if was_armed {
            self.arm();
        }
        cycle
    }

    fn pending(&self) -> MutexGuard<'_, Option<Trigger>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn check_interval(settings: &Settings) -> Duration {
    Duration::from_secs(u64::from(settings.check_interval_hours.max(1)) * 60 * 60)
}
