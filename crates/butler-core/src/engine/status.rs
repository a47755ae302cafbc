use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use serde::Serialize;

use crate::models::{CheckCycle, CheckOutcome, PackageUpdate, UpgradeCycle, UpgradeReport};

/// Single source of truth for lifecycle phase, timestamps and the working
/// package list.
///
/// Every transition goes through the internal mutex, and `begin_check` /
/// `begin_upgrade` are test-and-set guards. That mutex-guarded state token is
/// what enforces the at-most-one-of-{check, upgrade} invariant under real
/// parallelism, replacing the cooperative flags of a single-threaded host.
#[derive(Default)]
pub struct StatusModel {
    inner: Mutex<StatusInner>,
}

#[derive(Default)]
struct StatusInner {
    packages: Vec<PackageUpdate>,
    /// Set when the last check could not refresh the list; the packages shown
    /// are from an earlier successful cycle.
    stale: bool,
    current_check: Option<CheckCycle>,
    last_check: Option<CheckCycle>,
    current_upgrade: Option<UpgradeCycle>,
    last_upgrade: Option<UpgradeCycle>,
    last_check_started: Option<SystemTime>,
    last_check_completed: Option<SystemTime>,
    last_update_started: Option<SystemTime>,
    /// Set when the last upgrade outcome parks further upgrades (pending
    /// reboot, incomplete install, unknown failure).
    install_blocked: bool,
}

/// Immutable view for presentation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub packages: Vec<PackageUpdate>,
    pub stale: bool,
    pub is_checking: bool,
    pub is_updating: bool,
    pub last_check: Option<CheckCycle>,
    pub last_upgrade: Option<UpgradeCycle>,
    pub last_check_started: Option<SystemTime>,
    pub last_check_completed: Option<SystemTime>,
    pub last_update_started: Option<SystemTime>,
    pub install_enabled: bool,
}

impl StatusModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.lock();
        StatusSnapshot {
            packages: inner.packages.clone(),
            stale: inner.stale,
            is_checking: inner.current_check.is_some(),
            is_updating: inner.current_upgrade.is_some(),
            last_check: inner.last_check.clone(),
            last_upgrade: inner.last_upgrade.clone(),
            last_check_started: inner.last_check_started,
            last_check_completed: inner.last_check_completed,
            last_update_started: inner.last_update_started,
            install_enabled: !inner.packages.is_empty()
                && inner.current_upgrade.is_none()
                && !inner.install_blocked,
        }
    }

    pub fn outdated_count(&self) -> usize {
        self.lock().packages.len()
    }

    pub fn packages(&self) -> Vec<PackageUpdate> {
        self.lock().packages.clone()
    }

    /// Entry guard for a check cycle. Refuses while an upgrade or another
    /// check is active.
    pub(crate) fn begin_check(&self, started_at: SystemTime) -> bool {
        let mut inner = self.lock();
        if inner.current_upgrade.is_some() || inner.current_check.is_some() {
            return false;
        }
        inner.current_check = Some(CheckCycle::running(started_at));
        inner.last_check_started = Some(started_at);
        true
    }

    /// Publishes the completed cycle. A successful outcome replaces the
    /// working package list atomically; failure outcomes keep the previous
    /// list and mark it stale. Timestamps advance on every path.
    pub(crate) fn finish_check(
        &self,
        outcome: CheckOutcome,
        completed_at: SystemTime,
    ) -> CheckCycle {
        let mut inner = self.lock();
        let started_at = inner
            .current_check
            .take()
            .map(|cycle| cycle.started_at)
            .unwrap_or(completed_at);

        match &outcome {
            CheckOutcome::Success(packages) => {
                inner.packages = packages.clone();
                inner.stale = false;
            }
            CheckOutcome::NetworkFailure | CheckOutcome::ToolError(_) => {
                inner.stale = true;
            }
        }

        let cycle = CheckCycle {
            started_at,
            completed_at: Some(completed_at),
            outcome: Some(outcome),
        };
        inner.last_check = Some(cycle.clone());
        inner.last_check_completed = Some(completed_at);
        cycle
    }

    /// The last completed cycle, or an inert never-completed one when no
    /// check has finished yet.
    pub(crate) fn last_check_or_idle(&self, fallback_started_at: SystemTime) -> CheckCycle {
        self.lock()
            .last_check
            .clone()
            .unwrap_or_else(|| CheckCycle::running(fallback_started_at))
    }

    /// Entry guard for an upgrade cycle; exclusive against checks as well.
    pub(crate) fn begin_upgrade(
        &self,
        targets: &[PackageUpdate],
        started_at: SystemTime,
    ) -> bool {
        let mut inner = self.lock();
        if inner.current_upgrade.is_some() || inner.current_check.is_some() {
            return false;
        }
        inner.current_upgrade = Some(UpgradeCycle {
            started_at,
            targets: targets.to_vec(),
            report: None,
        });
        inner.last_update_started = Some(started_at);
        true
    }

    pub(crate) fn finish_upgrade(&self, report: UpgradeReport) -> UpgradeCycle {
        let mut inner = self.lock();
        let mut cycle = inner.current_upgrade.take().unwrap_or(UpgradeCycle {
            started_at: SystemTime::now(),
            targets: Vec::new(),
            report: None,
        });
        inner.install_blocked = !report.outcome.further_action_allowed();
        cycle.report = Some(report);
        inner.last_upgrade = Some(cycle.clone());
        cycle
    }

    fn lock(&self) -> MutexGuard<'_, StatusInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
