use std::time::SystemTime;

use serde::Serialize;

use crate::models::PackageUpdate;

/// How a completed check cycle ended.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum CheckOutcome {
    /// The tool answered; the list holds every surviving upgrade candidate.
    Success(Vec<PackageUpdate>),
    /// The output carried a known unreachable-source signature.
    NetworkFailure,
    /// The invocation failed or exited unexpectedly.
    ToolError(String),
}

/// One check lifecycle. `completed_at` and `outcome` are absent while the
/// cycle is still running.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CheckCycle {
    pub started_at: SystemTime,
    pub completed_at: Option<SystemTime>,
    pub outcome: Option<CheckOutcome>,
}

impl CheckCycle {
    pub fn running(started_at: SystemTime) -> Self {
        Self {
            started_at,
            completed_at: None,
            outcome: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Classification of an upgrade attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum UpgradeOutcome {
    /// The request named no packages; nothing was launched.
    NoTargets,
    Success,
    SuccessRebootInitiated,
    SuccessRebootRequired,
    SuccessPendingReboot,
    ErrorIncompleteInstall,
    ErrorElevationDenied,
    ErrorGeneric,
    ErrorUnknown(i32),
}

impl UpgradeOutcome {
    /// Exit-code contract for the upgrade command. The literal codes are part
    /// of the public contract: automation keys off them.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1641 => Self::SuccessRebootInitiated,
            3010 => Self::SuccessRebootRequired,
            350 => Self::SuccessPendingReboot,
            1604 => Self::ErrorIncompleteInstall,
            -999 => Self::ErrorElevationDenied,
            -1 => Self::ErrorGeneric,
            other => Self::ErrorUnknown(other),
        }
    }

    /// Whether the install action stays enabled after this outcome. A pending
    /// or initiated reboot (and every hard failure except a declined prompt)
    /// parks further upgrades; checks never reopen the gate, only a later
    /// upgrade that ends with a permissive outcome does.
    pub fn further_action_allowed(self) -> bool {
        matches!(
            self,
            Self::NoTargets | Self::Success | Self::ErrorElevationDenied
        )
    }

    pub fn is_success(self) -> bool {
        matches!(
            self,
            Self::Success
                | Self::SuccessRebootInitiated
                | Self::SuccessRebootRequired
                | Self::SuccessPendingReboot
        )
    }
}

/// Outcome plus the raw exit code, when one was read. A prompt declined at
/// the launcher never produces an exit code.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UpgradeReport {
    pub outcome: UpgradeOutcome,
    pub exit_code: Option<i32>,
}

impl UpgradeReport {
    pub fn from_exit_code(code: i32) -> Self {
        Self {
            outcome: UpgradeOutcome::from_exit_code(code),
            exit_code: Some(code),
        }
    }

    pub fn no_targets() -> Self {
        Self {
            outcome: UpgradeOutcome::NoTargets,
            exit_code: None,
        }
    }

    pub fn elevation_denied() -> Self {
        Self {
            outcome: UpgradeOutcome::ErrorElevationDenied,
            exit_code: None,
        }
    }

    pub fn generic_failure() -> Self {
        Self {
            outcome: UpgradeOutcome::ErrorGeneric,
            exit_code: None,
        }
    }
}

/// One upgrade lifecycle. `report` is absent while the process runs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UpgradeCycle {
    pub started_at: SystemTime,
    pub targets: Vec<PackageUpdate>,
    pub report: Option<UpgradeReport>,
}
