use std::sync::Arc;
use std::time::SystemTime;

use crate::choco::ChocoSource;
use crate::engine::{StatusModel, UpdateCheckEngine};
use crate::execution::ProcessExitStatus;
use crate::models::{
    CoreError, CoreErrorKind, PackageUpdate, ToolAction, UpgradeReport,
};

/// Orchestrates one upgrade cycle for a selected set of packages.
pub struct UpgradeEngine<S: ChocoSource> {
    source: Arc<S>,
    status: Arc<StatusModel>,
    check: UpdateCheckEngine<S>,
}

impl<S: ChocoSource> UpgradeEngine<S> {
    pub fn new(source: Arc<S>, status: Arc<StatusModel>, check: UpdateCheckEngine<S>) -> Self {
        Self {
            source,
            status,
            check,
        }
    }

    /// Runs the elevated upgrade for `targets` and maps the exit code onto
    /// the outcome contract. While the upgrade runs, check cycles are
    /// refused. Whatever the result, one fresh check cycle follows to
    /// resynchronize the package list with the tool.
    ///
    /// An empty target set reports `NoTargets` without launching anything;
    /// a call while another cycle is active is rejected.
    pub async fn run_upgrade(
        &self,
        targets: &[PackageUpdate],
    ) -> Result<UpgradeReport, CoreError> {
        if targets.is_empty() {
            tracing::info!("upgrade requested with no targets");
            return Ok(UpgradeReport::no_targets());
        }

        let started_at = SystemTime::now();
        if !self.status.begin_upgrade(targets, started_at) {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                "an upgrade or check cycle is already active",
            )
            .with_action(ToolAction::Upgrade));
        }

        let names: Vec<String> = targets.iter().map(|package| package.name.clone()).collect();
        tracing::info!(count = names.len(), targets = %names.join(" "), "starting upgrade");

        let report = match self.source.upgrade(&names).await {
            Ok(ProcessExitStatus::ExitCode(code)) => UpgradeReport::from_exit_code(code),
            Ok(ProcessExitStatus::Terminated) => {
                tracing::warn!("upgrade process was terminated by a signal");
                UpgradeReport::generic_failure()
            }
            Err(error) if error.kind == CoreErrorKind::ElevationDeclined => {
                tracing::warn!(%error, "elevation was not granted");
                UpgradeReport::elevation_denied()
            }
            Err(error) => {
                tracing::warn!(%error, "upgrade process failed to run");
                UpgradeReport::generic_failure()
            }
        };

        if report.outcome.is_success() {
            tracing::info!(outcome = ?report.outcome, exit_code = ?report.exit_code, "upgrade finished");
        } else {
            tracing::warn!(outcome = ?report.outcome, exit_code = ?report.exit_code, "upgrade failed");
        }

        self.status.finish_upgrade(report.clone());

        // The tool is the only source of truth for what is still outdated;
        // resynchronize unconditionally, even after a failed attempt.
        let _ = self.check.run_check().await;

        Ok(report)
    }
}
