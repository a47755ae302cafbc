use std::sync::Arc;
use std::time::SystemTime;

use crate::choco::parse::{is_network_failure, parse_outdated, upgrade_candidates};
use crate::choco::{ChocoSource, TitleResolver};
use crate::engine::StatusModel;
use crate::execution::ProcessExitStatus;
use crate::models::{CheckCycle, CheckOutcome, PackageUpdate};

/// Orchestrates one outdated-package check cycle.
pub struct UpdateCheckEngine<S: ChocoSource> {
    source: Arc<S>,
    resolver: Arc<TitleResolver<S>>,
    status: Arc<StatusModel>,
}

impl<S: ChocoSource> Clone for UpdateCheckEngine<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            resolver: self.resolver.clone(),
            status: self.status.clone(),
        }
    }
}

impl<S: ChocoSource> UpdateCheckEngine<S> {
    pub fn new(source: Arc<S>, status: Arc<StatusModel>) -> Self {
        let resolver = Arc::new(TitleResolver::new(source.clone()));
        Self {
            source,
            resolver,
            status,
        }
    }

    pub fn status_model(&self) -> Arc<StatusModel> {
        self.status.clone()
    }

    /// Runs one check cycle. Never fails outward: process and parse failures
    /// are folded into the cycle outcome, so a scheduled tick cannot kill the
    /// loop. While an upgrade (or another check) is active this is a no-op
    /// that returns the prior completed cycle untouched, without invoking
    /// the tool.
    pub async fn run_check(&self) -> CheckCycle {
        let started_at = SystemTime::now();
        if !self.status.begin_check(started_at) {
            tracing::debug!("check skipped: another cycle is active");
            return self.status.last_check_or_idle(started_at);
        }

        tracing::info!("starting check for outdated packages");
        let outcome = self.perform_check().await;
        let cycle = self.status.finish_check(outcome, SystemTime::now());

        match cycle.outcome.as_ref() {
            Some(CheckOutcome::Success(packages)) => {
                tracing::info!(count = packages.len(), "found outdated package(s)");
            }
            Some(CheckOutcome::NetworkFailure) => {
                tracing::warn!("unable to reach package source; keeping previous package list");
            }
            Some(CheckOutcome::ToolError(message)) => {
                tracing::warn!(%message, "check failed; keeping previous package list");
            }
            None => {}
        }

        cycle
    }

    async fn perform_check(&self) -> CheckOutcome {
        let raw = match self.source.list_outdated().await {
            Ok(raw) => raw,
            Err(error) => return CheckOutcome::ToolError(error.to_string()),
        };

        // Unreachable-source text takes precedence over the exit code; the
        // tool reports these failures in its regular output.
        if is_network_failure(&raw.stdout) {
            return CheckOutcome::NetworkFailure;
        }

        match raw.status {
            ProcessExitStatus::ExitCode(0) => {}
            ProcessExitStatus::ExitCode(code) => {
                return CheckOutcome::ToolError(format!(
                    "outdated listing exited with code {code}"
                ));
            }
            ProcessExitStatus::Terminated => {
                return CheckOutcome::ToolError(
                    "outdated listing was terminated by a signal".to_string(),
                );
            }
        }

        let candidates = upgrade_candidates(parse_outdated(&raw.stdout));
        let mut packages = Vec::with_capacity(candidates.len());
        for record in candidates {
            let display_name = self
                .resolver
                .resolve(&record.name, &record.available_version)
                .await;
            packages.push(PackageUpdate {
                name: record.name,
                display_name,
                installed_version: record.installed_version,
                available_version: record.available_version,
            });
        }

        CheckOutcome::Success(packages)
    }
}
