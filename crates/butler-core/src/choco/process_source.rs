use std::sync::Arc;

use crate::choco::{
    ChocoSource, OutdatedOutput, SourceFuture, choco_detect_request, choco_info_request,
    choco_outdated_request, choco_upgrade_request,
};
use crate::execution::{ProcessExecutor, ProcessExitStatus, run_validated};
use crate::models::{CoreError, CoreErrorKind, ToolAction};

/// Production source backed by a real process executor.
pub struct ProcessChocoSource {
    executor: Arc<dyn ProcessExecutor>,
}

impl ProcessChocoSource {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }
}

impl ChocoSource for ProcessChocoSource {
    fn detect(&self) -> SourceFuture<String> {
        let wait = run_validated(self.executor.as_ref(), choco_detect_request());
        Box::pin(async move {
            let output = wait.await?;
            match output.status {
                ProcessExitStatus::ExitCode(0) => Ok(output.stdout_lossy().trim().to_string()),
                ProcessExitStatus::ExitCode(code) => Err(CoreError::new(
                    CoreErrorKind::NotInstalled,
                    format!("version probe exited with code {code}"),
                )
                .with_action(ToolAction::Detect)),
                ProcessExitStatus::Terminated => Err(CoreError::new(
                    CoreErrorKind::ProcessFailure,
                    "version probe was terminated by a signal",
                )
                .with_action(ToolAction::Detect)),
            }
        })
    }

    fn list_outdated(&self) -> SourceFuture<OutdatedOutput> {
        // Exit code intentionally not judged here: the engine recognizes
        // unreachable-source output before classifying a non-zero exit.
        let wait = run_validated(self.executor.as_ref(), choco_outdated_request());
        Box::pin(async move {
            let output = wait.await?;
            Ok(OutdatedOutput {
                status: output.status,
                stdout: output.stdout_lossy(),
            })
        })
    }

    fn package_info(&self, name: &str, version: &str) -> SourceFuture<String> {
        let wait = run_validated(self.executor.as_ref(), choco_info_request(name, version));
        Box::pin(async move {
            let output = wait.await?;
            Ok(output.stdout_lossy())
        })
    }

    fn upgrade(&self, names: &[String]) -> SourceFuture<ProcessExitStatus> {
        let wait = run_validated(self.executor.as_ref(), choco_upgrade_request(names));
        Box::pin(async move {
            let output = wait.await?;
            Ok(output.status)
        })
    }
}
