use std::process::Stdio;
use std::time::SystemTime;

use tokio::io::AsyncReadExt;

use crate::execution::{
    ProcessExecutor, ProcessExitStatus, ProcessFuture, ProcessOutput, ProcessRequest,
};
use crate::models::{CoreError, CoreErrorKind, ToolAction};

/// Spawns real processes on the tokio runtime.
///
/// Requests flagged as elevated are launched through the configured elevation
/// prefix. A prompt declined at the launcher surfaces as `ElevationDeclined`,
/// distinct from any exit code the tool could return.
pub struct TokioProcessExecutor {
    elevation_prefix: Vec<String>,
}

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self {
            elevation_prefix: vec!["sudo".to_string()],
        }
    }

    /// Overrides the launcher used for elevated requests, e.g.
    /// `["pkexec"]` or `["sudo", "-E"]`. An empty prefix runs the tool
    /// directly and leaves elevation to the environment.
    pub fn with_elevation_prefix(prefix: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            elevation_prefix: prefix.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for TokioProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor for TokioProcessExecutor {
    fn run(&self, request: ProcessRequest) -> ProcessFuture {
        let mut cmd = if request.requires_elevation && !self.elevation_prefix.is_empty() {
            let mut cmd = tokio::process::Command::new(&self.elevation_prefix[0]);
            cmd.args(&self.elevation_prefix[1..]);
            cmd.arg(&request.command.program);
            cmd.args(&request.command.args);
            cmd
        } else {
            let mut cmd = tokio::process::Command::new(&request.command.program);
            cmd.args(&request.command.args);
            cmd
        };

        if request.capture_output {
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdin(Stdio::inherit());
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let action = request.action;
        let elevated = request.requires_elevation;

        Box::pin(async move {
            let started_at = SystemTime::now();
            let mut child = cmd
                .spawn()
                .map_err(|error| spawn_failure(action, elevated, &error))?;

            let stdout_reader = child.stdout.take().map(|mut handle| {
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    let _ = handle.read_to_end(&mut buffer).await;
                    buffer
                })
            });
            let stderr_reader = child.stderr.take().map(|mut handle| {
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    let _ = handle.read_to_end(&mut buffer).await;
                    buffer
                })
            });

            let status = child.wait().await.map_err(|error| {
                CoreError::new(
                    CoreErrorKind::ProcessFailure,
                    format!("failed to wait for process: {error}"),
                )
                .with_action(action)
            })?;

            let stdout = match stdout_reader {
                Some(reader) => reader.await.unwrap_or_default(),
                None => Vec::new(),
            };
            let stderr = match stderr_reader {
                Some(reader) => reader.await.unwrap_or_default(),
                None => Vec::new(),
            };

            let status = match status.code() {
                Some(code) => ProcessExitStatus::ExitCode(code),
                None => ProcessExitStatus::Terminated,
            };

            Ok(ProcessOutput {
                status,
                stdout,
                stderr,
                started_at,
                finished_at: SystemTime::now(),
            })
        })
    }
}

fn spawn_failure(action: ToolAction, elevated: bool, error: &std::io::Error) -> CoreError {
    if elevated && error.kind() == std::io::ErrorKind::PermissionDenied {
        return CoreError::new(
            CoreErrorKind::ElevationDeclined,
            format!("elevation was not granted: {error}"),
        )
        .with_action(action);
    }

    CoreError::new(
        CoreErrorKind::ProcessFailure,
        format!("failed to spawn process: {error}"),
    )
    .with_action(action)
}
