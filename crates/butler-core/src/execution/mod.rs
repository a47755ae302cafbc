pub mod tokio_process;

pub use tokio_process::TokioProcessExecutor;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::SystemTime;

use crate::models::{CoreError, CoreErrorKind, ToolAction};

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self, action: ToolAction) -> ExecutionResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input(action, "command program path must not be empty"));
        }

        if self
            .args
            .iter()
            .any(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(invalid_input(
                action,
                "command args must be non-empty and must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessRequest {
    pub action: ToolAction,
    pub command: CommandSpec,
    pub requires_elevation: bool,
    pub capture_output: bool,
    pub requested_at: SystemTime,
}

impl ProcessRequest {
    pub fn new(action: ToolAction, command: CommandSpec) -> Self {
        Self {
            action,
            command,
            requires_elevation: false,
            capture_output: true,
            requested_at: SystemTime::now(),
        }
    }

    pub fn requires_elevation(mut self, requires_elevation: bool) -> Self {
        self.requires_elevation = requires_elevation;
        self
    }

    /// Hands the process the caller's console instead of capturing output, so
    /// a user can watch progress and answer the elevation prompt.
    pub fn interactive(mut self) -> Self {
        self.capture_output = false;
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command.validate(self.action)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Terminated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Executes one external command to completion. There is no cancellation and
/// no timeout: once launched, a run blocks its cycle until the tool exits.
pub trait ProcessExecutor: Send + Sync {
    fn run(&self, request: ProcessRequest) -> ProcessFuture;
}

pub fn run_validated(executor: &dyn ProcessExecutor, request: ProcessRequest) -> ProcessFuture {
    if let Err(error) = request.validate() {
        return Box::pin(std::future::ready(Err(error)));
    }
    executor.run(request)
}

fn invalid_input(action: ToolAction, message: &str) -> CoreError {
    CoreError::new(CoreErrorKind::InvalidInput, message).with_action(action)
}
