use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use butler_core::execution::{
    CommandSpec, ProcessExecutor, ProcessExitStatus, ProcessFuture, ProcessOutput, ProcessRequest,
    TokioProcessExecutor, run_validated,
};
use butler_core::models::{CoreErrorKind, ToolAction};

struct RecordingExecutor {
    runs: AtomicUsize,
}

impl RecordingExecutor {
    fn new() -> Self {
        Self {
            runs: AtomicUsize::new(0),
        }
    }

    fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ProcessExecutor for RecordingExecutor {
    fn run(&self, _request: ProcessRequest) -> ProcessFuture {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let now = SystemTime::now();
        Box::pin(async move {
            Ok(ProcessOutput {
                status: ProcessExitStatus::ExitCode(0),
                stdout: b"ok\n".to_vec(),
                stderr: Vec::new(),
                started_at: now,
                finished_at: now,
            })
        })
    }
}

#[test]
fn request_defaults_capture_output_without_elevation() {
    let request = ProcessRequest::new(ToolAction::ListOutdated, CommandSpec::new("choco"));

    assert!(request.capture_output);
    assert!(!request.requires_elevation);
}

#[test]
fn validation_rejects_an_empty_program() {
    let error = CommandSpec::new("")
        .validate(ToolAction::Detect)
        .expect_err("empty program must be rejected");

    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    assert_eq!(error.action, Some(ToolAction::Detect));
}

#[test]
fn validation_rejects_empty_and_nul_args() {
    for bad in ["", "with\0nul"] {
        let error = CommandSpec::new("choco")
            .arg(bad)
            .validate(ToolAction::Upgrade)
            .expect_err("argument must be rejected");
        assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    }
}

#[tokio::test]
async fn invalid_requests_short_circuit_before_the_executor() {
    let executor = RecordingExecutor::new();
    let request = ProcessRequest::new(ToolAction::Detect, CommandSpec::new(""));

    let error = run_validated(&executor, request)
        .await
        .expect_err("invalid request must not run");

    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    assert_eq!(executor.run_count(), 0);
}

#[tokio::test]
async fn valid_requests_pass_through_to_the_executor() {
    let executor = RecordingExecutor::new();
    let request = ProcessRequest::new(
        ToolAction::ListOutdated,
        CommandSpec::new("choco").args(["outdated", "-r"]),
    );

    let output = run_validated(&executor, request)
        .await
        .expect("valid request should run");

    assert_eq!(output.status, ProcessExitStatus::ExitCode(0));
    assert_eq!(output.stdout_lossy(), "ok\n");
    assert_eq!(executor.run_count(), 1);
}

#[tokio::test]
async fn captures_stdout_and_exit_code_of_a_real_process() {
    let executor = Arc::new(TokioProcessExecutor::new());
    let request = ProcessRequest::new(
        ToolAction::Detect,
        CommandSpec::new("echo").arg("hello"),
    );

    let output = executor.run(request).await.expect("echo should run");

    assert_eq!(output.status, ProcessExitStatus::ExitCode(0));
    assert_eq!(output.stdout_lossy().trim(), "hello");
    assert!(output.finished_at >= output.started_at);
}

#[tokio::test]
async fn reports_nonzero_exit_codes_without_failing() {
    let executor = TokioProcessExecutor::new();
    let request = ProcessRequest::new(
        ToolAction::Detect,
        CommandSpec::new("sh").args(["-c", "exit 7"]),
    );

    let output = executor.run(request).await.expect("sh should run");

    assert_eq!(output.status, ProcessExitStatus::ExitCode(7));
}

#[tokio::test]
async fn spawn_failure_surfaces_as_a_process_error() {
    let executor = TokioProcessExecutor::new();
    let request = ProcessRequest::new(
        ToolAction::Detect,
        CommandSpec::new("/nonexistent/definitely-not-a-tool"),
    );

    let error = executor
        .run(request)
        .await
        .expect_err("missing binary must fail");

    assert_eq!(error.kind, CoreErrorKind::ProcessFailure);
    assert_eq!(error.action, Some(ToolAction::Detect));
}
