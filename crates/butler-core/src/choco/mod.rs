pub mod parse;
pub mod resolve;

mod process_source;

pub use process_source::ProcessChocoSource;
pub use resolve::TitleResolver;

use std::future::Future;
use std::pin::Pin;

use crate::execution::{CommandSpec, ProcessExitStatus, ProcessRequest};
use crate::models::{CoreError, ToolAction};

pub type SourceResult<T> = Result<T, CoreError>;

pub type SourceFuture<T> = Pin<Box<dyn Future<Output = SourceResult<T>> + Send>>;

const CHOCO_COMMAND: &str = "choco";

/// Raw result of the machine-readable outdated listing. The exit status is
/// carried alongside the text because network failures are recognized from
/// the output even when the tool exits non-zero.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutdatedOutput {
    pub status: ProcessExitStatus,
    pub stdout: String,
}

/// Seam between the orchestration engines and the real `choco` executable.
/// Every interaction with the tool goes through here, so tests substitute
/// canned sources and count invocations.
pub trait ChocoSource: Send + Sync {
    /// Availability probe (`choco --version`); the trimmed version string.
    fn detect(&self) -> SourceFuture<String>;

    /// The raw outdated listing. An error means the invocation itself failed;
    /// a non-zero exit is data for the engine to classify.
    fn list_outdated(&self) -> SourceFuture<OutdatedOutput>;

    /// Free-text metadata for one name/version pair.
    fn package_info(&self, name: &str, version: &str) -> SourceFuture<String>;

    /// Runs the elevated, interactive upgrade for the named packages and
    /// reports how the process exited. Non-zero exit codes are data here,
    /// not errors; only launch failures error out.
    fn upgrade(&self, names: &[String]) -> SourceFuture<ProcessExitStatus>;
}

pub fn choco_detect_request() -> ProcessRequest {
    ProcessRequest::new(
        ToolAction::Detect,
        CommandSpec::new(CHOCO_COMMAND).arg("--version"),
    )
}

pub fn choco_outdated_request() -> ProcessRequest {
    ProcessRequest::new(
        ToolAction::ListOutdated,
        CommandSpec::new(CHOCO_COMMAND).args(["outdated", "--no-color", "-r", "--ignore-pinned"]),
    )
}

pub fn choco_info_request(name: &str, version: &str) -> ProcessRequest {
    ProcessRequest::new(
        ToolAction::Info,
        CommandSpec::new(CHOCO_COMMAND)
            .args(["info", name])
            .arg(format!("--version={version}")),
    )
}

pub fn choco_upgrade_request(names: &[String]) -> ProcessRequest {
    ProcessRequest::new(
        ToolAction::Upgrade,
        CommandSpec::new(CHOCO_COMMAND)
            .arg("upgrade")
            .args(names.iter().cloned())
            .arg("--yes"),
    )
    .requires_elevation(true)
    .interactive()
}
