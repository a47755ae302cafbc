pub mod action;
pub mod error;
pub mod package;
pub mod status;

pub use action::ToolAction;
pub use error::{CoreError, CoreErrorKind};
pub use package::PackageUpdate;
pub use status::{
    CheckCycle, CheckOutcome, UpgradeCycle, UpgradeOutcome, UpgradeReport,
};
