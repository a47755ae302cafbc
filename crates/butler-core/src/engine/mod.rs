pub mod check;
pub mod status;
pub mod upgrade;

pub use check::UpdateCheckEngine;
pub use status::{StatusModel, StatusSnapshot};
pub use upgrade::UpgradeEngine;
