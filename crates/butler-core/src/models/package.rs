use serde::{Deserialize, Serialize};

/// One upgrade candidate reported by the package manager.
///
/// Identity is `name`. A check cycle keeps candidates in the order the tool
/// emitted them.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PackageUpdate {
    pub name: String,
    pub display_name: String,
    pub installed_version: String,
    pub available_version: String,
}
