/// The operations the core asks of the external tool. Used to attribute
/// errors and log lines to the command that produced them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ToolAction {
    Detect,
    ListOutdated,
    Info,
    Upgrade,
}
