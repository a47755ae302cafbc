use thiserror::Error;

use crate::models::ToolAction;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    NotInstalled,
    InvalidInput,
    ParseFailure,
    ProcessFailure,
    ElevationDeclined,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub action: Option<ToolAction>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            action: None,
            kind,
            message: message.into(),
        }
    }

    pub fn with_action(mut self, action: ToolAction) -> Self {
        self.action = Some(action);
        self
    }
}
