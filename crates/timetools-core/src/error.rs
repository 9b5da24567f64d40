use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolsError {
    /// Neither an explicit component id nor a static name was available.
    MissingIdentity { component: String },
    /// A selector was called while no shell context was installed.
    OutsideInstanceContext { api: &'static str },
    UnknownProgram { id: String },
    UnsupportedAction { program: String, verb: String },
    InvalidArgument {
        program: String,
        verb: String,
        reason: String,
    },
}

impl ToolsError {
    pub fn unsupported(program: impl Into<String>, verb: impl Into<String>) -> Self {
        ToolsError::UnsupportedAction {
            program: program.into(),
            verb: verb.into(),
        }
    }

    pub fn invalid_argument(
        program: impl Into<String>,
        verb: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ToolsError::InvalidArgument {
            program: program.into(),
            verb: verb.into(),
            reason: reason.into(),
        }
    }

    /// Configuration and hook-misuse errors abort the caller; the rest are
    /// ordinary request failures.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ToolsError::MissingIdentity { .. } | ToolsError::OutsideInstanceContext { .. }
        )
    }
}

impl fmt::Display for ToolsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolsError::MissingIdentity { component } => write!(
                f,
                "no stable identity derivable for {component}; provide a component id or a static name"
            ),
            ToolsError::OutsideInstanceContext { api } => {
                write!(f, "{api} called outside an active instance context")
            }
            ToolsError::UnknownProgram { id } => write!(f, "unknown program '{id}'"),
            ToolsError::UnsupportedAction { program, verb } => {
                write!(f, "{program} does not support '{verb}'")
            }
            ToolsError::InvalidArgument {
                program,
                verb,
                reason,
            } => write!(f, "{program} {verb}: {reason}"),
        }
    }
}

impl std::error::Error for ToolsError {}
