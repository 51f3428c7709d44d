//! Error types for gantry-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] gantry_core::Error),

    #[error(transparent)]
    Config(#[from] gantry_config::Error),

    #[error(transparent)]
    Gates(#[from] gantry_gates::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The run finished but not every module was published
    #[error("{failed} module(s) did not publish")]
    RunFailed { failed: usize },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RunFailed { .. } => 2,
            _ => 1,
        }
    }
}
