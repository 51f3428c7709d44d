//! Error types for gantry-gates

use std::path::PathBuf;

use gantry_graph::{LifecycleState, ModuleId, Transition};

use crate::engine::GateFailure;

/// Result type for gantry-gates operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while evaluating gates or running hooks
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The target state is not the immediate successor of the current one
    #[error("module '{module}' cannot move from {from} to {to}")]
    IllegalTransition {
        module: ModuleId,
        from: LifecycleState,
        to: LifecycleState,
    },

    /// One or more blocking gates failed
    #[error("module '{module}' blocked on {transition}: {}", summarize(failures))]
    GateBlocked {
        module: ModuleId,
        transition: Transition,
        failures: Vec<GateFailure>,
    },

    /// A gate declaration is malformed
    #[error("invalid gate '{gate}': {reason}")]
    InvalidGate { gate: String, reason: String },

    /// No git repository was found
    #[error("not a git repository: {path}")]
    NotARepository { path: PathBuf },

    /// Unknown hook name
    #[error("unknown hook '{name}', expected one of: {}", crate::hooks::HookName::all_names().join(", "))]
    UnknownHook { name: String },

    /// No command is installed for the hook
    #[error("hook '{name}' is not installed")]
    HookNotInstalled { name: String },

    /// A hook command exited unsuccessfully
    #[error("hook '{hook}' failed running '{command}': {message}")]
    HookFailed {
        hook: String,
        command: String,
        message: String,
    },

    /// A commit message does not follow the conventional format
    #[error("invalid commit message: {}", problems.join("; "))]
    CommitMessage { problems: Vec<String> },

    /// Git error
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn summarize(failures: &[GateFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.gate, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
