//! Error types for gantry-local

use std::path::PathBuf;

use gantry_core::CollaboratorError;

/// Result type for local collaborator operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A shell command exited unsuccessfully
    #[error("command '{command}' exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// A configuration key the collaborator needs is not set
    #[error("configuration key '{key}' is not set")]
    MissingOption { key: String },

    /// The build finished but left no artifact behind
    #[error("artifact not found at {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// The test run left no coverage report behind
    #[error("coverage report not found at {}", path.display())]
    ReportMissing { path: PathBuf },

    #[error("invalid coverage report {}: {source}", path.display())]
    InvalidReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A copied artifact differs from the one that was built
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Source files lacking the license header
    #[error("{} file(s) lack the license header: {}", files.len(), display_paths(files))]
    HeaderMissing { files: Vec<PathBuf> },

    #[error(transparent)]
    Gates(#[from] gantry_gates::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|file| file.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Error> for CollaboratorError {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => CollaboratorError::Io(err),
            other => CollaboratorError::failed(other.to_string()),
        }
    }
}
