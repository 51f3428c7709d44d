//! Error types for gantry-config

use std::path::PathBuf;

/// Result type for gantry-config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A resolved value does not match its capability's declared type
    #[error("configuration key '{key}' expected {expected}, found {found}")]
    ConfigType {
        key: String,
        expected: String,
        found: String,
    },

    /// A run setting has an unusable value
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// A settings file could not be parsed
    #[error("failed to parse {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Module graph error from gantry-graph
    #[error(transparent)]
    Graph(#[from] gantry_graph::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
