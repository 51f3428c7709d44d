//! Error types for gantry-capability

/// Errors that can occur when defining or binding capabilities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No capability with this name has been defined.
    #[error("unknown capability: {name}")]
    UnknownCapability { name: String },

    /// The same name was defined again with another version and no
    /// migration policy allows it.
    #[error("capability '{name}' is already defined at {existing}, refusing {requested}")]
    CapabilityVersionConflict {
        name: String,
        existing: semver::Version,
        requested: semver::Version,
    },

    /// The module asked for a version the defined capability does not satisfy.
    #[error("capability '{name}' {version} does not satisfy requirement '{requirement}'")]
    CapabilityVersionMismatch {
        name: String,
        version: semver::Version,
        requirement: String,
    },

    /// Binding options do not match the capability's schema.
    #[error("invalid option '{key}' for capability '{capability}': {reason}")]
    SchemaValidation {
        capability: String,
        key: String,
        reason: String,
    },

    /// A module carries options for a capability it never requested.
    #[error("module '{module}' has options for capability '{capability}' but does not request it")]
    UnrequestedOptions { module: String, capability: String },

    /// A capability request string could not be parsed.
    #[error("invalid capability request '{request}': {reason}")]
    InvalidRequest { request: String, reason: String },

    /// Invalid capability name.
    #[error("invalid capability name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
