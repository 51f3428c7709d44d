//! Error types for gantry-graph

use crate::module::ModuleId;

/// Result type for module graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors in the declared module graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A module with the same identifier is already registered
    #[error("duplicate module '{id}'")]
    DuplicateModule { id: ModuleId },

    /// Lookup of an identifier that was never registered
    #[error("unknown module '{id}'")]
    UnknownModule { id: ModuleId },

    /// A dependency or parent edge points at an unregistered module
    #[error("module '{module}' references unknown module '{dependency}'")]
    UnknownDependency {
        module: ModuleId,
        dependency: ModuleId,
    },

    /// The dependency graph (parent links included) contains a cycle
    #[error("dependency cycle detected: {}", format_cycle(.members))]
    CycleDetected { members: Vec<ModuleId> },

    /// The module identifier is not usable
    #[error("invalid module id '{id}': {reason}")]
    InvalidModuleId { id: String, reason: String },

    /// A lifecycle state or transition string could not be parsed
    #[error("invalid lifecycle value '{value}'")]
    InvalidLifecycle { value: String },
}

fn format_cycle(members: &[ModuleId]) -> String {
    let mut parts: Vec<&str> = members.iter().map(ModuleId::as_str).collect();
    if let Some(first) = members.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}
