//! Error types for gantry-core
//!
//! Two kinds of failure exist during a run:
//!
//! - [`Error`] is structural: bad declarations, unknown or cyclic
//!   dependencies, conflicting capability definitions. It is returned from
//!   `run()` before any module is processed.
//! - [`ModuleError`] halts a single module. It is recorded in the run report
//!   and never stops independent modules.

use std::path::PathBuf;

use gantry_gates::GateFailure;
use gantry_graph::{LifecycleState, ModuleId, Transition};
use serde::Serialize;

/// Result type for gantry-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors that abort a run before any module starts
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The declarations file could not be read
    #[error("failed to read {path}: {source}")]
    DeclarationsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The declarations file is not valid
    #[error("failed to parse declarations: {0}")]
    DeclarationsParse(#[from] toml::de::Error),

    /// The declarations are well-formed but inconsistent
    #[error("invalid declarations: {reason}")]
    InvalidDeclarations { reason: String },

    /// No hook collaborator was configured
    #[error("no version-control hook collaborator configured")]
    NoHooks,

    // Transparent wrappers for underlying crate errors
    /// Module graph error from gantry-graph
    #[error(transparent)]
    Graph(#[from] gantry_graph::Error),

    /// Capability error from gantry-capability
    #[error(transparent)]
    Capability(#[from] gantry_capability::Error),

    /// Configuration error from gantry-config
    #[error(transparent)]
    Config(#[from] gantry_config::Error),

    /// Gate error from gantry-gates
    #[error(transparent)]
    Gates(#[from] gantry_gates::Error),

    /// A collaborator failed outside of a module run
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Failure reported by an external collaborator
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{message}")]
    Failed { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CollaboratorError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Why a module stopped short of `Published`
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ModuleError {
    /// Binding or configuration resolution failed
    #[error("configuration failed: {reason}")]
    Configuration { reason: String },

    /// Blocking gates failed on a transition
    #[error("blocked on {transition}: {}", describe_failures(failures))]
    GateBlocked {
        transition: Transition,
        failures: Vec<GateFailure>,
    },

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// A dependency did not get far enough
    #[error("upstream module '{dependency}' failed")]
    UpstreamFailure { dependency: ModuleId },

    /// A capability collaborator kept timing out
    #[error("capability '{capability}' timed out after {attempts} attempt(s)")]
    CapabilityTimeout { capability: String, attempts: u32 },

    /// Fetching gate metrics kept timing out
    #[error("gate metrics for {transition} timed out after {attempts} attempt(s)")]
    GateTimeout {
        transition: Transition,
        attempts: u32,
    },

    #[error("build failed: {reason}")]
    Build { reason: String },

    #[error("tests failed to run: {reason}")]
    Test { reason: String },

    #[error("instrumentation by '{capability}' failed: {reason}")]
    Instrumentation { capability: String, reason: String },

    #[error("publish failed: {reason}")]
    Publish { reason: String },

    /// The run was cancelled while the module was in flight
    #[error("cancelled in state {state}")]
    Cancelled { state: LifecycleState },

    /// The module task ended without reporting
    #[error("module task aborted: {reason}")]
    Aborted { reason: String },
}

impl ModuleError {
    /// Blocking gate failures carried by this error.
    ///
    /// Exhausted timeouts count as a failure of the gate they held up.
    pub fn gate_failures(&self) -> Vec<GateFailure> {
        match self {
            Self::GateBlocked { failures, .. } => failures.clone(),
            Self::CapabilityTimeout { capability, .. } => vec![GateFailure {
                gate: format!("{capability}-timeout"),
                reason: self.to_string(),
            }],
            Self::GateTimeout { transition, .. } => vec![GateFailure {
                gate: format!("{transition}-timeout"),
                reason: self.to_string(),
            }],
            _ => Vec::new(),
        }
    }
}

fn describe_failures(failures: &[GateFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.gate, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
