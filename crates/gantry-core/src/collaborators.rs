//! External collaborators
//!
//! Gantry never compiles, tests or publishes anything itself. Each of those
//! steps is delegated to a collaborator behind an async trait; the
//! orchestrator only decides when to call it and what to do with the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gantry_capability::Binding;
use gantry_config::EffectiveConfig;
use gantry_gates::{CoverageMetrics, HookName};
use gantry_graph::{ModuleId, ModuleKind};
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// Result type returned by collaborators
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// Everything a collaborator needs to know about the module it works on
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub module: ModuleId,
    pub kind: ModuleKind,
    pub workspace_root: PathBuf,
    /// Absolute source directory of the module
    pub module_dir: PathBuf,
    pub config: EffectiveConfig,
}

impl ModuleContext {
    pub fn new(
        module: ModuleId,
        kind: ModuleKind,
        workspace_root: &Path,
        source_dir: &str,
        config: EffectiveConfig,
    ) -> Self {
        Self {
            module,
            kind,
            workspace_root: workspace_root.to_path_buf(),
            module_dir: workspace_root.join(source_dir),
            config,
        }
    }
}

/// Output of a successful build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

/// Proof that an artifact was published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub location: String,
    pub checksum: String,
    pub published_at: DateTime<Utc>,
}

/// Compiles a module's sources into an artifact
#[async_trait]
pub trait BuildTool: Send + Sync {
    async fn compile(&self, ctx: &ModuleContext) -> CollaboratorResult<Artifact>;
}

/// Runs a module's tests and reports coverage
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run_tests(&self, ctx: &ModuleContext) -> CollaboratorResult<CoverageMetrics>;
}

/// Applies an instrumentation capability to a configured module
#[async_trait]
pub trait Instrumenter: Send + Sync {
    async fn instrument(&self, ctx: &ModuleContext, binding: &Binding) -> CollaboratorResult<()>;
}

/// Hands a built artifact to an artifact repository
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        ctx: &ModuleContext,
        artifact: &Artifact,
    ) -> CollaboratorResult<PublishReceipt>;
}

/// Version-control hook integration
#[async_trait]
pub trait VcsHooks: Send + Sync {
    async fn install_hook(&self, hook: HookName, command: &str) -> CollaboratorResult<()>;

    async fn run_hook(&self, hook: HookName) -> CollaboratorResult<()>;
}

/// The set of collaborators an orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    pub build: Arc<dyn BuildTool>,
    pub tests: Arc<dyn TestRunner>,
    pub instrumenter: Arc<dyn Instrumenter>,
    pub publisher: Arc<dyn Publisher>,
    pub hooks: Option<Arc<dyn VcsHooks>>,
}

impl Collaborators {
    pub fn new(
        build: Arc<dyn BuildTool>,
        tests: Arc<dyn TestRunner>,
        instrumenter: Arc<dyn Instrumenter>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            build,
            tests,
            instrumenter,
            publisher,
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn VcsHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}
