//! Local collaborators for Gantry
//!
//! Implementations of the gantry-core collaborator traits that work on the
//! local machine: shell commands for building, testing and instrumenting, a
//! license header scan, a directory for publishing and the git hooks
//! directory for VCS hooks.

pub mod checksum;
pub mod compile;
pub mod error;
pub mod headers;
pub mod hooks;
pub mod instrument;
pub mod publish;
pub mod shell;
pub mod testing;

use std::path::Path;
use std::sync::Arc;

use gantry_core::Collaborators;

pub use compile::ShellBuildTool;
pub use error::{Error, Result};
pub use hooks::GitHooksAdapter;
pub use instrument::ShellInstrumenter;
pub use publish::DirectoryPublisher;
pub use testing::ShellTestRunner;

/// Local collaborators for a workspace.
///
/// Modules without `publish.repository` publish to `<root>/build/repository`.
/// Hooks are wired when `root` is inside a git repository.
pub fn local_collaborators(root: &Path) -> Collaborators {
    let publisher = DirectoryPublisher::new().with_fallback(root.join("build").join("repository"));
    let collaborators = Collaborators::new(
        Arc::new(ShellBuildTool::new()),
        Arc::new(ShellTestRunner::new()),
        Arc::new(ShellInstrumenter::new()),
        Arc::new(publisher),
    );
    match GitHooksAdapter::discover(root) {
        Ok(hooks) => collaborators.with_hooks(Arc::new(hooks)),
        Err(err) => {
            tracing::debug!(error = %err, "No git repository, hooks disabled");
            collaborators
        }
    }
}
