//! Shell command execution
//!
//! Commands run through `sh -c` in the module directory. The child is killed
//! if the future running it is dropped, so timeouts and cancellation stop
//! the process too.

use std::path::Path;

use gantry_core::ModuleContext;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured output of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run `command` for a module, with the module described in the environment.
///
/// Sets `GANTRY_MODULE`, `GANTRY_MODULE_DIR` and `GANTRY_WORKSPACE`.
pub async fn run_for_module(
    command: &str,
    ctx: &ModuleContext,
    extra_env: &[(&str, String)],
) -> Result<CommandOutput> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(working_dir(ctx))
        .env("GANTRY_MODULE", ctx.module.as_str())
        .env("GANTRY_MODULE_DIR", &ctx.module_dir)
        .env("GANTRY_WORKSPACE", &ctx.workspace_root)
        .kill_on_drop(true);
    for (key, value) in extra_env {
        cmd.env(key, value);
    }

    tracing::debug!(module = %ctx.module, %command, "Running command");
    let output = cmd.output().await?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        code: output.status.code(),
    })
}

/// Like [`run_for_module`], failing on a non-zero exit
pub async fn run_checked(
    command: &str,
    ctx: &ModuleContext,
    extra_env: &[(&str, String)],
) -> Result<CommandOutput> {
    let output = run_for_module(command, ctx, extra_env).await?;
    if !output.success() {
        return Err(Error::CommandFailed {
            command: command.to_string(),
            code: output.code.unwrap_or(-1),
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Module directory if it exists, else the workspace root
fn working_dir(ctx: &ModuleContext) -> &Path {
    if ctx.module_dir.is_dir() {
        &ctx.module_dir
    } else {
        &ctx.workspace_root
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use gantry_config::EffectiveConfig;
    use gantry_graph::{ModuleId, ModuleKind};
    use tempfile::TempDir;

    fn context(root: &Path) -> ModuleContext {
        ModuleContext::new(
            ModuleId::from("core"),
            ModuleKind::Library,
            root,
            "core",
            EffectiveConfig::new(),
        )
    }

    #[tokio::test]
    async fn exposes_module_environment() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("core")).unwrap();
        let ctx = context(dir.path());

        let output = run_checked("echo \"$GANTRY_MODULE $EXTRA\"; pwd", &ctx, &[("EXTRA", "x".to_string())])
            .await
            .unwrap();
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("core x"));
        assert!(lines.next().unwrap().ends_with("core"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = run_checked("echo nope >&2; exit 4", &context(dir.path()), &[])
            .await
            .unwrap_err();
        match err {
            Error::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, 4);
                assert_eq!(stderr, "nope");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
