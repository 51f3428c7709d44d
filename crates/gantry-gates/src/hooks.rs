//! Git hook wiring
//!
//! Hooks gate work outside the module lifecycle: a `pre-commit` hook can run
//! the build, a `commit-msg` hook can check the message format. Hooks are
//! installed as small `#!/bin/sh` scripts in the repository's hooks directory
//! and configured in `gantry.toml`:
//!
//! ```toml
//! [hooks]
//! pre-commit = "gantry run"
//! commit-msg = "gantry commit-check \"$1\""
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use git2::Repository;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// First line after the shebang of every script gantry writes
const MARKER: &str = "# installed by gantry";

/// Git hooks gantry knows how to install
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookName {
    PreCommit,
    CommitMsg,
    PrePush,
}

impl HookName {
    pub const ALL: [HookName; 3] = [Self::PreCommit, Self::CommitMsg, Self::PrePush];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreCommit => "pre-commit",
            Self::CommitMsg => "commit-msg",
            Self::PrePush => "pre-push",
        }
    }

    /// List all valid hook names
    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|h| h.as_str()).collect()
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownHook {
                name: s.to_string(),
            })
    }
}

/// Output of a hook run
#[derive(Debug, Clone)]
pub struct HookRun {
    pub hook: HookName,
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Hook scripts of one git repository
#[derive(Debug, Clone)]
pub struct GitHooks {
    workdir: PathBuf,
    hooks_dir: PathBuf,
}

impl GitHooks {
    /// Find the repository containing `path`.
    ///
    /// Honors `core.hooksPath` when it is set.
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| Error::NotARepository {
            path: path.to_path_buf(),
        })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf());

        let configured = repo
            .config()
            .ok()
            .and_then(|config| config.get_path("core.hooksPath").ok());
        let hooks_dir = match configured {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => workdir.join(dir),
            None => repo.path().join("hooks"),
        };

        tracing::debug!(?workdir, ?hooks_dir, "Discovered git repository");
        Ok(Self { workdir, hooks_dir })
    }

    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn script_path(&self, hook: HookName) -> PathBuf {
        self.hooks_dir.join(hook.as_str())
    }

    /// Write the hook script, replacing any existing one
    pub fn install(&self, hook: HookName, command: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.hooks_dir)?;
        let path = self.script_path(hook);
        let script = format!("#!/bin/sh\n{MARKER}\n{}\n", command.trim());
        fs::write(&path, script)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }

        tracing::info!(%hook, ?path, "Installed hook");
        Ok(path)
    }

    /// Command of an installed hook, if gantry installed it
    pub fn command(&self, hook: HookName) -> Result<Option<String>> {
        let path = self.script_path(hook);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let mut lines = content.lines();
        if lines.next().map(str::trim) != Some("#!/bin/sh") || lines.next() != Some(MARKER) {
            return Ok(None);
        }
        let command = lines.collect::<Vec<_>>().join("\n");
        Ok(Some(command.trim().to_string()))
    }

    /// Hooks installed by gantry, with their commands
    pub fn installed(&self) -> Result<Vec<(HookName, String)>> {
        let mut installed = Vec::new();
        for hook in HookName::ALL {
            if let Some(command) = self.command(hook)? {
                installed.push((hook, command));
            }
        }
        Ok(installed)
    }

    /// Run an installed hook with `args` as its positional parameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::HookNotInstalled` if gantry did not install the hook
    /// and `Error::HookFailed`, including stderr, on a non-zero exit.
    pub fn run(&self, hook: HookName, args: &[String]) -> Result<HookRun> {
        let command = self
            .command(hook)?
            .ok_or_else(|| Error::HookNotInstalled {
                name: hook.to_string(),
            })?;
        run_shell(hook, &command, args, &self.workdir)
    }
}

/// Run `command` through `sh -c`, with `args` bound to `$1..`.
pub fn run_shell(hook: HookName, command: &str, args: &[String], dir: &Path) -> Result<HookRun> {
    tracing::debug!(%hook, %command, "Running hook");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .arg(hook.as_str())
        .args(args)
        .current_dir(dir)
        .output()?;

    let run = HookRun {
        hook,
        command: command.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    };

    if !output.status.success() {
        let stderr_snippet = run.stderr.trim();
        let message = if stderr_snippet.is_empty() {
            format!("exited with status {:?}", run.exit_code)
        } else {
            format!("exited with status {:?}: {}", run.exit_code, stderr_snippet)
        };
        return Err(Error::HookFailed {
            hook: hook.to_string(),
            command: run.command,
            message,
        });
    }
    Ok(run)
}
